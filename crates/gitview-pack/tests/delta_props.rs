use gitview_pack::delta::{apply_delta, encode_copy, encode_insert, write_varint};
use proptest::prelude::*;

/// Build a delta that reconstructs `base` verbatim as a sequence of copy
/// instructions over the given chunk size.
fn identity_delta(base: &[u8], chunk: usize) -> Vec<u8> {
    let mut delta = Vec::new();
    delta.extend_from_slice(&write_varint(base.len()));
    delta.extend_from_slice(&write_varint(base.len()));
    let mut pos = 0;
    while pos < base.len() {
        let len = chunk.min(base.len() - pos);
        delta.extend_from_slice(&encode_copy(pos, len));
        pos += len;
    }
    delta
}

proptest! {
    #[test]
    fn copy_chain_reproduces_base(
        base in proptest::collection::vec(any::<u8>(), 1..2048),
        chunk in 1usize..512,
    ) {
        let delta = identity_delta(&base, chunk);
        let result = apply_delta(&base, &delta).unwrap();
        prop_assert_eq!(result, base);
    }

    #[test]
    fn output_length_always_matches_target(
        base in proptest::collection::vec(any::<u8>(), 1..512),
        inserts in proptest::collection::vec(
            proptest::collection::vec(any::<u8>(), 1..64),
            0..8,
        ),
    ) {
        let target_size: usize = base.len() + inserts.iter().map(Vec::len).sum::<usize>();
        let mut delta = Vec::new();
        delta.extend_from_slice(&write_varint(base.len()));
        delta.extend_from_slice(&write_varint(target_size));
        delta.extend_from_slice(&encode_copy(0, base.len()));
        for chunk in &inserts {
            delta.extend_from_slice(&encode_insert(chunk));
        }

        let result = apply_delta(&base, &delta).unwrap();
        prop_assert_eq!(result.len(), target_size);
    }

    #[test]
    fn declared_target_size_is_enforced(
        base in proptest::collection::vec(any::<u8>(), 1..256),
        excess in 1usize..64,
    ) {
        // The instructions produce exactly `base.len()` bytes, so any larger
        // declared target must be rejected.
        let mut delta = Vec::new();
        delta.extend_from_slice(&write_varint(base.len()));
        delta.extend_from_slice(&write_varint(base.len() + excess));
        delta.extend_from_slice(&encode_copy(0, base.len()));

        prop_assert!(apply_delta(&base, &delta).is_err());
    }
}
