//! End-to-end packfile fixtures: synthesize `.pack` + `.idx` pairs on disk
//! and read whole and deltified objects back.

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::ZlibEncoder;
use flate2::Compression;
use gitview_hash::ObjectId;
use gitview_object::ObjectType;
use gitview_pack::delta::{encode_copy, encode_insert, write_varint};
use gitview_pack::entry::{encode_entry_header, encode_ofs_delta_offset};
use gitview_pack::pack::PackFile;
use gitview_pack::{PackError, IDX_SIGNATURE, IDX_VERSION, PACK_SIGNATURE, PACK_VERSION};

fn make_oid(n: u8) -> ObjectId {
    let mut bytes = [0u8; 20];
    bytes[0] = n;
    bytes[19] = n;
    ObjectId::from_bytes(&bytes).unwrap()
}

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut enc = ZlibEncoder::new(&mut out, Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap();
    out
}

/// One raw entry to place in the pack: header bytes + optional delta base
/// reference + compressed payload, indexed under `oid`.
struct RawEntry {
    oid: ObjectId,
    header: Vec<u8>,
    payload: Vec<u8>,
}

impl RawEntry {
    fn whole(oid: ObjectId, type_num: u8, content: &[u8]) -> Self {
        Self {
            oid,
            header: encode_entry_header(type_num, content.len() as u64),
            payload: zlib(content),
        }
    }

    fn ref_delta(oid: ObjectId, base: &ObjectId, delta: &[u8]) -> Self {
        let mut header = encode_entry_header(7, delta.len() as u64);
        header.extend_from_slice(base.as_bytes());
        Self {
            oid,
            header,
            payload: zlib(delta),
        }
    }
}

/// Assemble a pack and matching idx on disk; returns the pack path and the
/// offset of each entry in input order.
fn write_pack(dir: &Path, entries: &[RawEntry]) -> (PathBuf, Vec<u64>) {
    let pack_path = dir.join("test.pack");
    let idx_path = dir.join("test.idx");

    let mut pack = Vec::new();
    pack.extend_from_slice(PACK_SIGNATURE);
    pack.extend_from_slice(&PACK_VERSION.to_be_bytes());
    pack.extend_from_slice(&(entries.len() as u32).to_be_bytes());

    let mut offsets = Vec::new();
    let mut indexed: Vec<(ObjectId, u64)> = Vec::new();
    for e in entries {
        let offset = pack.len() as u64;
        offsets.push(offset);
        indexed.push((e.oid, offset));
        pack.extend_from_slice(&e.header);
        pack.extend_from_slice(&e.payload);
    }
    pack.extend_from_slice(&[0u8; 20]); // trailer checksum, ignored on read
    std::fs::write(&pack_path, &pack).unwrap();

    // Index
    indexed.sort_by(|a, b| a.0.cmp(&b.0));
    let mut idx = Vec::new();
    idx.extend_from_slice(&IDX_SIGNATURE);
    idx.extend_from_slice(&IDX_VERSION.to_be_bytes());
    let mut fanout = [0u32; 256];
    for (oid, _) in &indexed {
        fanout[oid.first_byte() as usize] += 1;
    }
    for i in 1..256 {
        fanout[i] += fanout[i - 1];
    }
    for count in fanout {
        idx.extend_from_slice(&count.to_be_bytes());
    }
    for (oid, _) in &indexed {
        idx.extend_from_slice(oid.as_bytes());
    }
    for _ in &indexed {
        idx.extend_from_slice(&0u32.to_be_bytes());
    }
    for (_, offset) in &indexed {
        idx.extend_from_slice(&(*offset as u32).to_be_bytes());
    }
    idx.extend_from_slice(&[0u8; 40]);
    std::fs::write(&idx_path, &idx).unwrap();

    (pack_path, offsets)
}

/// Delta that copies the first `copy_len` bytes of the base, then inserts
/// `suffix`.
fn copy_insert_delta(source_size: usize, copy_len: usize, suffix: &[u8]) -> Vec<u8> {
    let mut delta = Vec::new();
    delta.extend_from_slice(&write_varint(source_size));
    delta.extend_from_slice(&write_varint(copy_len + suffix.len()));
    delta.extend_from_slice(&encode_copy(0, copy_len));
    delta.extend_from_slice(&encode_insert(suffix));
    delta
}

#[test]
fn read_whole_objects() {
    let dir = tempfile::tempdir().unwrap();
    let blob_oid = make_oid(0x01);
    let commit_oid = make_oid(0x02);
    let commit_body = b"tree da39a3ee5e6b4b0d3255bfef95601890afd80709\n\
author A <a@x> 1700000000 +0000\n\
committer C <c@x> 1700000001 +0000\n\
\n\
test commit\n";
    let (pack_path, _) = write_pack(
        dir.path(),
        &[
            RawEntry::whole(blob_oid, 3, b"blob content"),
            RawEntry::whole(commit_oid, 1, commit_body),
        ],
    );

    let pack = PackFile::open(&pack_path).unwrap();
    assert_eq!(pack.num_objects(), 2);

    let blob = pack.read_object(&blob_oid).unwrap().unwrap();
    assert_eq!(blob.obj_type, ObjectType::Blob);
    assert_eq!(blob.data, b"blob content");

    let commit = pack.read_object(&commit_oid).unwrap().unwrap();
    assert_eq!(commit.obj_type, ObjectType::Commit);
    assert_eq!(commit.data, commit_body);
}

#[test]
fn missing_oid_returns_none() {
    let dir = tempfile::tempdir().unwrap();
    let (pack_path, _) =
        write_pack(dir.path(), &[RawEntry::whole(make_oid(0x01), 3, b"x")]);

    let pack = PackFile::open(&pack_path).unwrap();
    assert!(pack.contains(&make_oid(0x01)));
    assert!(!pack.contains(&make_oid(0x02)));
    assert!(pack.read_object(&make_oid(0x02)).unwrap().is_none());
}

#[test]
fn resolve_ofs_delta() {
    let dir = tempfile::tempdir().unwrap();
    let base_oid = make_oid(0x01);
    let target_oid = make_oid(0x02);
    let base = b"Hello, world!";
    let delta = copy_insert_delta(base.len(), 7, b"friends!");

    // Build the base entry first to learn its size, then the OFS delta.
    let base_entry = RawEntry::whole(base_oid, 3, base);
    let base_offset = 12u64; // directly after the pack header
    let delta_offset = base_offset + (base_entry.header.len() + base_entry.payload.len()) as u64;

    let mut delta_header = encode_entry_header(6, delta.len() as u64);
    delta_header.extend_from_slice(&encode_ofs_delta_offset(delta_offset - base_offset));
    let delta_entry = RawEntry {
        oid: target_oid,
        header: delta_header,
        payload: zlib(&delta),
    };

    let (pack_path, offsets) = write_pack(dir.path(), &[base_entry, delta_entry]);
    assert_eq!(offsets, vec![base_offset, delta_offset]);

    let pack = PackFile::open(&pack_path).unwrap();
    let obj = pack.read_object(&target_oid).unwrap().unwrap();
    assert_eq!(obj.obj_type, ObjectType::Blob);
    assert_eq!(obj.data, b"Hello, friends!");
}

#[test]
fn resolve_ref_delta_within_pack() {
    let dir = tempfile::tempdir().unwrap();
    let base_oid = make_oid(0x01);
    let target_oid = make_oid(0x02);
    let base = b"line one\nline two\n";
    let delta = copy_insert_delta(base.len(), base.len(), b"line three\n");

    let (pack_path, _) = write_pack(
        dir.path(),
        &[
            RawEntry::whole(base_oid, 3, base),
            RawEntry::ref_delta(target_oid, &base_oid, &delta),
        ],
    );

    let pack = PackFile::open(&pack_path).unwrap();
    let obj = pack.read_object(&target_oid).unwrap().unwrap();
    assert_eq!(obj.data, b"line one\nline two\nline three\n");
}

#[test]
fn ref_delta_external_base_via_resolver() {
    let dir = tempfile::tempdir().unwrap();
    let external_oid = make_oid(0x07);
    let target_oid = make_oid(0x02);
    let external_base = b"external base content";
    let delta = copy_insert_delta(external_base.len(), 8, b"!");

    let (pack_path, _) = write_pack(
        dir.path(),
        &[RawEntry::ref_delta(target_oid, &external_oid, &delta)],
    );

    let pack = PackFile::open(&pack_path).unwrap();

    // Without a resolver the base is missing.
    let err = pack.read_object(&target_oid).unwrap_err();
    assert!(matches!(err, PackError::MissingBase(oid) if oid == external_oid));

    // With a resolver the chain completes.
    let obj = pack
        .read_object_with_resolver(&target_oid, |oid| {
            (*oid == external_oid).then(|| (ObjectType::Blob, external_base.to_vec()))
        })
        .unwrap()
        .unwrap();
    assert_eq!(obj.data, b"external!");
}

#[test]
fn ref_delta_cycle_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let a = make_oid(0x01);
    let b = make_oid(0x02);
    // a and b are deltas of each other; neither resolves to a whole object.
    let bogus = copy_insert_delta(1, 1, b"x");
    let (pack_path, _) = write_pack(
        dir.path(),
        &[
            RawEntry::ref_delta(a, &b, &bogus),
            RawEntry::ref_delta(b, &a, &bogus),
        ],
    );

    let pack = PackFile::open(&pack_path).unwrap();
    let err = pack.read_object(&a).unwrap_err();
    assert!(matches!(err, PackError::Corrupted(_)), "got {err:?}");
}

#[test]
fn over_deep_chain_is_rejected() {
    let dir = tempfile::tempdir().unwrap();

    // A base blob followed by 60 stacked OFS deltas, each appending a byte.
    let base = b"seed".to_vec();
    let mut entries = Vec::new();
    let mut contents = vec![base.clone()];
    entries.push(RawEntry::whole(make_oid(0x01), 3, &base));

    let mut entry_offsets = vec![12u64];
    for i in 0..60u8 {
        let prev = contents.last().unwrap().clone();
        let delta = copy_insert_delta(prev.len(), prev.len(), &[b'a' + (i % 26)]);
        let mut next = prev.clone();
        next.push(b'a' + (i % 26));
        contents.push(next);

        let prev_offset = *entry_offsets.last().unwrap();
        let last = entries.last().unwrap();
        let this_offset = prev_offset + (last.header.len() + last.payload.len()) as u64;

        let mut header = encode_entry_header(6, delta.len() as u64);
        header.extend_from_slice(&encode_ofs_delta_offset(this_offset - prev_offset));
        entries.push(RawEntry {
            oid: make_oid(0x10 + i),
            header,
            payload: zlib(&delta),
        });
        entry_offsets.push(this_offset);
    }

    let (pack_path, offsets) = write_pack(dir.path(), &entries);
    assert_eq!(offsets, entry_offsets);

    let pack = PackFile::open(&pack_path).unwrap();

    // A chain of depth 20 resolves fine.
    let shallow = pack.read_object(&make_oid(0x10 + 19)).unwrap().unwrap();
    assert_eq!(shallow.data, contents[20]);

    // The 60-deep chain exceeds the default limit of 50.
    let err = pack.read_object(&make_oid(0x10 + 59)).unwrap_err();
    assert!(
        matches!(
            err,
            PackError::Delta(gitview_pack::DeltaError::ChainTooDeep { limit: 50 })
        ),
        "got {err:?}"
    );

    // A raised limit resolves the same chain.
    let loc = pack.index().find_object(&make_oid(0x10 + 59)).unwrap();
    let obj = pack
        .read_at_offset_with_resolver(loc.offset, |_| None, 100)
        .unwrap();
    assert_eq!(obj.data, contents[60]);
}

#[test]
fn bad_pack_signature_is_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let (pack_path, _) =
        write_pack(dir.path(), &[RawEntry::whole(make_oid(0x01), 3, b"x")]);
    let mut data = std::fs::read(&pack_path).unwrap();
    data[0] = b'K';
    std::fs::write(&pack_path, data).unwrap();

    let err = PackFile::open(&pack_path).unwrap_err();
    assert!(matches!(err, PackError::UnsupportedVersion(_)));
}

#[test]
fn object_count_mismatch_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let (pack_path, _) =
        write_pack(dir.path(), &[RawEntry::whole(make_oid(0x01), 3, b"x")]);
    let mut data = std::fs::read(&pack_path).unwrap();
    data[8..12].copy_from_slice(&7u32.to_be_bytes());
    std::fs::write(&pack_path, data).unwrap();

    let err = PackFile::open(&pack_path).unwrap_err();
    assert!(matches!(err, PackError::Corrupted(_)));
}
