//! PackFile: reading .pack files.
//!
//! A pack file contains a header, a sequence of compressed objects
//! (possibly deltified), and a trailing checksum (ignored on read).

use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::bufread::ZlibDecoder;
use gitview_hash::ObjectId;
use gitview_object::ObjectType;
use memmap2::Mmap;

use crate::delta::apply_delta;
use crate::entry::parse_entry_header;
use crate::index::PackIndex;
use crate::{
    DeltaError, PackEntryType, PackError, PackedObject, MAX_DELTA_CHAIN_DEPTH, PACK_HEADER_SIZE,
    PACK_SIGNATURE, PACK_VERSION,
};

/// A memory-mapped packfile with its index.
#[derive(Debug)]
pub struct PackFile {
    data: Mmap,
    index: PackIndex,
    pack_path: PathBuf,
    num_objects: u32,
}

impl PackFile {
    /// Open a pack file and its associated index.
    ///
    /// Given a `.pack` file path, opens both the pack and its `.idx` file.
    pub fn open(pack_path: impl AsRef<Path>) -> Result<Self, PackError> {
        let pack_path = pack_path.as_ref().to_path_buf();
        let idx_path = pack_path.with_extension("idx");

        let file = std::fs::File::open(&pack_path)?;
        let data = unsafe { Mmap::map(&file)? };

        if data.len() < PACK_HEADER_SIZE {
            return Err(PackError::Corrupted("pack file too small".into()));
        }
        if &data[0..4] != PACK_SIGNATURE {
            return Err(PackError::UnsupportedVersion("bad PACK signature".into()));
        }
        let version = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        if version != PACK_VERSION {
            return Err(PackError::UnsupportedVersion(format!(
                "pack version {version}, expected {PACK_VERSION}"
            )));
        }
        let num_objects = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);

        let index = PackIndex::load(&idx_path, &pack_path)?;
        if index.num_objects() != num_objects {
            return Err(PackError::Corrupted(format!(
                "pack has {} objects but index has {}",
                num_objects,
                index.num_objects()
            )));
        }

        Ok(Self {
            data,
            index,
            pack_path,
            num_objects,
        })
    }

    /// Read an object by OID.
    ///
    /// Returns `None` if the OID is not in this pack.
    pub fn read_object(&self, oid: &ObjectId) -> Result<Option<PackedObject>, PackError> {
        match self.index.find_object(oid) {
            Some(loc) => self.read_at_offset(loc.offset).map(Some),
            None => Ok(None),
        }
    }

    /// Read an object at a known offset in the pack.
    pub fn read_at_offset(&self, offset: u64) -> Result<PackedObject, PackError> {
        self.read_at_offset_with_resolver(offset, |_| None, MAX_DELTA_CHAIN_DEPTH)
    }

    /// Read an object by OID, with an external resolver for REF_DELTA bases
    /// that live outside this pack (another pack, or the loose store).
    pub fn read_object_with_resolver(
        &self,
        oid: &ObjectId,
        resolver: impl Fn(&ObjectId) -> Option<(ObjectType, Vec<u8>)>,
    ) -> Result<Option<PackedObject>, PackError> {
        match self.index.find_object(oid) {
            Some(loc) => self
                .read_at_offset_with_resolver(loc.offset, resolver, MAX_DELTA_CHAIN_DEPTH)
                .map(Some),
            None => Ok(None),
        }
    }

    /// Read an object at a known offset, chasing the delta chain iteratively.
    ///
    /// A visited-offset set rejects cyclic chains; chains longer than
    /// `max_depth` fail with [`DeltaError::ChainTooDeep`].
    pub fn read_at_offset_with_resolver(
        &self,
        offset: u64,
        resolver: impl Fn(&ObjectId) -> Option<(ObjectType, Vec<u8>)>,
        max_depth: usize,
    ) -> Result<PackedObject, PackError> {
        // Deltas applied innermost-first once the base is reached.
        let mut chain: Vec<Vec<u8>> = Vec::new();
        let mut visited: HashSet<u64> = HashSet::new();
        let mut current_offset = offset;

        loop {
            if chain.len() > max_depth {
                return Err(PackError::Delta(DeltaError::ChainTooDeep {
                    limit: max_depth,
                }));
            }
            if !visited.insert(current_offset) {
                return Err(PackError::Corrupted(format!(
                    "delta chain cycle at offset {current_offset}"
                )));
            }
            if current_offset as usize >= self.data.len() {
                return Err(PackError::Corrupted(format!(
                    "entry offset {current_offset} beyond pack size {}",
                    self.data.len()
                )));
            }

            let entry =
                parse_entry_header(&self.data[current_offset as usize..], current_offset)?;
            let compressed = &self.data[entry.data_offset as usize..];
            let decompressed =
                decompress(compressed, entry.uncompressed_size, current_offset)?;

            match entry.entry_type {
                PackEntryType::Commit
                | PackEntryType::Tree
                | PackEntryType::Blob
                | PackEntryType::Tag => {
                    let obj_type = entry.entry_type.to_object_type().expect("non-delta type");

                    let mut data = decompressed;
                    for delta_data in chain.iter().rev() {
                        data = apply_delta(&data, delta_data)?;
                    }
                    return Ok(PackedObject { obj_type, data });
                }
                PackEntryType::OfsDelta { base_offset } => {
                    chain.push(decompressed);
                    current_offset = base_offset;
                }
                PackEntryType::RefDelta { base_oid } => {
                    chain.push(decompressed);
                    if let Some(loc) = self.index.find_object(&base_oid) {
                        current_offset = loc.offset;
                    } else if let Some((obj_type, base_data)) = resolver(&base_oid) {
                        // External base: apply the accumulated chain to it.
                        let mut data = base_data;
                        for delta_data in chain.iter().rev() {
                            data = apply_delta(&data, delta_data)?;
                        }
                        return Ok(PackedObject { obj_type, data });
                    } else {
                        return Err(PackError::MissingBase(base_oid));
                    }
                }
            }
        }
    }

    /// Check if this pack contains the given OID.
    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.index.find_object(oid).is_some()
    }

    /// Get the number of objects in this pack.
    pub fn num_objects(&self) -> u32 {
        self.num_objects
    }

    /// Get the pack index.
    pub fn index(&self) -> &PackIndex {
        &self.index
    }

    /// Get the path to the .pack file.
    pub fn path(&self) -> &Path {
        &self.pack_path
    }
}

/// Decompress zlib data with an expected uncompressed size.
fn decompress(compressed: &[u8], expected_size: usize, offset: u64) -> Result<Vec<u8>, PackError> {
    let mut decoder = ZlibDecoder::new(compressed);
    let mut buf = Vec::with_capacity(expected_size);
    decoder
        .read_to_end(&mut buf)
        .map_err(|_| PackError::Corrupted(format!("undecodable entry at offset {offset}")))?;
    Ok(buf)
}
