//! Pack index (v2) reading and lookup.
//!
//! The pack index provides fast OID → offset mapping using a fan-out table
//! and binary search. Format:
//!
//! ```text
//! Header:  \xff tOc (4 bytes) | version (4 bytes = 2)
//! Fanout:  256 × 4-byte big-endian cumulative counts
//! OIDs:    N × 20-byte sorted OIDs
//! CRC32:   N × 4-byte CRC32 values (skipped on read)
//! Offsets: N × 4-byte offsets (high bit = 1 → use 64-bit table)
//! 64-bit:  M × 8-byte offsets (for packs > 2GB)
//! Trailer: 20-byte pack checksum | 20-byte index checksum (ignored)
//! ```

use std::path::{Path, PathBuf};

use gitview_hash::ObjectId;
use memmap2::Mmap;

use crate::{PackError, PackObjectLocation, IDX_SIGNATURE, IDX_VERSION};

const HASH_LEN: usize = 20;
const TRAILER_LEN: usize = 2 * HASH_LEN;

/// Pack index (v2) providing OID → pack offset mapping.
#[derive(Debug)]
pub struct PackIndex {
    data: Mmap,
    num_objects: u32,
    /// Byte offset where sorted OIDs start.
    oid_offset: usize,
    /// Byte offset where 32-bit offsets start.
    offset32_offset: usize,
    /// Byte offset where 64-bit offsets start (if any).
    offset64_offset: usize,
    /// Number of entries in the 64-bit offset table.
    large_count: usize,
    /// Path to the .idx file.
    idx_path: PathBuf,
    /// Path to the companion .pack file.
    pack_path: PathBuf,
}

impl PackIndex {
    /// Load a pack index file, remembering the pack it indexes.
    ///
    /// Fails with [`PackError::UnsupportedVersion`] if the magic or version
    /// do not match, and with [`PackError::Corrupted`] if the file is shorter
    /// than the fan-out implies, a large-offset reference points outside the
    /// 64-bit table, or an offset lies beyond the pack file's size.
    pub fn load(
        idx_path: impl AsRef<Path>,
        pack_path: impl AsRef<Path>,
    ) -> Result<Self, PackError> {
        let idx_path = idx_path.as_ref().to_path_buf();
        let pack_path = pack_path.as_ref().to_path_buf();
        let file = std::fs::File::open(&idx_path)?;
        let data = unsafe { Mmap::map(&file)? };

        // Minimum size: header(8) + fanout(1024) + trailer
        if data.len() < 8 + 1024 + TRAILER_LEN {
            return Err(PackError::Corrupted("index file too small".into()));
        }

        if data[0..4] != IDX_SIGNATURE {
            return Err(PackError::UnsupportedVersion("bad index signature".into()));
        }
        let version = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        if version != IDX_VERSION {
            return Err(PackError::UnsupportedVersion(format!(
                "index version {version}, expected {IDX_VERSION}"
            )));
        }

        // Read number of objects from the last fanout entry.
        let fanout_offset = 8;
        let last_fanout_pos = fanout_offset + 255 * 4;
        let num_objects = u32::from_be_bytes([
            data[last_fanout_pos],
            data[last_fanout_pos + 1],
            data[last_fanout_pos + 2],
            data[last_fanout_pos + 3],
        ]);

        let n = num_objects as usize;
        let oid_offset = fanout_offset + 1024;
        let crc_offset = oid_offset + n * HASH_LEN;
        let offset32_offset = crc_offset + n * 4;
        let offset64_offset = offset32_offset + n * 4;

        let min_size = offset64_offset + TRAILER_LEN;
        if data.len() < min_size {
            return Err(PackError::Corrupted(format!(
                "index file too small: {} < {min_size}",
                data.len()
            )));
        }
        let large_count = (data.len() - offset64_offset - TRAILER_LEN) / 8;

        let index = Self {
            data,
            num_objects,
            oid_offset,
            offset32_offset,
            offset64_offset,
            large_count,
            idx_path,
            pack_path,
        };
        index.validate_offsets()?;
        Ok(index)
    }

    /// Check every entry's offset at load time: large-offset references must
    /// fall inside the 64-bit table, and resolved offsets must lie inside
    /// the pack file (when the pack is present on disk).
    fn validate_offsets(&self) -> Result<(), PackError> {
        let pack_size = std::fs::metadata(&self.pack_path).map(|m| m.len()).ok();
        for i in 0..self.num_objects {
            let offset = self.offset_at_index(i)?;
            if let Some(size) = pack_size {
                if offset >= size {
                    return Err(PackError::Corrupted(format!(
                        "offset {offset} beyond pack size {size}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Look up an OID, returning its location in the pack.
    pub fn find_object(&self, oid: &ObjectId) -> Option<PackObjectLocation> {
        let (lo, hi) = self.fanout_range(oid.first_byte());
        if lo >= hi {
            return None;
        }
        let target = oid.as_bytes();

        let mut low = lo;
        let mut high = hi;
        while low < high {
            let mid = low + (high - low) / 2;
            let mid_oid = self.oid_bytes_at(mid);
            match mid_oid.cmp(target) {
                std::cmp::Ordering::Less => low = mid + 1,
                std::cmp::Ordering::Greater => high = mid,
                std::cmp::Ordering::Equal => {
                    // Offsets were validated at load time.
                    let offset = self.offset_at_index(mid as u32).ok()?;
                    return Some(PackObjectLocation {
                        oid: *oid,
                        offset,
                        pack_path: self.pack_path.clone(),
                    });
                }
            }
        }
        None
    }

    /// Look up by OID prefix, returning all matching locations.
    pub fn find_prefix(&self, prefix: &[u8]) -> Vec<PackObjectLocation> {
        if prefix.is_empty() {
            return Vec::new();
        }
        let (lo, hi) = self.fanout_range(prefix[0]);

        let mut results = Vec::new();
        for i in lo..hi {
            let oid_bytes = self.oid_bytes_at(i);
            if oid_bytes.len() >= prefix.len() && oid_bytes[..prefix.len()] == *prefix {
                if let (Ok(oid), Ok(offset)) =
                    (ObjectId::from_bytes(oid_bytes), self.offset_at_index(i as u32))
                {
                    results.push(PackObjectLocation {
                        oid,
                        offset,
                        pack_path: self.pack_path.clone(),
                    });
                }
            }
        }
        results
    }

    /// All OIDs in this index, in sorted order.
    pub fn all_hashes(&self) -> Vec<ObjectId> {
        self.iter().map(|loc| loc.oid).collect()
    }

    /// Iterate over all object locations in sorted OID order.
    pub fn iter(&self) -> PackIndexIter<'_> {
        PackIndexIter {
            index: self,
            pos: 0,
        }
    }

    /// Get the OID at the given sorted index position.
    pub fn oid_at_index(&self, index: u32) -> ObjectId {
        let start = self.oid_offset + index as usize * HASH_LEN;
        ObjectId::from_bytes(&self.data[start..start + HASH_LEN]).expect("valid OID in index")
    }

    /// Get the pack file offset at the given sorted index position.
    fn offset_at_index(&self, index: u32) -> Result<u64, PackError> {
        let pos = self.offset32_offset + index as usize * 4;
        let val = u32::from_be_bytes([
            self.data[pos],
            self.data[pos + 1],
            self.data[pos + 2],
            self.data[pos + 3],
        ]);

        if val & 0x8000_0000 != 0 {
            // 64-bit offset: high bit is set, lower 31 bits index into 64-bit table
            let idx64 = (val & 0x7FFF_FFFF) as usize;
            if idx64 >= self.large_count {
                return Err(PackError::Corrupted(format!(
                    "large offset reference {idx64} out of range ({} entries)",
                    self.large_count
                )));
            }
            let pos64 = self.offset64_offset + idx64 * 8;
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&self.data[pos64..pos64 + 8]);
            Ok(u64::from_be_bytes(bytes))
        } else {
            Ok(val as u64)
        }
    }

    /// Total number of objects in this index.
    pub fn num_objects(&self) -> u32 {
        self.num_objects
    }

    /// Path to the .idx file.
    pub fn idx_path(&self) -> &Path {
        &self.idx_path
    }

    /// Path to the companion .pack file.
    pub fn pack_path(&self) -> &Path {
        &self.pack_path
    }

    /// Get the fan-out range for a given first byte.
    /// Returns (start, end) indices into the sorted OID list.
    fn fanout_range(&self, first_byte: u8) -> (usize, usize) {
        let end = self.fanout_entry(first_byte) as usize;
        let start = if first_byte == 0 {
            0
        } else {
            self.fanout_entry(first_byte - 1) as usize
        };
        (start, end)
    }

    /// Read a single fanout table entry.
    fn fanout_entry(&self, index: u8) -> u32 {
        let pos = 8 + index as usize * 4;
        u32::from_be_bytes([
            self.data[pos],
            self.data[pos + 1],
            self.data[pos + 2],
            self.data[pos + 3],
        ])
    }

    /// Raw OID bytes at the given sorted index position.
    fn oid_bytes_at(&self, index: usize) -> &[u8] {
        let start = self.oid_offset + index * HASH_LEN;
        &self.data[start..start + HASH_LEN]
    }
}

/// Iterator over object locations in a pack index.
pub struct PackIndexIter<'a> {
    index: &'a PackIndex,
    pos: u32,
}

impl<'a> Iterator for PackIndexIter<'a> {
    type Item = PackObjectLocation;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.index.num_objects {
            return None;
        }
        let oid = self.index.oid_at_index(self.pos);
        let offset = self.index.offset_at_index(self.pos).ok()?;
        self.pos += 1;
        Some(PackObjectLocation {
            oid,
            offset,
            pack_path: self.index.pack_path.clone(),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.index.num_objects - self.pos) as usize;
        (remaining, Some(remaining))
    }
}

impl<'a> ExactSizeIterator for PackIndexIter<'a> {}
