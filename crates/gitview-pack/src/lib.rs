//! Packfile reading: index v2 lookup and deltified object resolution.
//!
//! A pack stores many objects in one `.pack` file; the sibling `.idx` file
//! maps OIDs to byte offsets. Objects may be stored whole or as deltas
//! against a base object (by offset within the same pack, or by OID).
//! This crate is read-only; it never generates packs.

pub mod delta;
pub mod entry;
pub mod index;
pub mod pack;

use std::path::PathBuf;

use gitview_hash::ObjectId;
use gitview_object::ObjectType;

/// Errors that can occur during pack operations.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("unsupported pack version: {0}")]
    UnsupportedVersion(String),

    #[error("corrupted pack data: {0}")]
    Corrupted(String),

    #[error("object not found in pack: {0}")]
    ObjectNotFound(ObjectId),

    #[error("delta base not found: {0}")]
    MissingBase(ObjectId),

    #[error(transparent)]
    Delta(#[from] DeltaError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors from applying or chasing deltas.
#[derive(Debug, thiserror::Error)]
pub enum DeltaError {
    #[error("invalid delta header: {0}")]
    InvalidHeader(String),

    #[error("delta size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("delta instruction out of bounds at offset {offset}: {reason}")]
    OutOfBounds { offset: usize, reason: String },

    #[error("delta chain too deep (limit {limit})")]
    ChainTooDeep { limit: usize },
}

/// Physical location of an object inside a pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackObjectLocation {
    pub oid: ObjectId,
    /// Byte offset of the entry within the pack file.
    pub offset: u64,
    pub pack_path: PathBuf,
}

/// Type of a packed object entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackEntryType {
    Commit,
    Tree,
    Blob,
    Tag,
    /// Delta with offset to base in same pack.
    OfsDelta { base_offset: u64 },
    /// Delta referencing base by OID.
    RefDelta { base_oid: ObjectId },
}

impl PackEntryType {
    /// Convert a non-delta pack entry type to an ObjectType.
    pub fn to_object_type(self) -> Option<ObjectType> {
        match self {
            Self::Commit => Some(ObjectType::Commit),
            Self::Tree => Some(ObjectType::Tree),
            Self::Blob => Some(ObjectType::Blob),
            Self::Tag => Some(ObjectType::Tag),
            Self::OfsDelta { .. } | Self::RefDelta { .. } => None,
        }
    }
}

/// A fully resolved object read from a packfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedObject {
    pub obj_type: ObjectType,
    pub data: Vec<u8>,
}

/// Pack format constants.
pub const PACK_SIGNATURE: &[u8; 4] = b"PACK";
pub const PACK_VERSION: u32 = 2;
pub const PACK_HEADER_SIZE: usize = 12;

/// Pack index v2 constants.
pub const IDX_SIGNATURE: [u8; 4] = [0xff, 0x74, 0x4f, 0x63]; // "\377tOc"
pub const IDX_VERSION: u32 = 2;

/// Maximum delta chain depth before we bail out.
pub const MAX_DELTA_CHAIN_DEPTH: usize = 50;
