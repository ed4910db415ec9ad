//! Git object model: blob, tree, and commit parsing.
//!
//! This crate provides Rust types for the object kinds the read path
//! understands, their parsing from raw bytes, and the supporting
//! `ObjectType` dispatch.
//!
//! Annotated tags are recognized by the type table but not parsed; asking for
//! one yields [`ObjectError::UnsupportedObjectType`].

mod blob;
mod commit;
pub mod header;
mod identity;
mod tree;

pub use blob::Blob;
pub use commit::Commit;
pub use identity::Identity;
pub use tree::{EntryKind, Tree, TreeEntry};

use gitview_hash::HashError;

/// Errors produced by object parsing.
#[derive(Debug, thiserror::Error)]
pub enum ObjectError {
    #[error("malformed object header: {0}")]
    MalformedHeader(String),

    #[error("object type is not valid UTF-8")]
    InvalidEncoding,

    #[error("unsupported object type: {0:?}")]
    UnsupportedObjectType(String),

    #[error("malformed commit: {0}")]
    MalformedCommit(String),

    #[error("malformed tree at offset {offset}: {reason}")]
    MalformedTree { offset: usize, reason: String },

    #[error("missing required field '{field}'")]
    MissingField { field: &'static str },

    #[error(transparent)]
    Hash(#[from] HashError),
}

/// The object types that can appear in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Blob,
    Tree,
    Commit,
    Tag,
}

impl ObjectType {
    /// Parse from the type string in object headers.
    pub fn from_bytes(s: &[u8]) -> Result<Self, ObjectError> {
        let s = std::str::from_utf8(s).map_err(|_| ObjectError::InvalidEncoding)?;
        match s {
            "blob" => Ok(Self::Blob),
            "tree" => Ok(Self::Tree),
            "commit" => Ok(Self::Commit),
            "tag" => Ok(Self::Tag),
            other => Err(ObjectError::UnsupportedObjectType(other.to_string())),
        }
    }

    /// The canonical byte representation.
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Self::Blob => b"blob",
            Self::Tree => b"tree",
            Self::Commit => b"commit",
            Self::Tag => b"tag",
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Tag => "tag",
        })
    }
}

/// A parsed git object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    Blob(Blob),
    Tree(Tree),
    Commit(Commit),
}

impl Object {
    /// Parse from raw bytes (header + content).
    pub fn parse(data: &[u8]) -> Result<Self, ObjectError> {
        let (obj_type, _declared_size, header_len) = header::parse_header(data)?;
        Self::parse_content(obj_type, &data[header_len..])
    }

    /// Parse from content bytes with known type (no header).
    pub fn parse_content(obj_type: ObjectType, content: &[u8]) -> Result<Self, ObjectError> {
        match obj_type {
            ObjectType::Blob => Ok(Self::Blob(Blob::new(content.to_vec()))),
            ObjectType::Tree => Ok(Self::Tree(Tree::parse(content)?)),
            ObjectType::Commit => Ok(Self::Commit(Commit::parse(content)?)),
            ObjectType::Tag => Err(ObjectError::UnsupportedObjectType("tag".to_string())),
        }
    }

    /// Get the object type.
    pub fn object_type(&self) -> ObjectType {
        match self {
            Self::Blob(_) => ObjectType::Blob,
            Self::Tree(_) => ObjectType::Tree,
            Self::Commit(_) => ObjectType::Commit,
        }
    }

    /// Serialize just the content (no header).
    pub fn serialize_content(&self) -> Vec<u8> {
        match self {
            Self::Blob(b) => b.data.clone(),
            Self::Tree(t) => t.serialize_content(),
            Self::Commit(c) => c.serialize_content(),
        }
    }
}
