//! Object database read path.
//!
//! Answers "where does this object live?" and "what is its parsed value?"
//! across loose storage and packfiles. Lookup prefers loose objects; packed
//! objects are probed across all pack indices, loading each index lazily on
//! first use.
//!
//! Stateful pieces (the loose index, the per-pack cache, the parsed-object
//! cache) live behind interior locks, so a shared reference can be used from
//! multiple threads without exposing interleaved mutations.

mod cache;
mod locator;
mod manager;
mod reader;

pub use locator::{ObjectLocation, ObjectLocator};
pub use manager::PackIndexManager;
pub use reader::{BlobStream, ObjectInfo, ObjectReader, TreePaths};

use gitview_hash::ObjectId;

/// Errors from object database operations.
#[derive(Debug, thiserror::Error)]
pub enum OdbError {
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    #[error("object {oid} is a {actual}, expected {expected}")]
    UnexpectedType {
        oid: ObjectId,
        expected: &'static str,
        actual: String,
    },

    #[error("corrupt object {oid}: {source}")]
    Parse {
        oid: ObjectId,
        #[source]
        source: gitview_object::ObjectError,
    },

    #[error(transparent)]
    Loose(#[from] gitview_loose::LooseError),

    #[error(transparent)]
    Pack(#[from] gitview_pack::PackError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
