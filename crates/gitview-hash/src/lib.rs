//! Object identity for the gitview read path.
//!
//! Provides the `ObjectId` type (a SHA-1 digest), hex encoding/decoding, and
//! the loose-object path derivation used by the object store.

pub mod hex;
mod oid;

pub use oid::ObjectId;

/// Errors produced when decoding object ids.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("invalid hex length: expected {expected}, got {actual}")]
    InvalidHexLength { expected: usize, actual: usize },

    #[error("invalid hex character '{character}' at position {position}")]
    InvalidHex { position: usize, character: char },

    #[error("invalid hash length: expected {expected} bytes, got {actual}")]
    InvalidHashLength { expected: usize, actual: usize },
}
