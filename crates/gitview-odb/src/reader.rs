//! The object reader façade.
//!
//! Thin coordinator the upper layers talk to: typed object access, blob
//! streaming, and tree-snapshot flattening, on top of the locator.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::Path;

use bstr::{BString, ByteVec};
use gitview_hash::ObjectId;
use gitview_loose::LooseObjectStream;
use gitview_object::{Blob, Commit, Object, ObjectType, Tree};

use crate::cache::ObjectCache;
use crate::{ObjectLocation, ObjectLocator, OdbError};

/// Flat tree snapshot: repo-root-relative path → blob hash.
pub type TreePaths = BTreeMap<BString, ObjectId>;

/// Lightweight object info (header only, no content for loose objects).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub obj_type: ObjectType,
    pub size: usize,
}

/// Typed read access to the object store, with a parsed-object cache.
pub struct ObjectReader {
    locator: ObjectLocator,
    cache: ObjectCache,
}

impl ObjectReader {
    /// Default capacity of the parsed-object cache.
    const CACHE_CAPACITY: usize = 1024;

    /// Open a reader over a `.git` directory.
    pub fn open(git_dir: impl AsRef<Path>) -> Self {
        Self::with_cache_capacity(git_dir, Self::CACHE_CAPACITY)
    }

    /// Open a reader with a specific parsed-object cache capacity.
    pub fn with_cache_capacity(git_dir: impl AsRef<Path>, capacity: usize) -> Self {
        Self {
            locator: ObjectLocator::new(git_dir.as_ref().join("objects")),
            cache: ObjectCache::new(capacity),
        }
    }

    /// Read and parse an object, consulting the cache first.
    ///
    /// Returns `Ok(None)` if the object is nowhere in the store.
    pub fn read(&self, oid: &ObjectId) -> Result<Option<Object>, OdbError> {
        if let Some(obj) = self.cache.lookup(oid) {
            return Ok(Some(obj));
        }

        let obj = match self.locator.locate(oid)? {
            None => return Ok(None),
            Some(ObjectLocation::Loose(_)) => self.locator.loose_store().read(oid)?,
            Some(ObjectLocation::Packed(loc)) => {
                let packed = self.locator.packs().read_at(&loc, |base_oid| {
                    // REF_DELTA bases can live outside every pack.
                    match self.locator.loose_store().read(base_oid) {
                        Ok(Some(obj)) => Some((obj.object_type(), obj.serialize_content())),
                        _ => None,
                    }
                })?;
                let obj = Object::parse_content(packed.obj_type, &packed.data).map_err(|e| {
                    OdbError::Parse {
                        oid: *oid,
                        source: e,
                    }
                })?;
                Some(obj)
            }
        };

        if let Some(ref obj) = obj {
            self.cache.store(*oid, obj);
        }
        Ok(obj)
    }

    /// Read a commit, failing if the hash is missing or names another kind.
    pub fn get_commit(&self, oid: &ObjectId) -> Result<Commit, OdbError> {
        match self.read(oid)? {
            Some(Object::Commit(commit)) => Ok(commit),
            Some(other) => Err(unexpected(oid, "commit", &other)),
            None => Err(OdbError::NotFound(*oid)),
        }
    }

    /// Read a tree, failing if the hash is missing or names another kind.
    pub fn get_tree(&self, oid: &ObjectId) -> Result<Tree, OdbError> {
        match self.read(oid)? {
            Some(Object::Tree(tree)) => Ok(tree),
            Some(other) => Err(unexpected(oid, "tree", &other)),
            None => Err(OdbError::NotFound(*oid)),
        }
    }

    /// Read a blob, failing if the hash is missing or names another kind.
    pub fn get_blob(&self, oid: &ObjectId) -> Result<Blob, OdbError> {
        match self.read(oid)? {
            Some(Object::Blob(blob)) => Ok(blob),
            Some(other) => Err(unexpected(oid, "blob", &other)),
            None => Err(OdbError::NotFound(*oid)),
        }
    }

    /// Read an object's type and size without materializing loose content.
    pub fn object_info(&self, oid: &ObjectId) -> Result<Option<ObjectInfo>, OdbError> {
        match self.locator.locate(oid)? {
            None => Ok(None),
            Some(ObjectLocation::Loose(_)) => {
                Ok(self
                    .locator
                    .loose_store()
                    .read_header(oid)?
                    .map(|(obj_type, size)| ObjectInfo { obj_type, size }))
            }
            Some(ObjectLocation::Packed(loc)) => {
                let packed = self.locator.packs().read_at(&loc, |_| None)?;
                Ok(Some(ObjectInfo {
                    obj_type: packed.obj_type,
                    size: packed.data.len(),
                }))
            }
        }
    }

    /// Stream a blob's content.
    ///
    /// Loose blobs are inflated incrementally as the stream is read; packed
    /// blobs are resolved up front and served from the buffer.
    pub fn stream_blob(&self, oid: &ObjectId) -> Result<BlobStream, OdbError> {
        match self.locator.locate(oid)? {
            None => Err(OdbError::NotFound(*oid)),
            Some(ObjectLocation::Loose(_)) => {
                let stream = self
                    .locator
                    .loose_store()
                    .stream(oid)?
                    .ok_or(OdbError::NotFound(*oid))?;
                if stream.object_type() != ObjectType::Blob {
                    return Err(OdbError::UnexpectedType {
                        oid: *oid,
                        expected: "blob",
                        actual: stream.object_type().to_string(),
                    });
                }
                Ok(BlobStream::Loose(stream))
            }
            Some(ObjectLocation::Packed(_)) => {
                let blob = self.get_blob(oid)?;
                let size = blob.len();
                Ok(BlobStream::Buffered {
                    cursor: Cursor::new(blob.data),
                    size,
                })
            }
        }
    }

    /// Flatten the tree at `root` into a `path → blob hash` snapshot.
    ///
    /// Nested trees are walked recursively with `/`-joined paths; gitlink
    /// entries reference commits in other repositories and are not descended.
    pub fn get_tree_paths(&self, root: &ObjectId) -> Result<TreePaths, OdbError> {
        let mut paths = TreePaths::new();
        self.collect_tree_paths(root, &BString::from(""), &mut paths)?;
        Ok(paths)
    }

    fn collect_tree_paths(
        &self,
        tree_oid: &ObjectId,
        prefix: &BString,
        paths: &mut TreePaths,
    ) -> Result<(), OdbError> {
        let tree = self.get_tree(tree_oid)?;
        for entry in tree.iter() {
            let path = join_path(prefix, &entry.name);
            match entry.kind {
                gitview_object::EntryKind::Tree => {
                    self.collect_tree_paths(&entry.oid, &path, paths)?;
                }
                gitview_object::EntryKind::Gitlink => {}
                gitview_object::EntryKind::Blob | gitview_object::EntryKind::Symlink => {
                    paths.insert(path, entry.oid);
                }
            }
        }
        Ok(())
    }

    /// Check whether an object exists anywhere in the store.
    pub fn exists(&self, oid: &ObjectId) -> Result<bool, OdbError> {
        self.locator.exists(oid)
    }

    /// The underlying locator.
    pub fn locator(&self) -> &ObjectLocator {
        &self.locator
    }

    /// Drop every cache: parsed objects, the loose index, and all pack
    /// indices. Call after anything mutates the repository.
    pub fn invalidate(&self) {
        self.cache.clear();
        self.locator.invalidate();
    }
}

fn unexpected(oid: &ObjectId, expected: &'static str, got: &Object) -> OdbError {
    OdbError::UnexpectedType {
        oid: *oid,
        expected,
        actual: got.object_type().to_string(),
    }
}

fn join_path(prefix: &BString, name: &BString) -> BString {
    if prefix.is_empty() {
        name.clone()
    } else {
        let mut p = prefix.clone();
        p.push_byte(b'/');
        p.push_str(name);
        p
    }
}

/// Readable blob content; loose blobs inflate on demand.
pub enum BlobStream {
    Loose(LooseObjectStream),
    Buffered { cursor: Cursor<Vec<u8>>, size: usize },
}

impl BlobStream {
    /// Total content size in bytes.
    pub fn size(&self) -> usize {
        match self {
            Self::Loose(s) => s.size(),
            Self::Buffered { size, .. } => *size,
        }
    }
}

impl Read for BlobStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Self::Loose(s) => s.read(buf),
            Self::Buffered { cursor, .. } => cursor.read(buf),
        }
    }
}
