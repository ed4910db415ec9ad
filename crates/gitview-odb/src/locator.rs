//! Object location across loose and packed storage.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use gitview_hash::ObjectId;
use gitview_loose::LooseStore;
use gitview_pack::PackObjectLocation;

use crate::{OdbError, PackIndexManager};

/// Where an object physically lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectLocation {
    /// A single zlib-compressed file under `objects/xx/`.
    Loose(PathBuf),
    /// An entry inside a pack file.
    Packed(PackObjectLocation),
}

/// Maps a hash to its physical location.
///
/// The loose namespace is indexed with one directory walk, built lazily on
/// first use; if an object exists both loose and packed, loose wins.
pub struct ObjectLocator {
    loose: LooseStore,
    loose_index: Mutex<Option<HashMap<ObjectId, PathBuf>>>,
    packs: PackIndexManager,
}

impl ObjectLocator {
    /// Create a locator over an objects directory.
    pub fn new(objects_dir: impl AsRef<Path>) -> Self {
        let objects_dir = objects_dir.as_ref();
        Self {
            loose: LooseStore::open(objects_dir),
            loose_index: Mutex::new(None),
            packs: PackIndexManager::new(objects_dir),
        }
    }

    /// Locate an object. Loose storage is consulted first, then the packs.
    pub fn locate(&self, oid: &ObjectId) -> Result<Option<ObjectLocation>, OdbError> {
        {
            let mut index = self.loose_index.lock().unwrap();
            let map = self.ensure_loose_index(&mut index)?;
            if let Some(path) = map.get(oid) {
                return Ok(Some(ObjectLocation::Loose(path.clone())));
            }
        }
        Ok(self.packs.find_object(oid).map(ObjectLocation::Packed))
    }

    /// Check whether an object exists anywhere, discarding its location.
    pub fn exists(&self, oid: &ObjectId) -> Result<bool, OdbError> {
        Ok(self.locate(oid)?.is_some())
    }

    /// Visit every loose hash. The visitor returns `true` to continue,
    /// `false` to stop. Returns `Ok(false)` iff the visitor stopped early.
    pub fn enumerate_loose_hashes(
        &self,
        mut visitor: impl FnMut(&ObjectId) -> bool,
    ) -> Result<bool, OdbError> {
        let mut index = self.loose_index.lock().unwrap();
        let map = self.ensure_loose_index(&mut index)?;
        for oid in map.keys() {
            if !visitor(oid) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Visit every packed hash across all packs, with the same
    /// continue/stop protocol.
    pub fn enumerate_packed_hashes(&self, visitor: impl FnMut(&ObjectId) -> bool) -> bool {
        self.packs.enumerate_hashes(visitor)
    }

    /// Drop the loose index and all cached pack indices. The next access
    /// rebuilds both.
    pub fn invalidate(&self) {
        *self.loose_index.lock().unwrap() = None;
        self.packs.invalidate();
    }

    /// The underlying loose store.
    pub fn loose_store(&self) -> &LooseStore {
        &self.loose
    }

    /// The underlying pack cache.
    pub fn packs(&self) -> &PackIndexManager {
        &self.packs
    }

    /// Build the loose index if it isn't built: one walk over the fan-out
    /// directories, mapping each hash to its file path.
    fn ensure_loose_index<'a>(
        &self,
        index: &'a mut Option<HashMap<ObjectId, PathBuf>>,
    ) -> Result<&'a HashMap<ObjectId, PathBuf>, OdbError> {
        if index.is_none() {
            let mut map = HashMap::new();
            for item in self.loose.iter()? {
                let (oid, path) = item?;
                map.insert(oid, path);
            }
            *index = Some(map);
        }
        Ok(index.as_ref().unwrap())
    }
}
