//! Lazy cache of pack files and their indices.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use gitview_hash::ObjectId;
use gitview_object::ObjectType;
use gitview_pack::pack::PackFile;
use gitview_pack::{PackError, PackObjectLocation, PackedObject, MAX_DELTA_CHAIN_DEPTH};
use tracing::debug;

/// One discovered pack, loaded on first use.
struct PackSlot {
    pack_path: PathBuf,
    pack: Option<Arc<PackFile>>,
    /// Set when a load attempt failed, so we don't retry on every lookup.
    failed: bool,
}

struct ManagerState {
    scanned: bool,
    slots: Vec<PackSlot>,
}

/// Caches one pack (and its index) per `.pack` file under `objects/pack/`.
///
/// The directory is scanned on first use; each pack is opened lazily when a
/// lookup first reaches it. Lookups probe slots in directory order and
/// short-circuit on the first hit. `invalidate` drops everything; the next
/// access rescans.
pub struct PackIndexManager {
    pack_dir: PathBuf,
    state: Mutex<ManagerState>,
}

impl PackIndexManager {
    /// Create a manager over `objects/pack/` for the given objects directory.
    pub fn new(objects_dir: impl AsRef<Path>) -> Self {
        Self {
            pack_dir: objects_dir.as_ref().join("pack"),
            state: Mutex::new(ManagerState {
                scanned: false,
                slots: Vec::new(),
            }),
        }
    }

    /// Find the pack location of an object, probing packs in order.
    pub fn find_object(&self, oid: &ObjectId) -> Option<PackObjectLocation> {
        let mut state = self.state.lock().unwrap();
        self.ensure_scanned(&mut state);
        for i in 0..state.slots.len() {
            if let Some(pack) = Self::ensure_loaded(&mut state.slots[i]) {
                if let Some(loc) = pack.index().find_object(oid) {
                    return Some(loc);
                }
            }
        }
        None
    }

    /// Get the (lazily loaded) pack for a `.pack` path.
    pub fn pack(&self, pack_path: &Path) -> Option<Arc<PackFile>> {
        let mut state = self.state.lock().unwrap();
        self.ensure_scanned(&mut state);
        state
            .slots
            .iter_mut()
            .find(|s| s.pack_path == pack_path)
            .and_then(Self::ensure_loaded)
    }

    /// Read and fully resolve the object at a pack location.
    ///
    /// REF_DELTA bases missing from the owning pack are looked up first in
    /// the other packs, then through `fallback` (typically the loose store).
    pub fn read_at(
        &self,
        loc: &PackObjectLocation,
        fallback: impl Fn(&ObjectId) -> Option<(ObjectType, Vec<u8>)>,
    ) -> Result<PackedObject, PackError> {
        let pack = self
            .pack(&loc.pack_path)
            .ok_or(PackError::ObjectNotFound(loc.oid))?;
        let resolver = |base_oid: &ObjectId| -> Option<(ObjectType, Vec<u8>)> {
            if let Some(found) = self.resolve_in_other_packs(base_oid, &loc.pack_path) {
                return Some(found);
            }
            fallback(base_oid)
        };
        pack.read_at_offset_with_resolver(loc.offset, resolver, MAX_DELTA_CHAIN_DEPTH)
    }

    /// Search every pack except `exclude` for a whole copy of `oid`.
    fn resolve_in_other_packs(
        &self,
        oid: &ObjectId,
        exclude: &Path,
    ) -> Option<(ObjectType, Vec<u8>)> {
        let mut state = self.state.lock().unwrap();
        self.ensure_scanned(&mut state);
        for i in 0..state.slots.len() {
            if state.slots[i].pack_path == exclude {
                continue;
            }
            if let Some(pack) = Self::ensure_loaded(&mut state.slots[i]) {
                if let Ok(Some(obj)) = pack.read_object(oid) {
                    return Some((obj.obj_type, obj.data));
                }
            }
        }
        None
    }

    /// Visit every hash across all packs. The visitor returns `true` to
    /// continue, `false` to stop; stopping in one pack stops the whole
    /// enumeration. Returns `false` iff the visitor stopped early.
    pub fn enumerate_hashes(&self, mut visitor: impl FnMut(&ObjectId) -> bool) -> bool {
        let mut state = self.state.lock().unwrap();
        self.ensure_scanned(&mut state);
        for i in 0..state.slots.len() {
            if let Some(pack) = Self::ensure_loaded(&mut state.slots[i]) {
                for loc in pack.index().iter() {
                    if !visitor(&loc.oid) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Drop all cached packs; the next access rescans the pack directory.
    pub fn invalidate(&self) {
        let mut state = self.state.lock().unwrap();
        state.scanned = false;
        state.slots.clear();
    }

    /// Scan `objects/pack/` for `*.pack` files, in name order.
    fn ensure_scanned(&self, state: &mut ManagerState) {
        if state.scanned {
            return;
        }
        state.slots.clear();
        if let Ok(entries) = std::fs::read_dir(&self.pack_dir) {
            let mut paths: Vec<PathBuf> = entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "pack"))
                .collect();
            paths.sort();
            state.slots = paths
                .into_iter()
                .map(|pack_path| PackSlot {
                    pack_path,
                    pack: None,
                    failed: false,
                })
                .collect();
        }
        state.scanned = true;
    }

    fn ensure_loaded(slot: &mut PackSlot) -> Option<Arc<PackFile>> {
        if slot.pack.is_none() && !slot.failed {
            match PackFile::open(&slot.pack_path) {
                Ok(pack) => slot.pack = Some(Arc::new(pack)),
                Err(e) => {
                    // A pack we cannot open is skipped; other sources may
                    // still serve the object.
                    debug!(path = %slot.pack_path.display(), error = %e, "skipping unreadable pack");
                    slot.failed = true;
                }
            }
        }
        slot.pack.clone()
    }
}
