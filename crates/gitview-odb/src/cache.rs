//! Parsed-object cache backing the reader façade.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use gitview_hash::ObjectId;
use gitview_object::Object;
use lru::LruCache;

/// Bounded cache of parsed objects, keyed by hash.
///
/// Parsed objects are immutable, so lookups hand out clones and the lock is
/// released before the caller touches the object. The cache holds no notion
/// of freshness on its own; [`crate::ObjectReader::invalidate`] empties it
/// together with the location caches whenever the repository changes on
/// disk.
pub struct ObjectCache {
    entries: Mutex<LruCache<ObjectId, Object>>,
}

impl ObjectCache {
    /// Create a cache holding up to `capacity` parsed objects (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("clamped to >= 1");
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Cloned copy of a cached object, promoting it to most recently used.
    pub fn lookup(&self, oid: &ObjectId) -> Option<Object> {
        self.entries.lock().unwrap().get(oid).cloned()
    }

    /// Remember a parsed object, evicting the least recently used entry when
    /// the cache is full.
    pub fn store(&self, oid: ObjectId, obj: &Object) {
        self.entries.lock().unwrap().put(oid, obj.clone());
    }

    /// Drop every cached object.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}
