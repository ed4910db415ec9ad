//! Read-only reference namespace.
//!
//! Produces the union of loose refs and packed refs, resolves `HEAD`, and
//! peels annotated tags via the packed-refs peel lines. A short-lived
//! snapshot cache absorbs bursty reads; callers invalidate it explicitly
//! after any ref-mutating operation.
//!
//! Invalid individual entries (a ref file without a SHA, a malformed
//! packed-refs line) are skipped; one bad entry never corrupts the whole
//! read.

mod loose;
mod packed;

pub use packed::{PackedRef, PackedRefs};

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use gitview_hash::hex::is_valid_sha;
use gitview_hash::ObjectId;

/// Errors from reference reads.
///
/// Per-entry validation failures are swallowed (the entry is skipped); only
/// whole-file I/O problems surface here.
#[derive(Debug, thiserror::Error)]
pub enum RefError {
    #[error("I/O error on {path}: {source}")]
    IoPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Which namespace a ref belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    LocalBranch,
    RemoteBranch,
    Tag,
    Stash,
}

/// A named reference and the object it points to.
///
/// For annotated tags recorded in packed-refs, `target` is the peeled
/// commit, not the tag object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRef {
    /// Short name: `main`, `origin/main`, `v1.0`, `stash`.
    pub name: String,
    pub target: ObjectId,
    pub kind: RefKind,
}

/// An in-progress multi-step operation signalled by a sentinel file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingOperation {
    Merge,
    CherryPick,
    Revert,
}

struct CachedRefs {
    taken_at: Instant,
    refs: HashMap<RefKind, Vec<GitRef>>,
}

/// Reads branches, tags, remotes, stash, and `HEAD` from a `.git` directory.
pub struct RefReader {
    git_dir: PathBuf,
    cache_ttl: Duration,
    cache: Mutex<Option<CachedRefs>>,
}

impl RefReader {
    /// Default lifetime of the ref snapshot cache.
    const CACHE_TTL: Duration = Duration::from_secs(1);

    /// Create a reader over a `.git` directory.
    pub fn new(git_dir: impl AsRef<Path>) -> Self {
        Self::with_cache_ttl(git_dir, Self::CACHE_TTL)
    }

    /// Create a reader with a custom snapshot cache lifetime.
    pub fn with_cache_ttl(git_dir: impl AsRef<Path>, cache_ttl: Duration) -> Self {
        Self {
            git_dir: git_dir.as_ref().to_path_buf(),
            cache_ttl,
            cache: Mutex::new(None),
        }
    }

    /// All refs, grouped by kind.
    ///
    /// Loose refs override packed refs of the same full path; the result
    /// never holds two refs with the same `(kind, name)`. Annotated tags
    /// with a recorded peel line report the peeled commit.
    pub fn get_refs(&self) -> Result<HashMap<RefKind, Vec<GitRef>>, RefError> {
        {
            let cache = self.cache.lock().unwrap();
            if let Some(cached) = cache.as_ref() {
                if cached.taken_at.elapsed() < self.cache_ttl {
                    return Ok(cached.refs.clone());
                }
            }
        }

        let refs = self.collect_refs()?;
        *self.cache.lock().unwrap() = Some(CachedRefs {
            taken_at: Instant::now(),
            refs: refs.clone(),
        });
        Ok(refs)
    }

    /// Drop the snapshot cache. Call after any ref-mutating operation.
    pub fn invalidate(&self) {
        *self.cache.lock().unwrap() = None;
    }

    /// Resolve a full ref path (e.g. `refs/heads/main`) to the OID it
    /// stores: the loose file first, then a scan of packed-refs.
    pub fn resolve_reference(&self, ref_path: &str) -> Result<Option<ObjectId>, RefError> {
        if let Some(oid) = loose::read_loose_oid(&self.git_dir, ref_path) {
            return Ok(Some(oid));
        }
        let packed = PackedRefs::load(&self.git_dir)?;
        Ok(packed.find(ref_path).map(|pr| pr.oid))
    }

    /// Resolve `HEAD` to a commit OID.
    ///
    /// A symbolic `HEAD` (`ref: <path>`) resolves through that ref; anything
    /// else must itself be a SHA (detached). When `object_exists` is given,
    /// a target missing from the object store resolves to `None`.
    pub fn head(
        &self,
        object_exists: Option<&dyn Fn(&ObjectId) -> bool>,
    ) -> Result<Option<ObjectId>, RefError> {
        let resolved = match self.read_head_file()? {
            Some(HeadContent::Symbolic(target)) => self.resolve_reference(&target)?,
            Some(HeadContent::Detached(oid)) => Some(oid),
            None => None,
        };

        match (resolved, object_exists) {
            (Some(oid), Some(check)) if !check(&oid) => Ok(None),
            (other, _) => Ok(other),
        }
    }

    /// The short branch name `HEAD` points at, or `None` when detached
    /// (or pointing outside `refs/heads/`).
    pub fn head_branch(&self) -> Result<Option<String>, RefError> {
        match self.read_head_file()? {
            Some(HeadContent::Symbolic(target)) => {
                Ok(target.strip_prefix("refs/heads/").map(str::to_string))
            }
            _ => Ok(None),
        }
    }

    /// Report an in-progress merge / cherry-pick / revert by probing the
    /// sentinel files the mutating layers leave behind.
    pub fn pending_operation(&self) -> Option<PendingOperation> {
        if self.git_dir.join("MERGE_HEAD").exists() {
            Some(PendingOperation::Merge)
        } else if self.git_dir.join("CHERRY_PICK_HEAD").exists() {
            Some(PendingOperation::CherryPick)
        } else if self.git_dir.join("REVERT_HEAD").exists() {
            Some(PendingOperation::Revert)
        } else {
            None
        }
    }

    /// The `.git` directory this reader serves.
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    fn read_head_file(&self) -> Result<Option<HeadContent>, RefError> {
        let path = self.git_dir.join("HEAD");
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RefError::IoPath { path, source: e }),
        };
        let first_line = contents.lines().next().unwrap_or("").trim();

        if let Some(target) = first_line.strip_prefix("ref: ") {
            return Ok(Some(HeadContent::Symbolic(target.trim().to_string())));
        }
        if is_valid_sha(first_line) {
            if let Ok(oid) = ObjectId::from_hex(first_line) {
                return Ok(Some(HeadContent::Detached(oid)));
            }
        }
        Ok(None)
    }

    fn collect_refs(&self) -> Result<HashMap<RefKind, Vec<GitRef>>, RefError> {
        // full ref path → (oid, peeled). Packed entries first; loose entries
        // override, discarding any stale packed peel.
        let mut merged: BTreeMap<String, (ObjectId, Option<ObjectId>)> = BTreeMap::new();

        let packed = PackedRefs::load(&self.git_dir)?;
        for pr in packed.refs() {
            merged.insert(pr.full_name.clone(), (pr.oid, pr.peeled));
        }
        for (full_name, oid) in loose::collect_loose_refs(&self.git_dir) {
            merged.insert(full_name, (oid, None));
        }

        let mut refs: HashMap<RefKind, Vec<GitRef>> = HashMap::new();
        for (full_name, (oid, peeled)) in merged {
            let Some((kind, name)) = classify(&full_name) else {
                continue;
            };
            let target = match kind {
                RefKind::Tag => peeled.unwrap_or(oid),
                _ => oid,
            };
            refs.entry(kind).or_default().push(GitRef {
                name,
                target,
                kind,
            });
        }
        Ok(refs)
    }
}

enum HeadContent {
    Symbolic(String),
    Detached(ObjectId),
}

/// Map a full ref path to its kind and short name. Paths outside the known
/// namespaces are ignored.
fn classify(full_name: &str) -> Option<(RefKind, String)> {
    if let Some(name) = full_name.strip_prefix("refs/heads/") {
        Some((RefKind::LocalBranch, name.to_string()))
    } else if let Some(name) = full_name.strip_prefix("refs/remotes/") {
        Some((RefKind::RemoteBranch, name.to_string()))
    } else if let Some(name) = full_name.strip_prefix("refs/tags/") {
        Some((RefKind::Tag, name.to_string()))
    } else if full_name == "refs/stash" {
        Some((RefKind::Stash, "stash".to_string()))
    } else {
        None
    }
}
