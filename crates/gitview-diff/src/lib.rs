//! File-level diff between two tree snapshots.
//!
//! Input is the flat `path → blob hash` form produced by
//! [`gitview_odb::ObjectReader::get_tree_paths`]; output is one
//! [`CommittedFile`] per changed path. Renames are detected before
//! adds and deletes so a moved file never appears as an add/delete pair.
//!
//! The diff is best-effort under corruption: an entry whose blob cannot be
//! loaded is skipped rather than failing the whole diff.

mod calculate;

pub use calculate::calculate_diff;

use bstr::BString;
use gitview_hash::ObjectId;
use gitview_object::Blob;
use gitview_odb::{ObjectReader, OdbError, TreePaths};

/// Flat tree snapshot: repo-root-relative path → blob hash.
pub type TreeSnapshot = TreePaths;

/// How a file changed between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
    /// Same content, new path; `from` is the path in the parent snapshot.
    Renamed { from: BString },
    /// Present in the working tree but not in any snapshot. Never produced
    /// by [`calculate_diff`]; used by status layers above this crate.
    Untracked,
}

/// One changed file, keyed by its path in the diff result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedFile {
    pub path: BString,
    pub blob: Blob,
    pub change: ChangeType,
}

/// Errors from snapshot construction. The diff itself is infallible: blob
/// loader misses are skipped.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    #[error(transparent)]
    Odb(#[from] OdbError),
}

/// Diff the trees behind two commits: flatten both through `reader`, then
/// run [`calculate_diff`] with the reader as blob loader.
///
/// `parent_tree` is `None` for a root commit, making every file an add.
pub fn diff_trees(
    reader: &ObjectReader,
    current_tree: &ObjectId,
    parent_tree: Option<&ObjectId>,
) -> Result<std::collections::BTreeMap<BString, CommittedFile>, DiffError> {
    let current = reader.get_tree_paths(current_tree)?;
    let parent = match parent_tree {
        Some(oid) => Some(reader.get_tree_paths(oid)?),
        None => None,
    };
    Ok(calculate_diff(&current, parent.as_ref(), |oid| {
        reader.get_blob(oid).ok()
    }))
}
