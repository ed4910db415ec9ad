//! The snapshot diff algorithm.

use std::collections::{BTreeMap, HashSet};

use bstr::BString;
use gitview_hash::ObjectId;
use gitview_object::Blob;
use tracing::debug;

use crate::{ChangeType, CommittedFile, TreeSnapshot};

/// Compute file-level changes from `parent` to `current`.
///
/// `parent` is `None` for a root commit; every current file is then an add.
/// Otherwise, renames are found first (same blob at a different path), then
/// adds and modifications, then deletions. No path appears twice in the
/// result; a rename subsumes its would-be add/delete pair.
///
/// `load_blob` returns `None` for unreachable blobs; such entries are
/// skipped so a damaged object store degrades the diff instead of failing
/// it.
pub fn calculate_diff(
    current: &TreeSnapshot,
    parent: Option<&TreeSnapshot>,
    mut load_blob: impl FnMut(&ObjectId) -> Option<Blob>,
) -> BTreeMap<BString, CommittedFile> {
    let mut result = BTreeMap::new();

    let Some(parent) = parent else {
        // Root commit: everything is an add.
        for (path, oid) in current {
            push_change(&mut result, path, oid, ChangeType::Added, &mut load_blob);
        }
        return result;
    };

    // Reverse maps blob → path. Snapshot iteration is in ascending path
    // order, so keeping the first occurrence picks the lexicographically
    // smallest representative when a blob appears at several paths.
    let current_by_blob = reverse(current);
    let parent_by_blob = reverse(parent);

    // Renames: the same blob on both sides at different paths.
    let mut consumed: HashSet<ObjectId> = HashSet::new();
    for (oid, new_path) in &current_by_blob {
        let Some(old_path) = parent_by_blob.get(oid) else {
            continue;
        };
        if old_path == new_path {
            continue;
        }
        push_change(
            &mut result,
            new_path,
            oid,
            ChangeType::Renamed {
                from: (*old_path).clone(),
            },
            &mut load_blob,
        );
        consumed.insert(*oid);
    }

    // Adds and modifications.
    for (path, oid) in current {
        if consumed.contains(oid) {
            continue;
        }
        match parent.get(path) {
            None => {
                push_change(&mut result, path, oid, ChangeType::Added, &mut load_blob);
            }
            Some(parent_oid) if parent_oid != oid => {
                push_change(&mut result, path, oid, ChangeType::Modified, &mut load_blob);
            }
            Some(_) => {} // unchanged
        }
    }

    // Deletions.
    for (path, oid) in parent {
        if consumed.contains(oid) || current.contains_key(path) {
            continue;
        }
        push_change(&mut result, path, oid, ChangeType::Deleted, &mut load_blob);
    }

    result
}

fn reverse(snapshot: &TreeSnapshot) -> BTreeMap<ObjectId, &BString> {
    let mut by_blob = BTreeMap::new();
    for (path, oid) in snapshot {
        by_blob.entry(*oid).or_insert(path);
    }
    by_blob
}

fn push_change(
    result: &mut BTreeMap<BString, CommittedFile>,
    path: &BString,
    oid: &ObjectId,
    change: ChangeType,
    load_blob: &mut impl FnMut(&ObjectId) -> Option<Blob>,
) {
    match load_blob(oid) {
        Some(blob) => {
            result.insert(
                path.clone(),
                CommittedFile {
                    path: path.clone(),
                    blob,
                    change,
                },
            );
        }
        None => {
            debug!(path = %path, oid = %oid, "skipping diff entry with unreachable blob");
        }
    }
}
