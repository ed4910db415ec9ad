//! Loose ref files under `refs/`.

use std::fs;
use std::path::Path;

use gitview_hash::hex::is_valid_sha;
use gitview_hash::ObjectId;
use tracing::debug;

/// Read a loose ref file as a direct OID.
///
/// The first line, whitespace-trimmed, must be a full 40-hex SHA. Anything
/// else (missing file, symbolic ref, garbage) yields `None`.
pub(crate) fn read_loose_oid(git_dir: &Path, rel_path: &str) -> Option<ObjectId> {
    let path = git_dir.join(rel_path);
    let contents = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "skipping unreadable ref file");
            return None;
        }
    };

    let first_line = contents.lines().next().unwrap_or("").trim();
    if !is_valid_sha(first_line) {
        debug!(path = %path.display(), "skipping ref file without a valid SHA");
        return None;
    }
    ObjectId::from_hex(first_line).ok()
}

/// Collect every loose ref under `refs/heads`, `refs/remotes`, and
/// `refs/tags` (plus the single `refs/stash` file), as
/// `(full-ref-path, oid)` pairs sorted by path.
///
/// Files whose content is not a valid SHA are skipped silently.
pub(crate) fn collect_loose_refs(git_dir: &Path) -> Vec<(String, ObjectId)> {
    let mut out = Vec::new();

    for root in ["refs/heads", "refs/remotes", "refs/tags"] {
        walk_ref_dir(git_dir, &git_dir.join(root), root, &mut out);
    }

    if let Some(oid) = read_loose_oid(git_dir, "refs/stash") {
        out.push(("refs/stash".to_string(), oid));
    }

    out.sort_by(|a, b| a.0.cmp(&b.0));
    out
}

fn walk_ref_dir(git_dir: &Path, dir: &Path, prefix: &str, out: &mut Vec<(String, ObjectId)>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };

    for entry in entries.filter_map(|e| e.ok()) {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let full = format!("{prefix}/{name}");
        match entry.file_type() {
            Ok(ft) if ft.is_dir() => walk_ref_dir(git_dir, &entry.path(), &full, out),
            Ok(ft) if ft.is_file() => {
                if let Some(oid) = read_loose_oid(git_dir, &full) {
                    out.push((full, oid));
                }
            }
            _ => {}
        }
    }
}
