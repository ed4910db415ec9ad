//! packed-refs parsing.

use std::fs;
use std::path::Path;

use bstr::ByteSlice;
use gitview_hash::ObjectId;
use tracing::debug;

use crate::RefError;

/// A single entry in the packed-refs file.
#[derive(Debug, Clone)]
pub struct PackedRef {
    /// Full ref path, e.g. `refs/heads/main`.
    pub full_name: String,
    pub oid: ObjectId,
    /// Peeled commit OID for annotated tags, from the `^` line.
    pub peeled: Option<ObjectId>,
}

/// Parsed packed-refs file.
///
/// The packed-refs file contains refs that have been "packed" from loose
/// files into a single file for efficiency. Format:
/// ```text
/// # pack-refs with: peeled fully-peeled sorted
/// <hex-oid> <refname>
/// ^<hex-oid>   (peeled value of the annotated tag above)
/// ```
///
/// Lines that fail to parse are skipped; one bad entry never poisons the
/// rest of the file.
#[derive(Debug, Clone, Default)]
pub struct PackedRefs {
    refs: Vec<PackedRef>,
}

impl PackedRefs {
    /// Parse packed-refs content.
    pub fn parse(data: &[u8]) -> Self {
        let mut refs: Vec<PackedRef> = Vec::new();

        for line in data.lines() {
            if line.is_empty() || line.starts_with(b"#") {
                continue;
            }

            // Peeled line: ^<hex-oid>, attaches to the preceding ref.
            if let Some(hex) = line.strip_prefix(b"^") {
                let peeled = std::str::from_utf8(hex)
                    .ok()
                    .and_then(|h| ObjectId::from_hex(h.trim()).ok());
                match (refs.last_mut(), peeled) {
                    (Some(last), Some(oid)) => last.peeled = Some(oid),
                    _ => debug!(
                        line = %String::from_utf8_lossy(line),
                        "skipping stray or invalid peel line in packed-refs"
                    ),
                }
                continue;
            }

            // Normal line: <hex-oid> <refname>
            let parsed = (|| {
                let space_pos = line.find_byte(b' ')?;
                let hex = std::str::from_utf8(&line[..space_pos]).ok()?;
                let oid = ObjectId::from_hex(hex).ok()?;
                let name = std::str::from_utf8(&line[space_pos + 1..]).ok()?.trim();
                if name.is_empty() {
                    return None;
                }
                Some(PackedRef {
                    full_name: name.to_string(),
                    oid,
                    peeled: None,
                })
            })();

            match parsed {
                Some(pr) => refs.push(pr),
                None => debug!(
                    line = %String::from_utf8_lossy(line),
                    "skipping malformed packed-refs line"
                ),
            }
        }

        Self { refs }
    }

    /// Load packed-refs from disk. A missing file yields an empty set.
    pub fn load(git_dir: &Path) -> Result<Self, RefError> {
        let path = git_dir.join("packed-refs");
        match fs::read(&path) {
            Ok(data) => Ok(Self::parse(&data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(RefError::IoPath { path, source: e }),
        }
    }

    /// Look up a ref by its full path with a linear scan.
    pub fn find(&self, full_name: &str) -> Option<&PackedRef> {
        self.refs.iter().find(|pr| pr.full_name == full_name)
    }

    /// All parsed refs, in file order.
    pub fn refs(&self) -> &[PackedRef] {
        &self.refs
    }
}
