use bstr::{BStr, BString, ByteSlice};
use gitview_hash::ObjectId;

use crate::ObjectError;

/// What a tree entry points at, derived from its mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular or executable file, or anything with an unrecognized mode.
    Blob,
    /// Subdirectory (40000).
    Tree,
    /// Symbolic link (120000).
    Symlink,
    /// Submodule commit reference (160000).
    Gitlink,
}

impl EntryKind {
    /// Derive the kind from the ASCII octal mode string.
    pub fn from_mode(mode: &[u8]) -> Self {
        match mode {
            b"40000" | b"040000" => Self::Tree,
            b"160000" => Self::Gitlink,
            b"120000" => Self::Symlink,
            _ => Self::Blob,
        }
    }
}

/// A single entry in a git tree object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// ASCII octal mode as stored on disk (e.g. `100644`, `40000`).
    pub mode: BString,
    /// Kind derived from the mode.
    pub kind: EntryKind,
    /// OID of the referenced object.
    pub oid: ObjectId,
    /// Entry file name.
    pub name: BString,
    /// Repo-root-relative path. Empty from the parser; filled by tree
    /// walkers that know the parent path.
    pub path: BString,
}

/// A git tree object — a directory listing.
///
/// Entries keep their on-disk order; the parser does not re-sort them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    /// Parse tree content from the binary format.
    ///
    /// Each entry is: `<mode-ascii> <name>\0<20 raw oid bytes>`.
    pub fn parse(content: &[u8]) -> Result<Self, ObjectError> {
        let mut entries = Vec::new();
        let mut pos = 0;

        while pos < content.len() {
            let space_pos = content[pos..]
                .find_byte(b' ')
                .map(|p| p + pos)
                .ok_or_else(|| ObjectError::MalformedTree {
                    offset: pos,
                    reason: "missing space after mode".into(),
                })?;
            let mode = BString::from(&content[pos..space_pos]);
            let kind = EntryKind::from_mode(&mode);

            let name_start = space_pos + 1;
            let null_pos = content[name_start..]
                .find_byte(0)
                .map(|p| p + name_start)
                .ok_or_else(|| ObjectError::MalformedTree {
                    offset: name_start,
                    reason: "missing null after name".into(),
                })?;
            let name = BString::from(&content[name_start..null_pos]);

            let oid_start = null_pos + 1;
            let oid_end = oid_start + 20;
            if oid_end > content.len() {
                return Err(ObjectError::MalformedTree {
                    offset: oid_start,
                    reason: "truncated object id".into(),
                });
            }
            let oid = ObjectId::from_bytes(&content[oid_start..oid_end])?;

            entries.push(TreeEntry {
                mode,
                kind,
                oid,
                name,
                path: BString::from(""),
            });
            pos = oid_end;
        }

        Ok(Self { entries })
    }

    /// Serialize tree content to the binary format, in entry order.
    pub fn serialize_content(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for entry in &self.entries {
            out.extend_from_slice(&entry.mode);
            out.push(b' ');
            out.extend_from_slice(&entry.name);
            out.push(0);
            out.extend_from_slice(entry.oid.as_bytes());
        }
        out
    }

    /// Lookup an entry by name.
    pub fn find(&self, name: &BStr) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.name.as_bstr() == name)
    }

    /// Iterate entries.
    pub fn iter(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
