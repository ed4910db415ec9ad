use bstr::{BStr, BString, ByteSlice};
use gitview_hash::ObjectId;

use crate::{Identity, ObjectError};

/// A git commit object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// OID of the root tree.
    pub tree: ObjectId,
    /// Parent commit OIDs (empty for root commits, two or more for merges).
    pub parents: Vec<ObjectId>,
    /// Author identity and timestamp.
    pub author: Identity,
    /// Committer identity and timestamp.
    pub committer: Identity,
    /// First line of the commit message.
    pub title: BString,
    /// Rest of the message, with leading blank lines stripped.
    /// Trailing blank lines are preserved.
    pub body: BString,
}

impl Commit {
    /// Parse commit content from raw bytes (no frame header).
    ///
    /// Header lines before the first blank line are matched on their keyword;
    /// unknown keywords (`gpgsig`, `mergetag`, `encoding`, ...) are skipped
    /// for forward compatibility. Everything after the blank line is the
    /// message.
    pub fn parse(content: &[u8]) -> Result<Self, ObjectError> {
        let mut tree: Option<ObjectId> = None;
        let mut parents = Vec::new();
        let mut author: Option<Identity> = None;
        let mut committer: Option<Identity> = None;

        let mut lines = split_lines(content);
        let mut message_lines: Vec<&[u8]> = Vec::new();
        let mut in_message = false;

        for line in lines.drain(..) {
            if in_message {
                message_lines.push(line);
                continue;
            }
            if line.is_empty() {
                in_message = true;
                continue;
            }

            if let Some(rest) = line.strip_prefix(b"tree ") {
                tree = Some(parse_oid(rest)?);
            } else if let Some(rest) = line.strip_prefix(b"parent ") {
                parents.push(parse_oid(rest)?);
            } else if let Some(rest) = line.strip_prefix(b"author ") {
                author = Some(Identity::parse(BStr::new(rest))?);
            } else if let Some(rest) = line.strip_prefix(b"committer ") {
                committer = Some(Identity::parse(BStr::new(rest))?);
            }
            // Any other header (gpgsig, mergetag, encoding, continuation
            // lines, ...) is ignored.
        }

        let tree = tree.ok_or(ObjectError::MissingField { field: "tree" })?;
        let author = author.ok_or(ObjectError::MissingField { field: "author" })?;
        let committer = committer.ok_or(ObjectError::MissingField { field: "committer" })?;

        if message_lines.is_empty() {
            return Err(ObjectError::MalformedCommit("empty message".into()));
        }

        let title = BString::from(message_lines[0]);

        let mut body_lines = &message_lines[1..];
        while let Some((first, rest)) = body_lines.split_first() {
            if first.is_empty() {
                body_lines = rest;
            } else {
                break;
            }
        }
        let body = BString::from(body_lines.join(&b"\n"[..]));

        Ok(Self {
            tree,
            parents,
            author,
            committer,
            title,
            body,
        })
    }

    /// Serialize commit content to bytes (no frame header).
    pub fn serialize_content(&self) -> Vec<u8> {
        let mut out = Vec::new();

        out.extend_from_slice(b"tree ");
        out.extend_from_slice(self.tree.to_hex().as_bytes());
        out.push(b'\n');

        for parent in &self.parents {
            out.extend_from_slice(b"parent ");
            out.extend_from_slice(parent.to_hex().as_bytes());
            out.push(b'\n');
        }

        out.extend_from_slice(b"author ");
        out.extend_from_slice(&self.author.to_bytes());
        out.push(b'\n');

        out.extend_from_slice(b"committer ");
        out.extend_from_slice(&self.committer.to_bytes());
        out.push(b'\n');

        out.push(b'\n');
        out.extend_from_slice(&self.title);
        out.push(b'\n');
        if !self.body.is_empty() {
            out.push(b'\n');
            out.extend_from_slice(&self.body);
            out.push(b'\n');
        }

        out
    }

    /// Get the first parent (or None for root commits).
    pub fn first_parent(&self) -> Option<&ObjectId> {
        self.parents.first()
    }

    /// Is this a merge commit? (more than one parent)
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// Is this a root commit? (no parents)
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }
}

/// Split on `\n`, preserving interior empty lines. A trailing newline
/// produces no phantom empty line.
fn split_lines(content: &[u8]) -> Vec<&[u8]> {
    let mut lines: Vec<&[u8]> = content.split(|&b| b == b'\n').collect();
    if content.last() == Some(&b'\n') {
        lines.pop();
    }
    lines
}

fn parse_oid(bytes: &[u8]) -> Result<ObjectId, ObjectError> {
    let hex = std::str::from_utf8(bytes.trim())
        .map_err(|_| ObjectError::MalformedCommit("non-UTF-8 object id".into()))?;
    Ok(ObjectId::from_hex(hex)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_commit_bytes() -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"tree da39a3ee5e6b4b0d3255bfef95601890afd80709\n");
        out.extend_from_slice(b"parent 0000000000000000000000000000000000000001\n");
        out.extend_from_slice(b"author John Doe <john@example.com> 1234567890 +0000\n");
        out.extend_from_slice(b"committer Jane Doe <jane@example.com> 1234567890 +0000\n");
        out.extend_from_slice(b"\n");
        out.extend_from_slice(b"Initial commit\n");
        out
    }

    #[test]
    fn parse_commit() {
        let commit = Commit::parse(&sample_commit_bytes()).unwrap();
        assert_eq!(
            commit.tree.to_hex(),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
        assert_eq!(commit.parents.len(), 1);
        assert_eq!(commit.author.name, "John Doe");
        assert_eq!(commit.committer.email, "jane@example.com");
        assert_eq!(commit.title, "Initial commit");
        assert_eq!(commit.body, "");
    }

    #[test]
    fn parse_two_parent_merge() {
        let mut data = Vec::new();
        data.extend_from_slice(b"tree 1111111111111111111111111111111111111111\n");
        data.extend_from_slice(b"parent 2222222222222222222222222222222222222222\n");
        data.extend_from_slice(b"parent 3333333333333333333333333333333333333333\n");
        data.extend_from_slice(b"author A <a@x> 1700000000 +0000\n");
        data.extend_from_slice(b"committer C <c@x> 1700000001 +0000\n");
        data.extend_from_slice(b"\nSubject\n\nBody line.\n");

        let commit = Commit::parse(&data).unwrap();
        assert!(commit.is_merge());
        assert_eq!(
            commit.parents,
            vec![
                ObjectId::from_hex("2222222222222222222222222222222222222222").unwrap(),
                ObjectId::from_hex("3333333333333333333333333333333333333333").unwrap(),
            ]
        );
        assert_eq!(commit.title, "Subject");
        assert_eq!(commit.body, "Body line.");
    }

    #[test]
    fn parse_root_commit() {
        let mut data = Vec::new();
        data.extend_from_slice(b"tree da39a3ee5e6b4b0d3255bfef95601890afd80709\n");
        data.extend_from_slice(b"author A <a@b.com> 1000000000 +0000\n");
        data.extend_from_slice(b"committer A <a@b.com> 1000000000 +0000\n");
        data.extend_from_slice(b"\nroot\n");

        let commit = Commit::parse(&data).unwrap();
        assert!(commit.is_root());
        assert!(!commit.is_merge());
        assert_eq!(commit.first_parent(), None);
    }

    #[test]
    fn unknown_headers_are_ignored() {
        let mut data = Vec::new();
        data.extend_from_slice(b"tree da39a3ee5e6b4b0d3255bfef95601890afd80709\n");
        data.extend_from_slice(b"author A <a@b.com> 1000000000 +0000\n");
        data.extend_from_slice(b"committer A <a@b.com> 1000000000 +0000\n");
        data.extend_from_slice(b"encoding ISO-8859-1\n");
        data.extend_from_slice(b"gpgsig -----BEGIN PGP SIGNATURE-----\n");
        data.extend_from_slice(b" abcdef\n");
        data.extend_from_slice(b" -----END PGP SIGNATURE-----\n");
        data.extend_from_slice(b"\nmessage\n");

        let commit = Commit::parse(&data).unwrap();
        assert_eq!(commit.title, "message");
    }

    #[test]
    fn leading_blank_lines_stripped_from_body() {
        let mut data = Vec::new();
        data.extend_from_slice(b"tree da39a3ee5e6b4b0d3255bfef95601890afd80709\n");
        data.extend_from_slice(b"author A <a@b.com> 1000000000 +0000\n");
        data.extend_from_slice(b"committer A <a@b.com> 1000000000 +0000\n");
        data.extend_from_slice(b"\nSubject\n\n\n\nBody.\n");

        let commit = Commit::parse(&data).unwrap();
        assert_eq!(commit.body, "Body.");
    }

    #[test]
    fn trailing_blank_lines_preserved_in_body() {
        let mut data = Vec::new();
        data.extend_from_slice(b"tree da39a3ee5e6b4b0d3255bfef95601890afd80709\n");
        data.extend_from_slice(b"author A <a@b.com> 1000000000 +0000\n");
        data.extend_from_slice(b"committer A <a@b.com> 1000000000 +0000\n");
        data.extend_from_slice(b"\nSubject\n\nBody.\n\n");

        let commit = Commit::parse(&data).unwrap();
        assert_eq!(commit.body, "Body.\n");
    }

    #[test]
    fn missing_tree_errors() {
        let data =
            b"author A <a@b.com> 1000000000 +0000\ncommitter A <a@b.com> 1000000000 +0000\n\nmsg\n";
        let err = Commit::parse(data).unwrap_err();
        assert!(matches!(err, ObjectError::MissingField { field: "tree" }));
    }

    #[test]
    fn missing_author_errors() {
        let data = b"tree da39a3ee5e6b4b0d3255bfef95601890afd80709\ncommitter A <a@b.com> 1 +0000\n\nmsg\n";
        let err = Commit::parse(data).unwrap_err();
        assert!(matches!(err, ObjectError::MissingField { field: "author" }));
    }

    #[test]
    fn empty_message_errors() {
        let data = b"tree da39a3ee5e6b4b0d3255bfef95601890afd80709\nauthor A <a@b.com> 1 +0000\ncommitter A <a@b.com> 1 +0000\n";
        let err = Commit::parse(data).unwrap_err();
        assert!(matches!(err, ObjectError::MalformedCommit(_)));
    }

    #[test]
    fn serialize_reparse_is_stable() {
        let mut data = Vec::new();
        data.extend_from_slice(b"tree da39a3ee5e6b4b0d3255bfef95601890afd80709\n");
        data.extend_from_slice(b"parent 0000000000000000000000000000000000000001\n");
        data.extend_from_slice(b"author A <a@b.com> 1000000000 +0100\n");
        data.extend_from_slice(b"committer B <b@c.com> 1000000001 -0230\n");
        data.extend_from_slice(b"\nSubject\n\nParagraph one.\n\nParagraph two.\n");

        let first = Commit::parse(&data).unwrap();
        let reparsed = Commit::parse(&first.serialize_content()).unwrap();
        assert_eq!(first, reparsed);
    }
}
