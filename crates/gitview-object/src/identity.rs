use bstr::{BStr, BString, ByteSlice, ByteVec};

use crate::ObjectError;

/// An author or committer line: who, when, and in which timezone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: BString,
    pub email: BString,
    /// Seconds since the Unix epoch, UTC.
    pub timestamp: i64,
    /// Timezone as written in the object, e.g. `"+0200"` or `"-0500"`.
    pub timezone: String,
}

impl Identity {
    /// Parse from git's signature format: `Name <email> timestamp tz`.
    ///
    /// The email is delimited by the first `<`/`>` pair; the two
    /// whitespace-separated fields after `>` are the Unix timestamp and the
    /// timezone string.
    pub fn parse(input: &BStr) -> Result<Self, ObjectError> {
        let input = input.as_bytes();

        let lt_pos = input
            .find_byte(b'<')
            .ok_or_else(|| ObjectError::MalformedCommit("missing '<' in signature".into()))?;
        let gt_pos = input[lt_pos..]
            .find_byte(b'>')
            .map(|p| p + lt_pos)
            .ok_or_else(|| ObjectError::MalformedCommit("missing '>' in signature".into()))?;

        let name = BString::from(input[..lt_pos].trim());
        let email = BString::from(&input[lt_pos + 1..gt_pos]);

        let rest = input[gt_pos + 1..].trim();
        let rest = std::str::from_utf8(rest)
            .map_err(|_| ObjectError::MalformedCommit("non-UTF-8 date in signature".into()))?;
        let mut fields = rest.split_whitespace();

        let timestamp: i64 = fields
            .next()
            .ok_or_else(|| ObjectError::MalformedCommit("missing timestamp in signature".into()))?
            .parse()
            .map_err(|_| ObjectError::MalformedCommit(format!("invalid timestamp in {rest:?}")))?;

        let timezone = fields
            .next()
            .ok_or_else(|| ObjectError::MalformedCommit("missing timezone in signature".into()))?
            .to_string();

        Ok(Self {
            name,
            email,
            timestamp,
            timezone,
        })
    }

    /// Format in git's canonical signature format: `Name <email> timestamp tz`.
    pub fn to_bytes(&self) -> BString {
        let mut out = BString::new(Vec::new());
        out.push_str(&self.name);
        out.push_str(b" <");
        out.push_str(&self.email);
        out.push_str(b"> ");
        out.push_str(format!("{} {}", self.timestamp, self.timezone).as_bytes());
        out
    }
}
