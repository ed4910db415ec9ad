use crate::{ObjectError, ObjectType};

/// Parse a loose object frame header from raw bytes.
///
/// The header format is `"<type> <size>\0"`. Returns `(type, declared_size,
/// header_length)` where `header_length` includes the null terminator.
///
/// The declared size is returned as read; whether it matches the actual
/// content length is checked (and tolerated) by the caller.
pub fn parse_header(data: &[u8]) -> Result<(ObjectType, usize, usize), ObjectError> {
    let space_pos = data
        .iter()
        .position(|&b| b == b' ')
        .ok_or_else(|| ObjectError::MalformedHeader("missing space after type".into()))?;

    let null_pos = data[space_pos..]
        .iter()
        .position(|&b| b == 0)
        .map(|p| p + space_pos)
        .ok_or_else(|| ObjectError::MalformedHeader("missing null terminator".into()))?;

    let obj_type = ObjectType::from_bytes(&data[..space_pos])?;

    let size_bytes = &data[space_pos + 1..null_pos];
    let size_str = std::str::from_utf8(size_bytes)
        .map_err(|_| ObjectError::MalformedHeader("non-ASCII size".into()))?;
    let declared_size: usize = size_str
        .parse()
        .map_err(|_| ObjectError::MalformedHeader(format!("invalid size: {size_str:?}")))?;

    Ok((obj_type, declared_size, null_pos + 1))
}
