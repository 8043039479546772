//! `Range` request header parsing.
//!
//! Only a single `bytes=<start>-<end?>` range is understood. Suffix ranges
//! (`bytes=-500`) and multi-range requests are rejected as invalid.

use crate::{BlobError, BlobResult, ByteRange};

const BYTES_UNIT: &str = "bytes=";

/// Parse a `Range` header value.
///
/// Returns `Ok(None)` for an absent or blank header, meaning the whole object
/// was requested. The end is not clamped here; see [`ByteRange::resolve`].
pub fn parse_range_header(value: &str) -> BlobResult<Option<ByteRange>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    let spec = value.strip_prefix(BYTES_UNIT).unwrap_or(value);
    let parts: Vec<&str> = spec.split('-').collect();
    let [start, end] = parts.as_slice() else {
        return Err(BlobError::invalid_range(format!("malformed range `{value}`")));
    };

    let start: u64 = start
        .trim()
        .parse()
        .map_err(|_| BlobError::invalid_range(format!("invalid range start in `{value}`")))?;

    let end = end.trim();
    if end.is_empty() {
        return Ok(Some(ByteRange::from_start(start)));
    }

    let end: u64 = end
        .parse()
        .map_err(|_| BlobError::invalid_range(format!("invalid range end in `{value}`")))?;

    ByteRange::new(start, end).map(Some)
}

/// Parse an optional header, e.g. straight from a header map lookup.
pub fn parse_optional_range(value: Option<&str>) -> BlobResult<Option<ByteRange>> {
    match value {
        Some(v) => parse_range_header(v),
        None => Ok(None),
    }
}
