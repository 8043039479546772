use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::str::FromStr;

use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::{BlobError, BlobResult};

/// Stream of bytes for media content
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Byte range for partial content requests, as parsed from a `Range` header.
/// `end` is inclusive; `None` means "to the end of the object".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: Option<u64>,
}

impl ByteRange {
    /// Create a closed range. `end` must not be below `start`.
    pub fn new(start: u64, end: u64) -> BlobResult<Self> {
        if end < start {
            return Err(BlobError::invalid_range(format!("end {end} before start {start}")));
        }
        Ok(Self {
            start,
            end: Some(end),
        })
    }

    /// Create an open-ended range (`bytes=<start>-`)
    pub fn from_start(start: u64) -> Self {
        Self { start, end: None }
    }

    /// Clamp against the object size. A start at or past the end of the
    /// object is unsatisfiable; an end past it is pulled back to `size - 1`.
    pub fn resolve(&self, total_size: u64) -> BlobResult<ResolvedRange> {
        if self.start >= total_size {
            return Err(BlobError::invalid_range(format!(
                "start {} not below object size {}",
                self.start, total_size
            )));
        }
        let last = total_size - 1;
        let end = self.end.map_or(last, |e| e.min(last));
        Ok(ResolvedRange {
            start: self.start,
            end,
            total_size,
        })
    }
}

/// A range resolved against a concrete object size. Always satisfies
/// `start <= end < total_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRange {
    pub start: u64,
    pub end: u64,
    pub total_size: u64,
}

impl ResolvedRange {
    pub fn content_length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` header value: `bytes <start>-<end>/<size>`
    pub fn content_range_header(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total_size)
    }
}

/// The three media slots a beat owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    File,
    Archive,
    Image,
}

impl MediaType {
    pub const ALL: [MediaType; 3] = [MediaType::File, MediaType::Image, MediaType::Archive];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::File => "file",
            MediaType::Archive => "archive",
            MediaType::Image => "image",
        }
    }
}

impl FromStr for MediaType {
    type Err = BlobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(MediaType::File),
            "archive" => Ok(MediaType::Archive),
            "image" => Ok(MediaType::Image),
            other => Err(BlobError::InvalidMediaType {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything an upload request claims about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaMeta {
    pub media_type: MediaType,
    pub content_type: String,
    /// Declared body length; negative means unknown.
    pub content_length: i64,
    /// Object key the body will be stored under.
    pub name: String,
    /// Unix seconds after which the upload URL is no longer accepted.
    pub expiry: i64,
    /// Path and query exactly as received.
    pub upload_url: String,
}

impl MediaMeta {
    /// Build from the upload query parameters `name`, `type`, `exp`, `hash`.
    /// The hash itself is only checked through `upload_url`.
    pub fn from_query(
        query: &HashMap<String, String>,
        content_type: impl Into<String>,
        content_length: i64,
        upload_url: impl Into<String>,
    ) -> BlobResult<Self> {
        let param = |key: &str| {
            query
                .get(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| BlobError::invalid(format!("missing query parameter `{key}`")))
        };

        let name = param("name")?.clone();
        let media_type = param("type")?.parse::<MediaType>()?;
        let expiry = param("exp")?
            .parse::<i64>()
            .map_err(|_| BlobError::invalid("`exp` must be an integer"))?;
        param("hash")?;

        Ok(Self {
            media_type,
            content_type: content_type.into(),
            content_length,
            name,
            expiry,
            upload_url: upload_url.into(),
        })
    }
}

/// Object metadata returned by `stat`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHead {
    pub size: u64,
    pub content_type: String,
}

/// Result of a successful put operation
#[derive(Debug, Clone)]
pub struct PutResult {
    pub etag: Option<String>,
    pub size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn resolve_clamps_end_to_last_byte() {
        let r = ByteRange::new(0, 499).unwrap().resolve(100).unwrap();
        assert_eq!((r.start, r.end, r.total_size), (0, 99, 100));
        assert_eq!(r.content_length(), 100);

        let r = ByteRange::from_start(10).resolve(100).unwrap();
        assert_eq!(r.end, 99);
        assert_eq!(r.content_range_header(), "bytes 10-99/100");
    }

    #[test]
    fn resolve_rejects_start_past_end() {
        assert!(matches!(
            ByteRange::from_start(100).resolve(100),
            Err(BlobError::InvalidRange { .. })
        ));
        assert!(matches!(
            ByteRange::from_start(0).resolve(0),
            Err(BlobError::InvalidRange { .. })
        ));
    }

    #[test]
    fn media_type_round_trips_wire_names() {
        for t in MediaType::ALL {
            assert_eq!(t.as_str().parse::<MediaType>().unwrap(), t);
        }
        assert!(matches!(
            "video".parse::<MediaType>(),
            Err(BlobError::InvalidMediaType { .. })
        ));
    }

    #[test]
    fn meta_requires_all_parameters() {
        let q = query(&[("name", "abc"), ("type", "image"), ("exp", "1700000000"), ("hash", "x")]);
        let meta = MediaMeta::from_query(&q, "image/png", 10, "/v1/beat?...").unwrap();
        assert_eq!(meta.media_type, MediaType::Image);
        assert_eq!(meta.expiry, 1_700_000_000);

        let q = query(&[("name", "abc"), ("type", "image"), ("exp", "1700000000")]);
        assert!(matches!(
            MediaMeta::from_query(&q, "image/png", 10, ""),
            Err(BlobError::Invalid { .. })
        ));

        let q = query(&[("name", "abc"), ("type", "image"), ("exp", "soon"), ("hash", "x")]);
        assert!(matches!(
            MediaMeta::from_query(&q, "image/png", 10, ""),
            Err(BlobError::Invalid { .. })
        ));
    }
}
