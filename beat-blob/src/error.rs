use beat_core::BeatError;
use thiserror::Error;

use crate::MediaType;

/// Result type for media operations
pub type BlobResult<T> = Result<T, BlobError>;

/// Errors that can occur while serving or accepting media
#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Object not found: {key}")]
    NotFound { key: String },

    #[error("Invalid range: {message}")]
    InvalidRange { message: String },

    #[error("Upload URL signature mismatch")]
    InvalidHash,

    #[error("Upload URL expired at {expiry} (now {now})")]
    UrlExpired { expiry: i64, now: i64 },

    #[error("{media_type} too large: {size} > {limit}")]
    SizeExceeded {
        media_type: MediaType,
        size: i64,
        limit: u64,
    },

    #[error("Invalid media type: {value}")]
    InvalidMediaType { value: String },

    #[error("Invalid request: {message}")]
    Invalid { message: String },

    #[error("Storage backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl BlobError {
    /// Create a backend error from any error type
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    pub fn invalid_range<S: Into<String>>(message: S) -> Self {
        Self::InvalidRange {
            message: message.into(),
        }
    }

    pub fn not_found<S: Into<String>>(key: S) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Name of the failure as exposed to clients.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NotFound",
            Self::InvalidRange { .. } => "InvalidRange",
            Self::InvalidHash => "InvalidHash",
            Self::UrlExpired { .. } => "URLExpired",
            Self::SizeExceeded { .. } => "SizeExceeded",
            Self::InvalidMediaType { .. } => "InvalidMediaType",
            Self::Invalid { .. } => "ValidationFailed",
            Self::Backend { .. } | Self::Io { .. } => "Internal",
        }
    }
}

impl From<BlobError> for BeatError {
    fn from(err: BlobError) -> Self {
        let reason = err.reason();
        match err {
            BlobError::NotFound { .. } => BeatError::not_found(err.to_string()).with_reason(reason),
            BlobError::InvalidRange { .. }
            | BlobError::InvalidHash
            | BlobError::UrlExpired { .. }
            | BlobError::SizeExceeded { .. }
            | BlobError::InvalidMediaType { .. }
            | BlobError::Invalid { .. } => BeatError::bad_request(err.to_string()).with_reason(reason),
            BlobError::Backend { .. } | BlobError::Io { .. } => BeatError::general_error(err.to_string())
                .with_reason(reason)
                .with_source(anyhow::Error::new(err)),
        }
    }
}
