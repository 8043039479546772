use beat_core::{BeatError, RepositoryError};
use thiserror::Error;

/// Result type for feed operations
pub type FeedResult<T> = Result<T, FeedError>;

/// Errors raised while selecting or recording feed items
#[derive(Error, Debug, Clone)]
pub enum FeedError {
    #[error("No beat found: {0}")]
    NotFound(String),

    #[error("History update gave up after {attempts} conflicting attempts")]
    RetriesExceeded { attempts: u32 },

    #[error("Invalid feed request: {0}")]
    Invalid(String),

    #[error("History backend error: {0}")]
    Backend(String),
}

impl FeedError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<RepositoryError> for FeedError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { what } => Self::NotFound(what),
            other => Self::Backend(other.to_string()),
        }
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for FeedError {
    fn from(err: redis::RedisError) -> Self {
        Self::Backend(err.to_string())
    }
}

impl From<FeedError> for BeatError {
    fn from(err: FeedError) -> Self {
        match err {
            FeedError::NotFound(_) => BeatError::not_found(err.to_string()).with_reason("NotFound"),
            FeedError::RetriesExceeded { .. } => BeatError::unavailable("Feed is busy, try again")
                .with_reason("RetriesExceeded")
                .with_source(anyhow::Error::new(err)),
            FeedError::Invalid(_) => BeatError::bad_request(err.to_string()).with_reason("ValidationFailed"),
            FeedError::Backend(_) => BeatError::general_error(err.to_string())
                .with_reason("Internal")
                .with_source(anyhow::Error::new(err)),
        }
    }
}
