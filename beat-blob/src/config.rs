use std::time::Duration;

use crate::{SizeLimits, DEFAULT_CHUNK_SIZE};

/// Configuration for media operations
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Lifetime of issued upload URLs and presigned download URLs
    pub url_ttl: Duration,

    /// Chunk size for streaming responses
    pub chunk_size: usize,

    /// Per-type upload limits
    pub limits: SizeLimits,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            url_ttl: Duration::from_secs(15 * 60),
            chunk_size: DEFAULT_CHUNK_SIZE,
            limits: SizeLimits::default(),
        }
    }
}

impl MediaConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url_ttl(mut self, ttl: Duration) -> Self {
        self.url_ttl = ttl;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_limits(mut self, limits: SizeLimits) -> Self {
        self.limits = limits;
        self
    }
}
