use serde::{Deserialize, Serialize};

use crate::{BlobError, BlobResult, MediaType};

/// Per-media-type upload limits in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeLimits {
    pub file: u64,
    pub archive: u64,
    pub image: u64,
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            file: 50 * 1024 * 1024,     // 50MB
            archive: 500 * 1024 * 1024, // 500MB
            image: 5 * 1024 * 1024,     // 5MB
        }
    }
}

impl SizeLimits {
    pub fn limit_for(&self, media_type: MediaType) -> u64 {
        match media_type {
            MediaType::File => self.file,
            MediaType::Archive => self.archive,
            MediaType::Image => self.image,
        }
    }

    /// Reject a declared length above the limit for its type. A body exactly
    /// at the limit is accepted.
    pub fn check(&self, media_type: MediaType, content_length: i64) -> BlobResult<()> {
        let limit = self.limit_for(media_type);
        if content_length > 0 && content_length as u64 > limit {
            return Err(BlobError::SizeExceeded {
                media_type,
                size: content_length,
                limit,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_is_inclusive() {
        let limits = SizeLimits {
            file: 100,
            archive: 1_000,
            image: 10,
        };

        assert!(limits.check(MediaType::File, 100).is_ok());
        assert!(matches!(
            limits.check(MediaType::File, 101),
            Err(BlobError::SizeExceeded { size: 101, limit: 100, .. })
        ));
        assert!(limits.check(MediaType::Archive, 101).is_ok());
        assert!(limits.check(MediaType::Image, 11).is_err());
        assert!(limits.check(MediaType::Image, 0).is_ok());
    }
}
