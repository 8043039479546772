use std::time::Duration;

use async_trait::async_trait;

use crate::{BlobResult, ByteStream, ObjectHead, PutResult, ResolvedRange};

/// Object storage primitives the media paths depend on.
///
/// All keys live in one bucket chosen when the store is built.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Size and content type of an object; `NotFound` if absent
    async fn stat(&self, key: &str) -> BlobResult<ObjectHead>;

    /// Stream an object, or only the bytes of `range` when given
    async fn get_range(&self, key: &str, range: Option<ResolvedRange>) -> BlobResult<ByteStream>;

    /// Store a body under `key`, replacing any existing object
    async fn put(&self, key: &str, content_type: &str, body: ByteStream) -> BlobResult<PutResult>;

    /// Time-limited URL granting GET on one key
    async fn presign_get(&self, key: &str, ttl: Duration) -> BlobResult<String>;
}
