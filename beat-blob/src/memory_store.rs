use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use parking_lot::RwLock;

use crate::{BlobError, BlobResult, ByteStream, ObjectHead, ObjectStore, PutResult, ResolvedRange};

/// Slice size used when streaming stored objects back.
const READ_CHUNK: usize = 8 * 1024;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
}

/// In-memory object store for tests and local development
#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
    puts: Arc<AtomicUsize>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without going through `put`.
    pub fn insert(&self, key: impl Into<String>, content_type: impl Into<String>, data: impl Into<Bytes>) {
        self.objects.write().insert(
            key.into(),
            StoredObject {
                data: data.into(),
                content_type: content_type.into(),
            },
        );
    }

    pub fn get_bytes(&self, key: &str) -> Option<Bytes> {
        self.objects.read().get(key).map(|o| o.data.clone())
    }

    /// Number of `put` calls that reached the store.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    fn object(&self, key: &str) -> BlobResult<StoredObject> {
        self.objects
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| BlobError::not_found(key))
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn stat(&self, key: &str) -> BlobResult<ObjectHead> {
        let object = self.object(key)?;
        Ok(ObjectHead {
            size: object.data.len() as u64,
            content_type: object.content_type,
        })
    }

    async fn get_range(&self, key: &str, range: Option<ResolvedRange>) -> BlobResult<ByteStream> {
        let object = self.object(key)?;
        let data = match range {
            Some(r) => {
                if r.end >= object.data.len() as u64 {
                    return Err(BlobError::invalid_range(r.content_range_header()));
                }
                object.data.slice(r.start as usize..=r.end as usize)
            }
            None => object.data,
        };

        let chunks: Vec<Result<Bytes, std::io::Error>> = data
            .chunks(READ_CHUNK)
            .map(|c| Ok(data.slice_ref(c)))
            .collect();
        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn put(&self, key: &str, content_type: &str, mut body: ByteStream) -> BlobResult<PutResult> {
        self.puts.fetch_add(1, Ordering::SeqCst);

        let mut data = BytesMut::new();
        while let Some(chunk) = body.next().await {
            data.extend_from_slice(&chunk?);
        }
        let size_bytes = data.len() as u64;
        self.insert(key, content_type, data.freeze());

        Ok(PutResult {
            etag: None,
            size_bytes,
        })
    }

    /// Like S3, presigning does not check that the object exists.
    async fn presign_get(&self, key: &str, ttl: Duration) -> BlobResult<String> {
        Ok(format!("memory://{key}?op=get&expires_in={}", ttl.as_secs()))
    }
}
