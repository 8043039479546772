use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::{
    BlobResult, ByteRange, ByteStream, ChunkedCopier, MediaConfig, MediaMeta, MediaType, MediaUrlSigner,
    ObjectStore, PutResult, ResolvedRange,
};

/// An object opened for delivery.
pub struct OpenedMedia {
    pub stream: ByteStream,
    pub content_type: String,
    pub total_size: u64,
    /// Set when a range was requested; already clamped to the object.
    pub range: Option<ResolvedRange>,
}

impl OpenedMedia {
    /// Number of bytes `stream` will yield.
    pub fn content_length(&self) -> u64 {
        self.range.map_or(self.total_size, |r| r.content_length())
    }
}

/// A freshly signed upload URL for one media slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedUpload {
    pub name: String,
    pub media_type: MediaType,
    pub expires_at: i64,
    pub upload_url: String,
}

/// Upload URLs for the three media slots of a new beat.
#[derive(Debug, Clone, Serialize)]
pub struct UploadUrls {
    pub file: IssuedUpload,
    pub image: IssuedUpload,
    pub archive: IssuedUpload,
}

/// Media delivery and intake on top of an [`ObjectStore`].
///
/// Streams go out through [`MediaAdapter::open`]; uploads come in through
/// [`MediaAdapter::upload`], which never touches the store unless the URL
/// signature, expiry and size all check out.
pub struct MediaAdapter {
    store: Arc<dyn ObjectStore>,
    signer: MediaUrlSigner,
    config: MediaConfig,
    copier: ChunkedCopier,
}

impl MediaAdapter {
    pub fn new<S: ObjectStore + 'static>(store: S, signer: MediaUrlSigner, config: MediaConfig) -> Self {
        Self::from_arc(Arc::new(store), signer, config)
    }

    pub fn from_arc(store: Arc<dyn ObjectStore>, signer: MediaUrlSigner, config: MediaConfig) -> Self {
        let copier = ChunkedCopier::new(config.chunk_size);
        Self {
            store,
            signer,
            config,
            copier,
        }
    }

    pub fn config(&self) -> &MediaConfig {
        &self.config
    }

    pub fn copier(&self) -> ChunkedCopier {
        self.copier
    }

    pub fn signer(&self) -> &MediaUrlSigner {
        &self.signer
    }

    /// Stat the object, clamp the requested range, and open a stream.
    ///
    /// An unsatisfiable range fails before any content is fetched.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn open(&self, key: &str, range: Option<ByteRange>) -> BlobResult<OpenedMedia> {
        let head = self.store.stat(key).await?;
        let range = range.map(|r| r.resolve(head.size)).transpose()?;
        let stream = self.store.get_range(key, range).await?;

        debug!(size = head.size, ranged = range.is_some(), "media opened");
        Ok(OpenedMedia {
            stream,
            content_type: head.content_type,
            total_size: head.size,
            range,
        })
    }

    /// Verify the signed URL, enforce the size limit, then store the body.
    #[instrument(skip(self, meta, body), fields(name = %meta.name, media_type = %meta.media_type))]
    pub async fn upload(&self, meta: &MediaMeta, body: ByteStream, now: i64) -> BlobResult<PutResult> {
        self.signer.verify(&meta.upload_url, meta, now)?;
        self.config.limits.check(meta.media_type, meta.content_length)?;

        let result = self.store.put(&meta.name, &meta.content_type, body).await?;
        info!(size = result.size_bytes, "media stored");
        Ok(result)
    }

    /// Sign an upload URL for an existing object name.
    pub fn upload_url_for(&self, name: &str, media_type: MediaType, now: i64) -> IssuedUpload {
        let expires_at = now + self.config.url_ttl.as_secs() as i64;
        let signed = self.signer.build(name, media_type, expires_at);
        IssuedUpload {
            name: name.to_string(),
            media_type,
            expires_at,
            upload_url: signed.to_url(),
        }
    }

    /// Mint object names for a new beat and sign an upload URL for each slot.
    pub fn issue_upload_urls(&self, now: i64) -> UploadUrls {
        let mint = |media_type| self.upload_url_for(&Uuid::new_v4().to_string(), media_type, now);
        UploadUrls {
            file: mint(MediaType::File),
            image: mint(MediaType::Image),
            archive: mint(MediaType::Archive),
        }
    }

    /// Presigned GET for direct download from the bucket.
    pub async fn download_url(&self, key: &str) -> BlobResult<String> {
        self.store.presign_get(key, self.config.url_ttl).await
    }
}
