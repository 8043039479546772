use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream as AwsByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use bytes::BytesMut;
use futures::StreamExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, instrument, warn};

use crate::{BlobError, BlobResult, ByteStream, ObjectHead, ObjectStore, PutResult, ResolvedRange};

/// Bodies up to this size go out as one PUT; larger ones as multipart parts of
/// at least this size.
pub const DEFAULT_PART_SIZE: usize = 8 * 1024 * 1024;

const CONNECT_ATTEMPTS: u32 = 10;
const CONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// Connection settings for an S3-compatible endpoint (AWS, MinIO, RustFS).
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub endpoint_url: Option<String>,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
}

/// Object store backed by an S3-compatible service
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    part_size: usize,
}

impl S3ObjectStore {
    /// Build a client and make sure the bucket exists, creating it if needed.
    pub async fn connect(settings: S3Settings) -> BlobResult<Self> {
        let bucket = settings.bucket.clone();
        let client = Self::create_client(settings).await;
        let store = Self::from_client(client, bucket);
        store.ensure_bucket().await?;
        Ok(store)
    }

    pub fn from_client(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            part_size: DEFAULT_PART_SIZE,
        }
    }

    pub fn with_part_size(mut self, part_size: usize) -> Self {
        self.part_size = part_size.max(5 * 1024 * 1024);
        self
    }

    async fn create_client(settings: S3Settings) -> Client {
        let credentials = Credentials::new(
            settings.access_key_id,
            settings.secret_access_key,
            None,
            None,
            "beatflow",
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region))
            .credentials_provider(credentials);
        if let Some(endpoint) = settings.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let aws_config = loader.load().await;

        Client::from_conf(
            aws_sdk_s3::config::Builder::from(&aws_config)
                .force_path_style(true) // MinIO/RustFS need path-style addressing
                .build(),
        )
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn ensure_bucket(&self) -> BlobResult<()> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.client.head_bucket().bucket(&self.bucket).send().await {
                Ok(_) => return Ok(()),
                Err(err) if err.as_service_error().map(|e| e.is_not_found()).unwrap_or(false) => {
                    info!("bucket missing, creating it");
                    self.client
                        .create_bucket()
                        .bucket(&self.bucket)
                        .send()
                        .await
                        .map_err(BlobError::backend)?;
                    return Ok(());
                }
                Err(err) if attempt < CONNECT_ATTEMPTS => {
                    warn!(attempt, error = %err, "object store not reachable yet");
                    tokio::time::sleep(CONNECT_BACKOFF).await;
                }
                Err(err) => return Err(BlobError::backend(err)),
            }
        }
    }

    /// Pull chunks into `buf` until it holds `part_size` bytes. Returns true
    /// when the body is exhausted.
    async fn fill_part(body: &mut ByteStream, buf: &mut BytesMut, part_size: usize) -> BlobResult<bool> {
        while buf.len() < part_size {
            match body.next().await {
                Some(chunk) => buf.extend_from_slice(&chunk?),
                None => return Ok(true),
            }
        }
        Ok(false)
    }

    async fn put_single(&self, key: &str, content_type: &str, data: BytesMut) -> BlobResult<PutResult> {
        let size_bytes = data.len() as u64;
        let result = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(AwsByteStream::from(data.freeze()))
            .send()
            .await
            .map_err(BlobError::backend)?;

        Ok(PutResult {
            etag: result.e_tag,
            size_bytes,
        })
    }

    async fn put_multipart(
        &self,
        key: &str,
        content_type: &str,
        first: BytesMut,
        body: ByteStream,
    ) -> BlobResult<PutResult> {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(BlobError::backend)?;
        let upload_id = created
            .upload_id()
            .ok_or_else(|| BlobError::invalid("object store returned no upload id"))?
            .to_string();

        match self.upload_parts(key, &upload_id, first, body).await {
            Ok((parts, size_bytes)) => {
                let result = self
                    .client
                    .complete_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .multipart_upload(CompletedMultipartUpload::builder().set_parts(Some(parts)).build())
                    .send()
                    .await
                    .map_err(BlobError::backend)?;
                Ok(PutResult {
                    etag: result.e_tag,
                    size_bytes,
                })
            }
            Err(err) => {
                if let Err(abort) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    warn!(key, upload_id = %upload_id, error = %abort, "failed to abort multipart upload");
                }
                Err(err)
            }
        }
    }

    async fn upload_parts(
        &self,
        key: &str,
        upload_id: &str,
        first: BytesMut,
        mut body: ByteStream,
    ) -> BlobResult<(Vec<CompletedPart>, u64)> {
        let mut parts = Vec::new();
        let mut size_bytes = 0u64;
        let mut part_number = 1;
        let mut current = first;
        let mut exhausted = false;

        loop {
            size_bytes += current.len() as u64;
            let out = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(AwsByteStream::from(current.freeze()))
                .send()
                .await
                .map_err(BlobError::backend)?;
            parts.push(
                CompletedPart::builder()
                    .part_number(part_number)
                    .set_e_tag(out.e_tag().map(str::to_string))
                    .build(),
            );
            debug!(key, part_number, "uploaded part");

            if exhausted {
                break;
            }
            let mut next = BytesMut::with_capacity(self.part_size);
            exhausted = Self::fill_part(&mut body, &mut next, self.part_size).await?;
            if next.is_empty() {
                break;
            }
            current = next;
            part_number += 1;
        }

        Ok((parts, size_bytes))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn stat(&self, key: &str) -> BlobResult<ObjectHead> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| match err.as_service_error() {
                Some(e) if e.is_not_found() => BlobError::not_found(key),
                _ => BlobError::backend(err),
            })?;

        Ok(ObjectHead {
            size: result.content_length.unwrap_or(0).max(0) as u64,
            content_type: result
                .content_type
                .unwrap_or_else(|| "application/octet-stream".to_string()),
        })
    }

    async fn get_range(&self, key: &str, range: Option<ResolvedRange>) -> BlobResult<ByteStream> {
        let mut request = self.client.get_object().bucket(&self.bucket).key(key);
        if let Some(r) = range {
            request = request.range(format!("bytes={}-{}", r.start, r.end));
        }

        let result = request.send().await.map_err(|err| match err.as_service_error() {
            Some(e) if e.is_no_such_key() => BlobError::not_found(key),
            _ => BlobError::backend(err),
        })?;

        Ok(Box::pin(ReaderStream::new(result.body.into_async_read())))
    }

    #[instrument(skip(self, body), fields(bucket = %self.bucket))]
    async fn put(&self, key: &str, content_type: &str, mut body: ByteStream) -> BlobResult<PutResult> {
        let mut first = BytesMut::with_capacity(self.part_size);
        let exhausted = Self::fill_part(&mut body, &mut first, self.part_size).await?;
        if exhausted {
            self.put_single(key, content_type, first).await
        } else {
            self.put_multipart(key, content_type, first, body).await
        }
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> BlobResult<String> {
        let config = PresigningConfig::expires_in(ttl).map_err(BlobError::backend)?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(BlobError::backend)?;
        Ok(request.uri().to_string())
    }
}
