use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;

use beat_blob::prelude::*;
use beat_blob::{ObjectStore, SizeLimits};

const NOW: i64 = 1_700_000_000;

/// Test factory functions
fn create_store() -> MemoryObjectStore {
    let store = MemoryObjectStore::new();
    store.insert("song.mp3", "audio/mpeg", (0..1000u32).map(|i| (i % 256) as u8).collect::<Vec<u8>>());
    store
}

fn create_adapter(store: MemoryObjectStore) -> MediaAdapter {
    let signer = MediaUrlSigner::new("test-secret").unwrap();
    let config = MediaConfig::new()
        .with_url_ttl(Duration::from_secs(600))
        .with_limits(SizeLimits {
            file: 16,
            archive: 1024,
            image: 8,
        });
    MediaAdapter::new(store, signer, config)
}

fn body(data: &'static [u8]) -> ByteStream {
    Box::pin(futures::stream::iter(vec![Ok(Bytes::from_static(data))]))
}

fn meta_from_url(url: &str, content_type: &str, content_length: i64) -> BlobResult<MediaMeta> {
    let query: HashMap<String, String> = url
        .split_once('?')
        .map(|(_, q)| q)
        .unwrap_or_default()
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    MediaMeta::from_query(&query, content_type, content_length, url)
}

async fn collect(mut stream: ByteStream) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(chunk) = stream.next().await {
        out.extend_from_slice(&chunk.unwrap());
    }
    out
}

/// S1. Open without range yields the whole object
#[tokio::test]
async fn test_open_whole_object() {
    let adapter = create_adapter(create_store());

    let opened = adapter.open("song.mp3", None).await.unwrap();

    assert_eq!(opened.content_type, "audio/mpeg");
    assert_eq!(opened.total_size, 1000);
    assert!(opened.range.is_none());
    assert_eq!(opened.content_length(), 1000);
    assert_eq!(collect(opened.stream).await.len(), 1000);
}

/// S2. Range end past the object is clamped to the last byte
#[tokio::test]
async fn test_open_clamps_range() {
    let adapter = create_adapter(create_store());

    let range = parse_range_header("bytes=990-5000").unwrap();
    let opened = adapter.open("song.mp3", range).await.unwrap();

    let resolved = opened.range.unwrap();
    assert_eq!((resolved.start, resolved.end, resolved.total_size), (990, 999, 1000));
    assert_eq!(opened.content_length(), 10);
    let bytes = collect(opened.stream).await;
    assert_eq!(bytes, (990..1000u32).map(|i| (i % 256) as u8).collect::<Vec<u8>>());
}

/// S3. Unsatisfiable range fails before content is fetched
#[tokio::test]
async fn test_open_rejects_start_past_end() {
    let adapter = create_adapter(create_store());

    let range = parse_range_header("bytes=1000-").unwrap();
    let err = adapter.open("song.mp3", range).await.err().unwrap();

    assert!(matches!(err, BlobError::InvalidRange { .. }));
}

/// S4. Missing object is NotFound
#[tokio::test]
async fn test_open_missing_object() {
    let adapter = create_adapter(create_store());
    let err = adapter.open("nope.mp3", None).await.err().unwrap();
    assert!(matches!(err, BlobError::NotFound { .. }));
}

/// U1. Issued URL round-trips through upload
#[tokio::test]
async fn test_upload_with_issued_url() {
    let store = create_store();
    let adapter = create_adapter(store.clone());

    let issued = adapter.upload_url_for("cover", MediaType::Image, NOW);
    assert_eq!(issued.expires_at, NOW + 600);

    let meta = meta_from_url(&issued.upload_url, "image/png", 4).unwrap();
    adapter.upload(&meta, body(b"\x89PNG"), NOW + 1).await.unwrap();

    assert_eq!(store.get_bytes("cover").unwrap(), Bytes::from_static(b"\x89PNG"));
    assert_eq!(store.stat("cover").await.unwrap().content_type, "image/png");
}

/// U2. Expired URL never reaches the store
#[tokio::test]
async fn test_upload_expired() {
    let store = create_store();
    let adapter = create_adapter(store.clone());

    let issued = adapter.upload_url_for("cover", MediaType::Image, NOW);
    let meta = meta_from_url(&issued.upload_url, "image/png", 4).unwrap();
    let err = adapter.upload(&meta, body(b"abcd"), issued.expires_at).await.unwrap_err();

    assert!(matches!(err, BlobError::UrlExpired { .. }));
    assert_eq!(store.put_count(), 0);
}

/// U3. Tampered type is rejected as InvalidHash
#[tokio::test]
async fn test_upload_tampered_type() {
    let store = create_store();
    let adapter = create_adapter(store.clone());

    let issued = adapter.upload_url_for("cover", MediaType::Image, NOW);
    let forged = issued.upload_url.replace("type=image", "type=archive");
    let meta = meta_from_url(&forged, "application/zip", 500).unwrap();
    let err = adapter.upload(&meta, body(b"zip"), NOW).await.unwrap_err();

    assert!(matches!(err, BlobError::InvalidHash));
    assert_eq!(store.put_count(), 0);
}

/// U4. Oversized body is rejected after a valid signature
#[tokio::test]
async fn test_upload_size_exceeded() {
    let store = create_store();
    let adapter = create_adapter(store.clone());

    let issued = adapter.upload_url_for("cover", MediaType::Image, NOW);
    let meta = meta_from_url(&issued.upload_url, "image/png", 9).unwrap();
    let err = adapter.upload(&meta, body(b"123456789"), NOW).await.unwrap_err();

    assert!(matches!(err, BlobError::SizeExceeded { size: 9, limit: 8, .. }));
    assert_eq!(store.put_count(), 0);
}

/// U5. Three distinct slots are minted for a new beat
#[tokio::test]
async fn test_issue_upload_urls() {
    let adapter = create_adapter(create_store());

    let urls = adapter.issue_upload_urls(NOW);

    assert_eq!(urls.file.media_type, MediaType::File);
    assert_eq!(urls.image.media_type, MediaType::Image);
    assert_eq!(urls.archive.media_type, MediaType::Archive);
    assert_ne!(urls.file.name, urls.image.name);
    assert_ne!(urls.image.name, urls.archive.name);
    assert!(urls.archive.upload_url.contains("type=archive"));
}

/// P1. Presigned download URLs come from the store with the configured TTL
#[tokio::test]
async fn test_presigned_urls() {
    let adapter = create_adapter(create_store());

    let get = adapter.download_url("song.mp3").await.unwrap();
    assert!(get.contains("op=get"));
    assert!(get.contains("expires_in=600"));

    let pending = adapter.download_url("not-yet-uploaded.zip").await.unwrap();
    assert!(pending.starts_with("memory://not-yet-uploaded.zip"));
}
