//! # beat-blob: media delivery primitives
//!
//! Streaming, range-aware delivery of beat media and signed-URL uploads.
//!
//! ```text
//! ┌──────────────────┐
//! │   HTTP handler   │  ← transport only
//! ├──────────────────┤
//! │   MediaAdapter   │  ← range clamping, URL verification, size limits
//! ├──────────────────┤
//! │   ObjectStore    │  ← stat / get-range / put / presign
//! └──────────────────┘
//! ```
//!
//! ## Streaming a range
//!
//! ```rust
//! use beat_blob::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> BlobResult<()> {
//! let store = MemoryObjectStore::new();
//! store.insert("beat.mp3", "audio/mpeg", vec![0u8; 1000]);
//!
//! let signer = MediaUrlSigner::new("secret")?;
//! let media = MediaAdapter::new(store, signer, MediaConfig::default());
//!
//! let range = parse_range_header("bytes=100-")?;
//! let opened = media.open("beat.mp3", range).await?;
//! assert_eq!(opened.content_length(), 900);
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod config;
pub mod copier;
pub mod error;
pub mod guard;
pub mod memory_store;
pub mod range;
pub mod s3_store;
pub mod signer;
pub mod store;
pub mod types;

pub use adapter::{IssuedUpload, MediaAdapter, OpenedMedia, UploadUrls};
pub use config::MediaConfig;
pub use copier::{ChunkedCopier, CopyError, DEFAULT_CHUNK_SIZE};
pub use error::{BlobError, BlobResult};
pub use guard::SizeLimits;
pub use memory_store::MemoryObjectStore;
pub use range::{parse_optional_range, parse_range_header};
pub use s3_store::{S3ObjectStore, S3Settings};
pub use signer::{MediaUrlSigner, SignedMediaUrl, DEFAULT_BASE_PATH};
pub use store::ObjectStore;
pub use types::{ByteRange, ByteStream, MediaMeta, MediaType, ObjectHead, PutResult, ResolvedRange};

/// Convenient imports
pub mod prelude {
    pub use crate::{
        parse_range_header, BlobError, BlobResult, ByteRange, ByteStream, ChunkedCopier, MediaAdapter,
        MediaConfig, MediaMeta, MediaType, MediaUrlSigner, MemoryObjectStore, ObjectStore, SizeLimits,
    };
}
