//! Signed upload URLs.
//!
//! An upload URL commits to the object name, media type and expiry:
//!
//! ```text
//! /v1/beat?name=<name>&type=<file|archive|image>&exp=<unix seconds>&hash=<sig>
//! ```
//!
//! `sig` is HMAC-SHA256 over everything before `&hash=`, base64url without
//! padding. Verification rebuilds the URL from the request's own parameters
//! and compares it to the received URL byte for byte, so reordered or extra
//! parameters are rejected too.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::{BlobError, BlobResult, MediaMeta, MediaType};

type HmacSha256 = Hmac<Sha256>;

/// Path upload URLs are issued for.
pub const DEFAULT_BASE_PATH: &str = "/v1/beat";

/// An issued upload URL, kept as its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedMediaUrl {
    pub base_path: String,
    pub name: String,
    pub media_type: MediaType,
    pub expiry: i64,
    pub signature: String,
}

impl SignedMediaUrl {
    /// The signed portion: `<base>?name=..&type=..&exp=..`
    pub fn canonical(&self) -> String {
        canonical(&self.base_path, &self.name, self.media_type, self.expiry)
    }

    pub fn to_url(&self) -> String {
        format!("{}&hash={}", self.canonical(), self.signature)
    }
}

impl fmt::Display for SignedMediaUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_url())
    }
}

fn canonical(base_path: &str, name: &str, media_type: MediaType, expiry: i64) -> String {
    format!("{base_path}?name={name}&type={media_type}&exp={expiry}")
}

#[derive(Clone)]
pub struct MediaUrlSigner {
    mac: HmacSha256,
    base_path: String,
}

impl fmt::Debug for MediaUrlSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaUrlSigner")
            .field("secret", &"<redacted>")
            .field("base_path", &self.base_path)
            .finish()
    }
}

impl MediaUrlSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> BlobResult<Self> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(BlobError::invalid("verification secret must not be empty"));
        }
        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|_| BlobError::invalid("verification secret rejected by HMAC"))?;
        Ok(Self {
            mac,
            base_path: DEFAULT_BASE_PATH.to_string(),
        })
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Sign an upload URL for `name`. Deterministic for equal inputs.
    pub fn build(&self, name: &str, media_type: MediaType, expiry: i64) -> SignedMediaUrl {
        let signature = self.sign(&canonical(&self.base_path, name, media_type, expiry));
        SignedMediaUrl {
            base_path: self.base_path.clone(),
            name: name.to_string(),
            media_type,
            expiry,
            signature,
        }
    }

    /// Check an upload request against the URL it arrived on.
    ///
    /// Expiry is checked first: a URL is accepted only while `expiry > now`.
    pub fn verify(&self, received_url: &str, meta: &MediaMeta, now: i64) -> BlobResult<()> {
        if meta.expiry <= now {
            debug!(name = %meta.name, expiry = meta.expiry, now, "upload url expired");
            return Err(BlobError::UrlExpired {
                expiry: meta.expiry,
                now,
            });
        }

        let expected = self.build(&meta.name, meta.media_type, meta.expiry).to_url();
        let matches: bool = expected.as_bytes().ct_eq(received_url.as_bytes()).into();
        if !matches {
            debug!(name = %meta.name, "upload url signature mismatch");
            return Err(BlobError::InvalidHash);
        }
        Ok(())
    }

    fn sign(&self, canonical: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(canonical.as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }
}
