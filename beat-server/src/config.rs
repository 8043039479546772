use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use beat_blob::{S3Settings, SizeLimits, DEFAULT_CHUNK_SIZE};
use beat_core::{BeatConfig, ConfigSnapshot};
use beat_feed::{DEFAULT_HISTORY_LENGTH, DEFAULT_RETRY_BUDGET};

const MIB: u64 = 1024 * 1024;

/// Environment variable → config key.
const ENV_KEYS: &[(&str, &str)] = &[
    ("HTTP_HOST", "http.host"),
    ("HTTP_PORT", "http.port"),
    ("VERIFICATION_SECRET", "media.secret"),
    ("URL_TTL_MINUTES", "media.url_ttl_minutes"),
    ("FILE_SIZE_LIMIT", "media.limit.file"),
    ("ARCHIVE_SIZE_LIMIT", "media.limit.archive"),
    ("IMAGE_SIZE_LIMIT", "media.limit.image"),
    ("STREAM_CHUNK_SIZE", "stream.chunk_size"),
    ("S3_ENDPOINT_URL", "s3.endpoint_url"),
    ("S3_REGION", "s3.region"),
    ("S3_ACCESS_KEY_ID", "s3.access_key_id"),
    ("S3_SECRET_ACCESS_KEY", "s3.secret_access_key"),
    ("S3_BUCKET", "s3.bucket"),
    ("REDIS_URL", "redis.url"),
    ("FEED_HISTORY_LENGTH", "feed.history_length"),
    ("FEED_HISTORY_RETRIES", "feed.history_retries"),
    ("BEAT_CATALOG_PATH", "catalog.path"),
];

/// Typed server settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub secret: String,
    pub url_ttl: Duration,
    pub limits: SizeLimits,
    pub chunk_size: usize,
    pub s3: S3Settings,
    pub redis_url: String,
    pub history_length: usize,
    pub history_retries: u32,
    pub catalog_path: Option<PathBuf>,
}

impl Settings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Load settings from the process environment. The binary loads `.env`
/// beforehand, so variables from that file are visible here too.
pub fn load() -> Result<Settings> {
    let mut config = BeatConfig::new();
    configure_from(&mut config, |name| env::var(name).ok());
    settings(&config.snapshot())
}

/// Copy every known variable `lookup` can resolve into `config`, then fill
/// in defaults for optional keys.
pub fn configure_from<F>(config: &mut BeatConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for (var, key) in ENV_KEYS {
        if let Some(value) = lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
            config.set(*key, value);
        }
    }

    config.set_default("http.host", "127.0.0.1");
    config.set_default("http.port", "8080");
    config.set_default("media.url_ttl_minutes", "15");
    config.set_default("media.limit.file", (50 * MIB).to_string());
    config.set_default("media.limit.archive", (500 * MIB).to_string());
    config.set_default("media.limit.image", (5 * MIB).to_string());
    config.set_default("stream.chunk_size", DEFAULT_CHUNK_SIZE.to_string());
    config.set_default("s3.region", "us-east-1");
    config.set_default("s3.bucket", "beats");
    config.set_default("redis.url", "redis://127.0.0.1/");
    config.set_default("feed.history_length", DEFAULT_HISTORY_LENGTH.to_string());
    config.set_default("feed.history_retries", DEFAULT_RETRY_BUDGET.to_string());
}

/// Build typed settings, failing on missing required keys or bad numbers.
pub fn settings(snapshot: &ConfigSnapshot) -> Result<Settings> {
    let history_length: usize = number(snapshot, "feed.history_length")?;
    if history_length == 0 {
        return Err(anyhow!("feed.history_length must be at least 1"));
    }

    Ok(Settings {
        host: required(snapshot, "http.host")?,
        port: number(snapshot, "http.port")?,
        secret: required(snapshot, "media.secret")?,
        url_ttl: Duration::from_secs(number::<u64>(snapshot, "media.url_ttl_minutes")? * 60),
        limits: SizeLimits {
            file: number(snapshot, "media.limit.file")?,
            archive: number(snapshot, "media.limit.archive")?,
            image: number(snapshot, "media.limit.image")?,
        },
        chunk_size: number(snapshot, "stream.chunk_size")?,
        s3: S3Settings {
            endpoint_url: Some(required(snapshot, "s3.endpoint_url")?),
            region: required(snapshot, "s3.region")?,
            access_key_id: required(snapshot, "s3.access_key_id")?,
            secret_access_key: required(snapshot, "s3.secret_access_key")?,
            bucket: required(snapshot, "s3.bucket")?,
        },
        redis_url: required(snapshot, "redis.url")?,
        history_length,
        history_retries: number(snapshot, "feed.history_retries")?,
        catalog_path: snapshot.get_string("catalog.path").map(PathBuf::from),
    })
}

fn required(snapshot: &ConfigSnapshot, key: &str) -> Result<String> {
    snapshot
        .get_string(key)
        .ok_or_else(|| anyhow!("missing required config `{key}`"))
}

fn number<T>(snapshot: &ConfigSnapshot, key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = required(snapshot, key)?;
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("config `{key}` must be a number, got `{raw}`"))
}
