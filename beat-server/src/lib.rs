//! beat-server: wires S3, Redis and the beat catalog into the HTTP app.

pub mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use beat_axum::{beat_app, BeatApp, BeatState};
use beat_blob::{MediaAdapter, MediaConfig, MediaUrlSigner, S3ObjectStore};
use beat_core::MemoryBeatRepository;
use beat_feed::{FeedSelector, RedisHistoryStore};
use tracing::{info, warn};

use crate::config::Settings;

/// Connect every backend and build the router.
pub async fn build(settings: &Settings) -> Result<BeatApp> {
    let store = S3ObjectStore::connect(settings.s3.clone())
        .await
        .context("connecting to object storage")?;
    let signer = MediaUrlSigner::new(&settings.secret)?;
    let media_config = MediaConfig::default()
        .with_url_ttl(settings.url_ttl)
        .with_chunk_size(settings.chunk_size)
        .with_limits(settings.limits);
    let media = MediaAdapter::new(store, signer, media_config);

    let history = RedisHistoryStore::connect(&settings.redis_url)
        .await
        .context("connecting to redis")?
        .with_retry_budget(settings.history_retries);

    let beats = Arc::new(load_catalog(settings).await?);
    let feed = FeedSelector::new(Arc::new(history), beats.clone()).with_max_history(settings.history_length);

    Ok(beat_app(BeatState::new(media, beats, feed)))
}

async fn load_catalog(settings: &Settings) -> Result<MemoryBeatRepository> {
    let Some(path) = &settings.catalog_path else {
        warn!("no beat catalog configured, starting with an empty one");
        return Ok(MemoryBeatRepository::new());
    };

    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading beat catalog {}", path.display()))?;
    let repo = MemoryBeatRepository::from_json(&raw)
        .with_context(|| format!("parsing beat catalog {}", path.display()))?;
    info!(beats = repo.len(), path = %path.display(), "beat catalog loaded");
    Ok(repo)
}
