pub mod feed;
pub mod media;

use axum::routing::{get, post, put};
use axum::Router;

use crate::BeatState;

/// Routes mounted under `/v1/beat`.
pub fn beat_router(state: BeatState) -> Router<()> {
    Router::new()
        .route("/", put(media::upload_media))
        .route("/feed", get(feed::next_beat))
        .route("/upload-urls", post(media::issue_upload_urls))
        .route("/{id}/stream", get(media::stream_beat))
        .route("/{id}/archive", get(media::archive_url))
        .with_state(state)
}
