use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use beat_blob::BlobError;
use beat_core::errors::BeatError;
use beat_feed::FeedError;
use tracing::error;

#[derive(Debug)]
pub struct BeatAxumError(pub anyhow::Error);

impl From<anyhow::Error> for BeatAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<BeatError> for BeatAxumError {
    fn from(e: BeatError) -> Self {
        Self(e.into_anyhow())
    }
}

impl From<BlobError> for BeatAxumError {
    fn from(e: BlobError) -> Self {
        BeatError::from(e).into()
    }
}

impl From<FeedError> for BeatAxumError {
    fn from(e: FeedError) -> Self {
        BeatError::from(e).into()
    }
}

impl IntoResponse for BeatAxumError {
    fn into_response(self) -> Response {
        // Look through anyhow contexts for a structured error first.
        let fallback;
        let beat = match self.0.chain().find_map(|e| e.downcast_ref::<BeatError>()) {
            Some(beat) => beat,
            None => {
                fallback = BeatError::general_error(self.0.to_string());
                &fallback
            }
        };

        if beat.kind.is_internal() {
            error!(error = ?self.0, "request failed");
        }

        let safe = beat.sanitize_for_client();
        let status = StatusCode::from_u16(safe.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(safe.to_json())).into_response()
    }
}
