use std::collections::HashMap;
use std::io;

use axum::{
    body::Body,
    extract::{rejection::QueryRejection, OriginalUri, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    Json,
};
use beat_blob::{parse_optional_range, BlobError, ByteStream, MediaMeta, UploadUrls};
use beat_core::{bail_beat, Beat, BeatError, BeatResult};
use chrono::Utc;
use futures::TryStreamExt;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::params::{declared_length, map_query_rejection, parse_beat_id, UserId};
use crate::{BeatAxumError, BeatState};

async fn load_beat(state: &BeatState, raw_id: &str) -> Result<Beat, BeatAxumError> {
    let id = parse_beat_id(raw_id)?;
    let beat = state.beats.get_by_id(id).await.map_err(BeatError::from)?;
    Ok(beat)
}

fn require_uploaded(uploaded: bool, what: &str, beat: &Beat) -> BeatResult<()> {
    if !uploaded {
        bail_beat!(not_found, "{} for beat {} has not been uploaded", what, beat.id);
    }
    Ok(())
}

/// `GET /v1/beat/{id}/stream`
#[instrument(skip(state, headers))]
pub async fn stream_beat(
    State(state): State<BeatState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, BeatAxumError> {
    let beat = load_beat(&state, &id).await?;
    require_uploaded(beat.is_file_downloaded, "audio", &beat)?;

    let raw_range = match headers.get(header::RANGE) {
        Some(v) => Some(
            v.to_str()
                .map_err(|_| BlobError::invalid_range("range header is not valid ASCII"))?,
        ),
        None => None,
    };
    let range = parse_optional_range(raw_range)?;
    let opened = state.media.open(&beat.file_path, range).await?;

    let content_length = opened.content_length();
    let mut response = Response::builder()
        .header(header::CONTENT_TYPE, opened.content_type.as_str())
        .header(header::CONTENT_LENGTH, content_length)
        .header(header::ACCEPT_RANGES, "bytes");
    response = match opened.range {
        Some(resolved) => response
            .status(StatusCode::PARTIAL_CONTENT)
            .header(header::CONTENT_RANGE, resolved.content_range_header()),
        None => response.status(StatusCode::OK),
    };

    debug!(beat_id = %beat.id, content_length, partial = opened.range.is_some(), "streaming beat");
    let body = Body::from_stream(state.media.copier().spawn_pipe(opened.stream));
    response.body(body).map_err(|e| anyhow::Error::new(e).into())
}

/// `PUT /v1/beat?name=..&type=..&exp=..&hash=..`
#[instrument(skip_all)]
pub async fn upload_media(
    State(state): State<BeatState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
    body: Body,
) -> Result<Json<Value>, BeatAxumError> {
    let Query(query) = query.map_err(map_query_rejection)?;
    let content_length = declared_length(&headers)?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");
    let upload_url = uri.path_and_query().map_or_else(|| uri.path(), |pq| pq.as_str());

    let meta = MediaMeta::from_query(&query, content_type, content_length, upload_url)?;
    let stream: ByteStream = Box::pin(body.into_data_stream().map_err(io::Error::other));
    let stored = state.media.upload(&meta, stream, Utc::now().timestamp()).await?;

    Ok(Json(json!({
        "name": meta.name,
        "type": meta.media_type,
        "size": stored.size_bytes,
        "etag": stored.etag,
    })))
}

/// `POST /v1/beat/upload-urls`
pub async fn issue_upload_urls(State(state): State<BeatState>) -> Json<UploadUrls> {
    Json(state.media.issue_upload_urls(Utc::now().timestamp()))
}

/// The first caller to fetch an archive becomes its owner; everyone else is
/// turned away.
async fn acquire_archive(state: &BeatState, beat: &Beat, user: &str) -> Result<(), BeatAxumError> {
    let owner = match state.beats.owner_of(beat.id).await {
        Ok(owner) => owner,
        Err(err) if err.is_not_found() => state.beats.save_owner(beat.id, user).await.map_err(BeatError::from)?,
        Err(err) => return Err(BeatError::from(err).into()),
    };
    if owner != user {
        debug!(beat_id = %beat.id, user, owner = %owner, "archive acquired by another owner");
        return Err(BeatError::forbidden("beat acquired by another owner")
            .with_reason("InvalidOwner")
            .into());
    }
    Ok(())
}

/// `GET /v1/beat/{id}/archive`
#[instrument(skip(state))]
pub async fn archive_url(
    State(state): State<BeatState>,
    UserId(user): UserId,
    Path(id): Path<String>,
) -> Result<Json<Value>, BeatAxumError> {
    let beat = load_beat(&state, &id).await?;
    require_uploaded(beat.is_archive_downloaded, "archive", &beat)?;
    acquire_archive(&state, &beat, &user).await?;

    let url = state.media.download_url(&beat.archive_path).await?;
    Ok(Json(json!({ "url": url })))
}
