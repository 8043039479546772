use axum::extract::rejection::QueryRejection;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use beat_core::errors::{BeatError, BeatResult};
use beat_core::bail_beat;
use serde_json::json;
use uuid::Uuid;

use crate::BeatAxumError;

/// Header carrying the authenticated user id, set by the gateway.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Caller identity for per-user endpoints. Rejects with 401 when absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = BeatAxumError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(UserId(user_from_headers(&parts.headers)?))
    }
}

fn user_from_headers(headers: &HeaderMap) -> BeatResult<String> {
    match headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        Some(user) => Ok(user.to_string()),
        None => bail_beat!(not_authenticated, "missing {} header", USER_ID_HEADER),
    }
}

pub(crate) fn parse_beat_id(raw: &str) -> BeatResult<Uuid> {
    match Uuid::parse_str(raw) {
        Ok(id) => Ok(id),
        Err(_) => bail_beat!(bad_request, "invalid beat id `{}`", raw),
    }
}

/// Declared upload size from `Content-Length`.
pub(crate) fn declared_length(headers: &HeaderMap) -> BeatResult<i64> {
    let Some(value) = headers.get(header::CONTENT_LENGTH) else {
        bail_beat!(length_required, "Content-Length is required");
    };
    match value.to_str().ok().and_then(|v| v.trim().parse::<i64>().ok()) {
        Some(len) if len >= 0 => Ok(len),
        _ => bail_beat!(bad_request, "invalid Content-Length"),
    }
}

pub(crate) fn map_query_rejection(rejection: QueryRejection) -> BeatAxumError {
    BeatError::bad_request("Failed to parse the query string")
        .with_errors(json!({"_query": [rejection.body_text()]}))
        .into()
}
