use std::collections::HashMap;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use beat_core::{Beat, FeedFilter};
use serde::Serialize;
use tracing::{instrument, warn};

use crate::params::{map_query_rejection, UserId};
use crate::{BeatAxumError, BeatState};

/// A feed entry: the beat plus a short-lived cover image link.
#[derive(Debug, Serialize)]
pub struct FeedItem {
    #[serde(flatten)]
    pub beat: Beat,
    pub image_url: Option<String>,
}

/// `GET /v1/beat/feed?genres=&moods=&tags=&note=&bpm=`
#[instrument(skip(state, user, query), fields(user = %user.0))]
pub async fn next_beat(
    State(state): State<BeatState>,
    user: UserId,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<Json<FeedItem>, BeatAxumError> {
    let Query(query) = query.map_err(map_query_rejection)?;
    let filter = FeedFilter::from_query(&query)?;

    let beat = state.feed.select(&user.0, &filter).await?;

    // A missing cover should not cost the user their beat.
    let image_url = if beat.is_image_downloaded {
        match state.media.download_url(&beat.image_path).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(error = %e, beat_id = %beat.id, "could not presign cover image");
                None
            }
        }
    } else {
        None
    };

    Ok(Json(FeedItem { beat, image_url }))
}
