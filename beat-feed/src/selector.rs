use std::sync::Arc;

use beat_core::{Beat, BeatRepository, FeedFilter};
use tracing::{debug, info};

use crate::history::SeenHistoryStore;
use crate::{FeedError, FeedResult};

/// Default number of recently served beats a user will not see again.
pub const DEFAULT_HISTORY_LENGTH: usize = 50;

/// Picks the next beat for a user, avoiding what they were recently served.
///
/// When every matching beat is already in the history, the history is
/// cleared and the pick is retried once with no exclusions.
#[derive(Clone)]
pub struct FeedSelector {
    history: Arc<dyn SeenHistoryStore>,
    beats: Arc<dyn BeatRepository>,
    max_history: usize,
}

impl FeedSelector {
    pub fn new(history: Arc<dyn SeenHistoryStore>, beats: Arc<dyn BeatRepository>) -> Self {
        Self {
            history,
            beats,
            max_history: DEFAULT_HISTORY_LENGTH,
        }
    }

    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    pub fn history(&self) -> &Arc<dyn SeenHistoryStore> {
        &self.history
    }

    pub async fn select(&self, user_id: &str, filter: &FeedFilter) -> FeedResult<Beat> {
        if user_id.is_empty() {
            return Err(FeedError::Invalid("user id is required".to_string()));
        }

        let seen = self.history.get(user_id).await?;
        let beat = match self.beats.find_matching(filter, &seen).await {
            Ok(beat) => beat,
            Err(err) if err.is_not_found() => {
                info!(user_id, seen = seen.len(), "feed exhausted, resetting history");
                self.history.clear(user_id).await?;
                self.beats.find_matching(filter, &[]).await?
            }
            Err(err) => return Err(err.into()),
        };

        self.history
            .push_with_eviction(user_id, &beat.id_string(), self.max_history)
            .await?;
        debug!(user_id, beat_id = %beat.id, "served feed beat");
        Ok(beat)
    }
}
