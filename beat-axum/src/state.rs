use std::sync::Arc;

use beat_blob::MediaAdapter;
use beat_core::BeatRepository;
use beat_feed::FeedSelector;

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct BeatState {
    pub media: Arc<MediaAdapter>,
    pub beats: Arc<dyn BeatRepository>,
    pub feed: FeedSelector,
}

impl BeatState {
    pub fn new(media: MediaAdapter, beats: Arc<dyn BeatRepository>, feed: FeedSelector) -> Self {
        Self {
            media: Arc::new(media),
            beats,
            feed,
        }
    }
}
