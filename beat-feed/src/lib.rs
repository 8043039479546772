//! # beat-feed
//!
//! Serves each user a random beat they have not seen recently.
//!
//! A [`SeenHistoryStore`] keeps a bounded, newest-first list of served beat
//! ids per user. Pushes are optimistic: read, build, commit-if-unchanged,
//! retried up to [`DEFAULT_RETRY_BUDGET`] times. [`FeedSelector`] combines the
//! history with a [`beat_core::BeatRepository`].
//!
//! ```rust
//! use std::sync::Arc;
//! use beat_core::{FeedFilter, MemoryBeatRepository};
//! use beat_feed::{FeedSelector, MemoryHistoryStore};
//!
//! # async fn demo(beats: MemoryBeatRepository) -> beat_feed::FeedResult<()> {
//! let selector = FeedSelector::new(Arc::new(MemoryHistoryStore::new()), Arc::new(beats))
//!     .with_max_history(50);
//! let beat = selector.select("user-1", &FeedFilter::default()).await?;
//! println!("next up: {}", beat.name);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod history;
pub mod selector;

pub use error::{FeedError, FeedResult};
pub use history::memory::MemoryHistoryStore;
pub use history::{retry_optimistic, Attempt, SeenHistoryStore, DEFAULT_RETRY_BUDGET};
pub use selector::{FeedSelector, DEFAULT_HISTORY_LENGTH};

#[cfg(feature = "redis")]
pub use history::redis::RedisHistoryStore;
