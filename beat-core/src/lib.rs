//! beat-core: transport-agnostic core for Beatflow media delivery.
//!
//! Holds the structured error type every other crate converts into, the
//! key/value configuration store, the beat catalog model with its feed
//! filter, and the [`BeatRepository`] capability.

pub mod beat;
pub mod config;
pub mod errors;
pub mod repository;

pub use beat::{Beat, BeatNote, FeedFilter, Scale, BPM_WINDOW};
pub use config::{BeatConfig, ConfigSnapshot};
pub use errors::{BeatError, BeatResult, ErrorKind};
pub use repository::{BeatRepository, MemoryBeatRepository, RepositoryError, RepositoryResult};
