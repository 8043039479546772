use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::beat::{Beat, FeedFilter};
use crate::errors::BeatError;

/// Result type for catalog lookups
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Errors raised by a [`BeatRepository`]
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Beat not found: {what}")]
    NotFound { what: String },

    #[error("Repository backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Catalog parse error: {source}")]
    Catalog {
        #[from]
        source: serde_json::Error,
    },
}

impl RepositoryError {
    pub fn not_found<S: Into<String>>(what: S) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<RepositoryError> for BeatError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { what } => {
                BeatError::not_found(format!("beat not found: {what}")).with_reason("NotFound")
            }
            other => BeatError::general_error(other.to_string())
                .with_reason("Internal")
                .with_source(anyhow::Error::new(other)),
        }
    }
}

/// Catalog capability used by the stream endpoint and the feed.
#[async_trait]
pub trait BeatRepository: Send + Sync {
    /// Look a beat up by id
    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Beat>;

    /// Pick one beat matching `filter` whose id is not in `exclude`,
    /// uniformly at random among the matches. `NotFound` when none match.
    async fn find_matching(&self, filter: &FeedFilter, exclude: &[String]) -> RepositoryResult<Beat>;

    /// User that acquired the beat's archive. `NotFound` while unclaimed.
    async fn owner_of(&self, beat_id: Uuid) -> RepositoryResult<String>;

    /// Record `user_id` as owner unless someone already is, and return
    /// whoever owns the beat afterwards.
    async fn save_owner(&self, beat_id: Uuid, user_id: &str) -> RepositoryResult<String>;
}

/// In-memory catalog for tests and single-node deployments
#[derive(Clone, Default)]
pub struct MemoryBeatRepository {
    beats: Arc<RwLock<HashMap<Uuid, Beat>>>,
    owners: Arc<RwLock<HashMap<Uuid, String>>>,
}

impl MemoryBeatRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_beats<I: IntoIterator<Item = Beat>>(beats: I) -> Self {
        let repo = Self::new();
        for beat in beats {
            repo.insert(beat);
        }
        repo
    }

    /// Load a catalog from a JSON array of beats.
    pub fn from_json(raw: &str) -> RepositoryResult<Self> {
        let beats: Vec<Beat> = serde_json::from_str(raw)?;
        Ok(Self::from_beats(beats))
    }

    pub fn insert(&self, beat: Beat) {
        self.beats.write().insert(beat.id, beat);
    }

    pub fn len(&self) -> usize {
        self.beats.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.beats.read().is_empty()
    }
}

#[async_trait]
impl BeatRepository for MemoryBeatRepository {
    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Beat> {
        self.beats
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(id.to_string()))
    }

    async fn find_matching(&self, filter: &FeedFilter, exclude: &[String]) -> RepositoryResult<Beat> {
        let candidates: Vec<Beat> = {
            let beats = self.beats.read();
            beats
                .values()
                .filter(|b| filter.matches(b))
                .filter(|b| {
                    let id = b.id_string();
                    !exclude.iter().any(|e| *e == id)
                })
                .cloned()
                .collect()
        };
        debug!(candidates = candidates.len(), excluded = exclude.len(), "feed candidates");

        candidates
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| RepositoryError::not_found("no beat matches the filter"))
    }

    async fn owner_of(&self, beat_id: Uuid) -> RepositoryResult<String> {
        self.owners
            .read()
            .get(&beat_id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("owner of {beat_id}")))
    }

    async fn save_owner(&self, beat_id: Uuid, user_id: &str) -> RepositoryResult<String> {
        let mut owners = self.owners.write();
        Ok(owners.entry(beat_id).or_insert_with(|| user_id.to_string()).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beat::fixtures::beat;
    use crate::errors::ErrorKind;

    #[tokio::test]
    async fn find_matching_respects_exclusions() {
        let a = beat("a", 120, &["trap"]);
        let b = beat("b", 120, &["trap"]);
        let repo = MemoryBeatRepository::from_beats([a.clone(), b.clone()]);

        let picked = repo
            .find_matching(&FeedFilter::default(), &[a.id_string()])
            .await
            .unwrap();
        assert_eq!(picked.id, b.id);

        let err = repo
            .find_matching(&FeedFilter::default(), &[a.id_string(), b.id_string()])
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn choice_covers_all_candidates() {
        let beats: Vec<Beat> = (0..3).map(|i| beat(&format!("b{i}"), 100, &[])).collect();
        let repo = MemoryBeatRepository::from_beats(beats.clone());

        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            let picked = repo.find_matching(&FeedFilter::default(), &[]).await.unwrap();
            seen.insert(picked.id);
        }
        assert_eq!(seen.len(), 3);
    }

    #[tokio::test]
    async fn get_by_id_reports_missing_beats() {
        let repo = MemoryBeatRepository::new();
        let err = repo.get_by_id(Uuid::new_v4()).await.unwrap_err();
        let beat_err: BeatError = err.into();
        assert_eq!(beat_err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn first_owner_wins() {
        let repo = MemoryBeatRepository::new();
        let id = Uuid::new_v4();

        assert!(repo.owner_of(id).await.unwrap_err().is_not_found());
        assert_eq!(repo.save_owner(id, "alice").await.unwrap(), "alice");
        assert_eq!(repo.save_owner(id, "bob").await.unwrap(), "alice");
        assert_eq!(repo.owner_of(id).await.unwrap(), "alice");
    }

    #[test]
    fn loads_json_catalog() {
        let raw = r#"[{
            "id": "8d1c0f5e-6a0f-4ab8-9b9c-0c6f7a3c2b11",
            "beatmaker_id": "2f0e3b1a-1b44-4c2e-8f0e-7c7b7b0c9a22",
            "name": "Night Drive",
            "bpm": 92,
            "genres": ["lofi"],
            "file_path": "3a2b.mp3",
            "is_file_downloaded": true
        }]"#;
        let repo = MemoryBeatRepository::from_json(raw).unwrap();
        assert_eq!(repo.len(), 1);

        assert!(matches!(
            MemoryBeatRepository::from_json("{"),
            Err(RepositoryError::Catalog { .. })
        ));
    }
}
