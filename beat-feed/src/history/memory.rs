use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{check_max_history, retry_optimistic, Attempt, SeenHistoryStore, DEFAULT_RETRY_BUDGET};
use crate::FeedResult;

/// A history list plus the version it was last written at.
#[derive(Debug, Clone, Default)]
struct VersionedList {
    version: u64,
    items: VecDeque<String>,
}

/// In-memory history with compare-and-swap on a per-user version counter.
///
/// Each push reads a snapshot, builds the new list without holding the lock,
/// and commits only if the version is unchanged.
#[derive(Clone)]
pub struct MemoryHistoryStore {
    lists: Arc<RwLock<HashMap<String, VersionedList>>>,
    retry_budget: u32,
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self {
            lists: Arc::new(RwLock::new(HashMap::new())),
            retry_budget: DEFAULT_RETRY_BUDGET,
        }
    }

    pub fn with_retry_budget(mut self, budget: u32) -> Self {
        self.retry_budget = budget;
        self
    }

    fn snapshot(&self, user_id: &str) -> VersionedList {
        self.lists.read().get(user_id).cloned().unwrap_or_default()
    }

    fn compare_and_swap(&self, user_id: &str, expected: u64, items: VecDeque<String>) -> Attempt {
        let mut lists = self.lists.write();
        let current = lists.entry(user_id.to_string()).or_default();
        if current.version != expected {
            return Attempt::Conflict;
        }
        current.version += 1;
        current.items = items;
        Attempt::Committed
    }
}

#[async_trait]
impl SeenHistoryStore for MemoryHistoryStore {
    async fn get(&self, user_id: &str) -> FeedResult<Vec<String>> {
        Ok(self.snapshot(user_id).items.into_iter().collect())
    }

    async fn push_with_eviction(&self, user_id: &str, item: &str, max_history: usize) -> FeedResult<()> {
        check_max_history(max_history)?;

        retry_optimistic(self.retry_budget, |_| {
            let VersionedList { version, mut items } = self.snapshot(user_id);
            while items.len() >= max_history {
                items.pop_back();
            }
            items.push_front(item.to_string());
            let outcome = self.compare_and_swap(user_id, version, items);
            async move { Ok(outcome) }
        })
        .await
    }

    async fn clear(&self, user_id: &str) -> FeedResult<()> {
        let mut lists = self.lists.write();
        if let Some(list) = lists.get_mut(user_id) {
            // Bump the version so in-flight pushes built on the old list retry.
            list.version += 1;
            list.items.clear();
        }
        Ok(())
    }
}
