pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

use std::future::Future;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{FeedError, FeedResult};

/// Conflicting attempts tolerated by a bounded history push.
pub const DEFAULT_RETRY_BUDGET: u32 = 7;

/// Per-user list of recently served beat ids, newest first.
#[async_trait]
pub trait SeenHistoryStore: Send + Sync {
    /// Full history, head = most recent. Unknown users have an empty history.
    async fn get(&self, user_id: &str) -> FeedResult<Vec<String>>;

    /// Prepend `item`, evicting the oldest entries so the list holds at most
    /// `max_history` ids. Atomic with respect to concurrent pushes for the
    /// same user; gives up with `RetriesExceeded` under sustained contention.
    async fn push_with_eviction(&self, user_id: &str, item: &str, max_history: usize) -> FeedResult<()>;

    /// Drop the whole history. Idempotent.
    async fn clear(&self, user_id: &str) -> FeedResult<()>;
}

/// Result of one optimistic attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Committed,
    /// The watched value changed between read and write
    Conflict,
}

/// Run `attempt` until it commits, at most `budget` times.
///
/// Errors from an attempt abort immediately; only conflicts are retried.
pub async fn retry_optimistic<F, Fut>(budget: u32, mut attempt: F) -> FeedResult<()>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = FeedResult<Attempt>>,
{
    for n in 1..=budget {
        match attempt(n).await? {
            Attempt::Committed => return Ok(()),
            Attempt::Conflict => debug!(attempt = n, "optimistic update conflicted"),
        }
    }
    warn!(budget, "optimistic update exhausted its retry budget");
    Err(FeedError::RetriesExceeded { attempts: budget })
}

pub(crate) fn check_max_history(max_history: usize) -> FeedResult<()> {
    if max_history == 0 {
        return Err(FeedError::Invalid("max history must be at least 1".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn gives_up_after_budget_conflicts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result = retry_optimistic(DEFAULT_RETRY_BUDGET, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(Attempt::Conflict) }
        })
        .await;

        assert!(matches!(result, Err(FeedError::RetriesExceeded { attempts: 7 })));
        assert_eq!(calls.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn commits_on_a_late_attempt() {
        let result = retry_optimistic(DEFAULT_RETRY_BUDGET, |n| async move {
            Ok(if n == 7 { Attempt::Committed } else { Attempt::Conflict })
        })
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result = retry_optimistic(DEFAULT_RETRY_BUDGET, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(FeedError::Backend("connection reset".into())) }
        })
        .await;

        assert!(matches!(result, Err(FeedError::Backend(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
