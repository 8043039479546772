use std::collections::HashSet;
use std::sync::Arc;

use beat_feed::{FeedError, MemoryHistoryStore, SeenHistoryStore};

/// H1. Newest item first
#[tokio::test]
async fn test_push_prepends() {
    let store = MemoryHistoryStore::new();

    store.push_with_eviction("u1", "a", 3).await.unwrap();
    store.push_with_eviction("u1", "b", 3).await.unwrap();

    assert_eq!(store.get("u1").await.unwrap(), vec!["b", "a"]);
}

/// H2. Oldest entries are evicted at the bound
#[tokio::test]
async fn test_push_evicts_oldest() {
    let store = MemoryHistoryStore::new();

    for item in ["a", "b", "c", "d", "e"] {
        store.push_with_eviction("u1", item, 3).await.unwrap();
    }

    assert_eq!(store.get("u1").await.unwrap(), vec!["e", "d", "c"]);
}

/// H3. A bound of one keeps only the latest push
#[tokio::test]
async fn test_bound_of_one() {
    let store = MemoryHistoryStore::new();

    store.push_with_eviction("u1", "a", 1).await.unwrap();
    store.push_with_eviction("u1", "b", 1).await.unwrap();

    assert_eq!(store.get("u1").await.unwrap(), vec!["b"]);
}

/// H4. A bound of zero is rejected without touching the list
#[tokio::test]
async fn test_zero_bound_is_invalid() {
    let store = MemoryHistoryStore::new();
    store.push_with_eviction("u1", "a", 2).await.unwrap();

    let err = store.push_with_eviction("u1", "b", 0).await.unwrap_err();

    assert!(matches!(err, FeedError::Invalid(_)));
    assert_eq!(store.get("u1").await.unwrap(), vec!["a"]);
}

/// H5. Histories are per user, clear is idempotent
#[tokio::test]
async fn test_clear_is_scoped_and_idempotent() {
    let store = MemoryHistoryStore::new();
    store.push_with_eviction("u1", "a", 5).await.unwrap();
    store.push_with_eviction("u2", "b", 5).await.unwrap();

    store.clear("u1").await.unwrap();
    store.clear("u1").await.unwrap();
    store.clear("nobody").await.unwrap();

    assert!(store.get("u1").await.unwrap().is_empty());
    assert_eq!(store.get("u2").await.unwrap(), vec!["b"]);
}

/// H6. Concurrent pushes never overflow the bound
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_pushes_respect_bound() {
    let store = Arc::new(MemoryHistoryStore::new().with_retry_budget(64));
    let mut handles = Vec::new();

    // Arrange: many writers on the same user
    for i in 0..32 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.push_with_eviction("u1", &format!("beat-{i}"), 10).await
        }));
    }

    // Act
    let mut committed = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            committed += 1;
        }
    }

    // Assert: bound holds and no id appears twice
    let history = store.get("u1").await.unwrap();
    assert!(committed > 0);
    assert_eq!(history.len(), committed.min(10));
    let unique: HashSet<_> = history.iter().collect();
    assert_eq!(unique.len(), history.len());
}
