use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::debug;

use super::{check_max_history, retry_optimistic, Attempt, SeenHistoryStore, DEFAULT_RETRY_BUDGET};
use crate::FeedResult;

/// Redis history store using a list per user and WATCH/MULTI/EXEC for pushes.
///
/// Reads and clears go through a shared [`ConnectionManager`]. WATCH is
/// connection state, so every push opens its own connection.
#[derive(Clone)]
pub struct RedisHistoryStore {
    client: Client,
    conn: ConnectionManager,
    key_prefix: String,
    retry_budget: u32,
}

impl RedisHistoryStore {
    pub async fn connect(redis_url: &str) -> FeedResult<Self> {
        let client = Client::open(redis_url)?;
        let conn = ConnectionManager::new(client.clone()).await?;
        Ok(Self {
            client,
            conn,
            key_prefix: "feed:seen:".to_string(),
            retry_budget: DEFAULT_RETRY_BUDGET,
        })
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_retry_budget(mut self, budget: u32) -> Self {
        self.retry_budget = budget;
        self
    }

    fn key(&self, user_id: &str) -> String {
        format!("{}{}", self.key_prefix, user_id)
    }

    async fn try_push(&self, key: &str, item: &str, max_history: usize) -> FeedResult<Attempt> {
        let mut con = self.client.get_multiplexed_async_connection().await?;

        let _: () = redis::cmd("WATCH").arg(key).query_async(&mut con).await?;
        let len: usize = con.llen(key).await?;

        let mut pipe = redis::pipe();
        pipe.atomic();
        if len >= max_history {
            if max_history == 1 {
                pipe.del(key).ignore();
            } else {
                pipe.ltrim(key, 0, max_history as isize - 2).ignore();
            }
        }
        pipe.lpush(key, item).ignore();

        // EXEC replies nil when the watched key changed.
        let committed: Option<()> = pipe.query_async(&mut con).await?;
        Ok(match committed {
            Some(()) => Attempt::Committed,
            None => {
                debug!(key, "history push lost a WATCH race");
                Attempt::Conflict
            }
        })
    }
}

#[async_trait]
impl SeenHistoryStore for RedisHistoryStore {
    async fn get(&self, user_id: &str) -> FeedResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let items: Vec<String> = conn.lrange(self.key(user_id), 0, -1).await?;
        Ok(items)
    }

    async fn push_with_eviction(&self, user_id: &str, item: &str, max_history: usize) -> FeedResult<()> {
        check_max_history(max_history)?;
        let key = self.key(user_id);
        retry_optimistic(self.retry_budget, |_| self.try_push(&key, item, max_history)).await
    }

    async fn clear(&self, user_id: &str) -> FeedResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(self.key(user_id)).await?;
        Ok(())
    }
}
