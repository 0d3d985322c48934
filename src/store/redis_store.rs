// src/store/redis_store.rs
//! Redis-backed streams.
//!
//! Layout: one sorted set per stream under [`stream_key`], member
//! `"{actor_id}:{timestamp_ms}"`, score = `timestamp_ms`. Members are therefore
//! unique per `(actor, instant)` and `ZCOUNT` over the score range is the
//! window count.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::{info, trace};

use super::{stream_key, EventStore};
use crate::engagement::{EngagementEvent, EngagementKind};
use crate::error::TrendingError;

#[derive(Clone)]
pub struct RedisEventStore {
    conn: ConnectionManager,
    window_ms: i64,
}

impl RedisEventStore {
    pub async fn connect(redis_url: &str, window: Duration) -> Result<Self> {
        let client = Client::open(redis_url).context("failed to construct Redis client")?;
        let conn = ConnectionManager::new(client)
            .await
            .context("failed to initialize Redis connection manager")?;
        info!(target: "trending", "redis event store connected");
        Ok(Self {
            conn,
            window_ms: window.as_millis() as i64,
        })
    }

    fn member(actor_id: &str, timestamp_ms: i64) -> String {
        format!("{actor_id}:{timestamp_ms}")
    }
}

#[async_trait]
impl EventStore for RedisEventStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn record_event(&self, event: &EngagementEvent, now_ms: i64) -> Result<(), TrendingError> {
        let key = stream_key(event.kind, &event.post_id);
        let cutoff = now_ms.saturating_sub(self.window_ms);
        let mut conn = self.conn.clone();

        // Insert, prune and TTL refresh in one MULTI/EXEC. A key idle for a whole
        // window holds nothing countable.
        let _: () = redis::pipe()
            .atomic()
            .zadd(
                &key,
                Self::member(&event.actor_id, event.timestamp_ms),
                event.timestamp_ms,
            )
            .ignore()
            .zrembyscore(&key, "-inf", format!("({cutoff}"))
            .ignore()
            .cmd("PEXPIRE")
            .arg(&key)
            .arg(self.window_ms)
            .ignore()
            .query_async(&mut conn)
            .await?;

        trace!(key = %key, "stream write");
        Ok(())
    }

    async fn remove_event(
        &self,
        post_id: &str,
        kind: EngagementKind,
        actor_id: &str,
        timestamp_ms: i64,
    ) -> Result<bool, TrendingError> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn
            .zrem(stream_key(kind, post_id), Self::member(actor_id, timestamp_ms))
            .await?;
        Ok(removed > 0)
    }

    async fn count_in_window(
        &self,
        post_id: &str,
        kind: EngagementKind,
        window_start_ms: i64,
        window_end_ms: i64,
    ) -> Result<u64, TrendingError> {
        if window_start_ms > window_end_ms {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        let n: u64 = conn
            .zcount(stream_key(kind, post_id), window_start_ms, window_end_ms)
            .await?;
        Ok(n)
    }
}
