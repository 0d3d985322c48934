// src/store/mod.rs
//! Event store: per `(post, kind)` time-ordered engagement streams.
//!
//! Two backends share one contract:
//! - [`memory::MemoryEventStore`] keeps streams in-process behind per-key locks.
//! - [`redis_store::RedisEventStore`] keeps each stream in a Redis sorted set scored by timestamp.
//!
//! Writes prune members older than `now - window` from the touched stream, so a
//! stream never holds much more than one window of events.

pub mod memory;
pub mod redis_store;

use async_trait::async_trait;

use crate::engagement::{EngagementEvent, EngagementKind};
use crate::error::TrendingError;

pub use memory::{EventStream, MemoryEventStore};
pub use redis_store::RedisEventStore;

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Backend label for logs.
    fn name(&self) -> &'static str;

    /// Insert `(actor, timestamp)` into the event's stream; re-adding is a no-op.
    /// Also drops members of that stream older than `now_ms - window`.
    async fn record_event(&self, event: &EngagementEvent, now_ms: i64) -> Result<(), TrendingError>;

    /// Delete the exact `(actor, timestamp)` member. Returns `false` when it was not there.
    async fn remove_event(
        &self,
        post_id: &str,
        kind: EngagementKind,
        actor_id: &str,
        timestamp_ms: i64,
    ) -> Result<bool, TrendingError>;

    /// Number of members with `window_start_ms <= timestamp <= window_end_ms`.
    async fn count_in_window(
        &self,
        post_id: &str,
        kind: EngagementKind,
        window_start_ms: i64,
        window_end_ms: i64,
    ) -> Result<u64, TrendingError>;

    /// Sweep expired members out of every stream, including ones nobody has
    /// written to lately. Returns how many streams were dropped.
    async fn compact(&self, _now_ms: i64) -> Result<usize, TrendingError> {
        Ok(0)
    }

    /// Same as [`EventStore::compact`], limited to the streams of `post_ids`.
    async fn compact_posts(&self, _post_ids: &[String], _now_ms: i64) -> Result<usize, TrendingError> {
        Ok(0)
    }
}

/// Key addressing one engagement stream, e.g. `trending:likes:<post_id>`.
pub fn stream_key(kind: EngagementKind, post_id: &str) -> String {
    format!("trending:{}:{}", kind.as_str(), post_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_key_layout() {
        assert_eq!(stream_key(EngagementKind::Likes, "p1"), "trending:likes:p1");
        assert_eq!(
            stream_key(EngagementKind::Comments, "abc"),
            "trending:comments:abc"
        );
    }
}
