// src/store/memory.rs
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tracing::trace;

use super::{stream_key, EventStore};
use crate::engagement::{EngagementEvent, EngagementKind};
use crate::error::TrendingError;

/// Time-ordered `(actor, timestamp)` set for one `(post, kind)` pair.
#[derive(Debug, Default)]
pub struct EventStream {
    /// timestamp -> actors that engaged at exactly that instant
    by_ts: BTreeMap<i64, BTreeSet<String>>,
    len: usize,
}

impl EventStream {
    pub fn insert(&mut self, actor_id: &str, timestamp_ms: i64) -> bool {
        let inserted = self
            .by_ts
            .entry(timestamp_ms)
            .or_default()
            .insert(actor_id.to_string());
        if inserted {
            self.len += 1;
        }
        inserted
    }

    pub fn remove(&mut self, actor_id: &str, timestamp_ms: i64) -> bool {
        let Some(actors) = self.by_ts.get_mut(&timestamp_ms) else {
            return false;
        };
        let removed = actors.remove(actor_id);
        if actors.is_empty() {
            self.by_ts.remove(&timestamp_ms);
        }
        if removed {
            self.len -= 1;
        }
        removed
    }

    /// Drop every member with `timestamp < cutoff_ms`. Returns how many were dropped.
    pub fn prune_older_than(&mut self, cutoff_ms: i64) -> usize {
        let kept = self.by_ts.split_off(&cutoff_ms);
        let dropped: usize = self.by_ts.values().map(BTreeSet::len).sum();
        self.by_ts = kept;
        self.len -= dropped;
        dropped
    }

    /// Inclusive on both ends.
    pub fn count_between(&self, start_ms: i64, end_ms: i64) -> u64 {
        if start_ms > end_ms {
            return 0;
        }
        self.by_ts
            .range(start_ms..=end_ms)
            .map(|(_, actors)| actors.len() as u64)
            .sum()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

type SharedStream = Arc<Mutex<EventStream>>;

/// In-process store. The outer map lock is only held to find or create a stream;
/// mutations of one stream serialize on that stream's own mutex.
#[derive(Debug)]
pub struct MemoryEventStore {
    window_ms: i64,
    streams: RwLock<HashMap<String, SharedStream>>,
}

impl MemoryEventStore {
    pub fn new(window: Duration) -> Self {
        Self {
            window_ms: window.as_millis() as i64,
            streams: RwLock::new(HashMap::new()),
        }
    }

    /// Convenience constructor for the standard 6h window.
    pub fn new_6h() -> Self {
        Self::new(Duration::from_secs(6 * 3600))
    }

    fn existing(&self, key: &str) -> Option<SharedStream> {
        self.streams.read().get(key).cloned()
    }

    fn stream_or_insert(&self, key: &str) -> SharedStream {
        if let Some(s) = self.existing(key) {
            return s;
        }
        self.streams
            .write()
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    /// Number of live streams (diagnostics).
    pub fn stream_count(&self) -> usize {
        self.streams.read().len()
    }

    /// Total members of one stream regardless of window.
    pub fn stream_len(&self, post_id: &str, kind: EngagementKind) -> usize {
        self.existing(&stream_key(kind, post_id))
            .map(|s| s.lock().len())
            .unwrap_or(0)
    }

    /// Prune each stream under its own lock; returns keys that ended up empty.
    fn prune_streams(&self, streams: Vec<(String, SharedStream)>, now_ms: i64) -> Vec<String> {
        let cutoff = now_ms.saturating_sub(self.window_ms);
        streams
            .into_iter()
            .filter_map(|(key, stream)| {
                let mut s = stream.lock();
                s.prune_older_than(cutoff);
                s.is_empty().then_some(key)
            })
            .collect()
    }

    /// Remove streams that are still empty and unreferenced. Holding the map
    /// write lock means nobody can pick up a new handle; a strong count of 1
    /// means nobody holds an old one either.
    fn drop_if_idle(&self, keys: &[String]) -> usize {
        if keys.is_empty() {
            return 0;
        }
        let mut map = self.streams.write();
        let mut dropped = 0;
        for key in keys {
            let idle = map
                .get(key)
                .is_some_and(|s| Arc::strong_count(s) == 1 && s.lock().is_empty());
            if idle {
                map.remove(key);
                dropped += 1;
            }
        }
        trace!(dropped, "streams compacted");
        dropped
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn record_event(&self, event: &EngagementEvent, now_ms: i64) -> Result<(), TrendingError> {
        let key = stream_key(event.kind, &event.post_id);
        let stream = self.stream_or_insert(&key);
        let mut s = stream.lock();
        let inserted = s.insert(&event.actor_id, event.timestamp_ms);
        let pruned = s.prune_older_than(now_ms.saturating_sub(self.window_ms));
        trace!(key = %key, inserted, pruned, len = s.len(), "stream write");
        Ok(())
    }

    async fn remove_event(
        &self,
        post_id: &str,
        kind: EngagementKind,
        actor_id: &str,
        timestamp_ms: i64,
    ) -> Result<bool, TrendingError> {
        let Some(stream) = self.existing(&stream_key(kind, post_id)) else {
            return Ok(false);
        };
        let removed = stream.lock().remove(actor_id, timestamp_ms);
        Ok(removed)
    }

    async fn count_in_window(
        &self,
        post_id: &str,
        kind: EngagementKind,
        window_start_ms: i64,
        window_end_ms: i64,
    ) -> Result<u64, TrendingError> {
        Ok(self
            .existing(&stream_key(kind, post_id))
            .map(|s| s.lock().count_between(window_start_ms, window_end_ms))
            .unwrap_or(0))
    }

    async fn compact(&self, now_ms: i64) -> Result<usize, TrendingError> {
        let snapshot: Vec<(String, SharedStream)> = self
            .streams
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), Arc::clone(v)))
            .collect();
        let emptied = self.prune_streams(snapshot, now_ms);
        Ok(self.drop_if_idle(&emptied))
    }

    async fn compact_posts(&self, post_ids: &[String], now_ms: i64) -> Result<usize, TrendingError> {
        let touched: Vec<(String, SharedStream)> = post_ids
            .iter()
            .flat_map(|post_id| EngagementKind::ALL.map(|kind| stream_key(kind, post_id)))
            .filter_map(|key| self.existing(&key).map(|s| (key, s)))
            .collect();
        let emptied = self.prune_streams(touched, now_ms);
        Ok(self.drop_if_idle(&emptied))
    }
}
