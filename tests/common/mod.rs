// tests/common/mod.rs
//
// Event store wrappers shared by the engine and loop tests: one that fails on
// demand, one that parks a cycle mid-scoring until released.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use trending_ranker::{EngagementEvent, EngagementKind, EventStore, MemoryEventStore, TrendingError};

/// Reads fail for broken posts, or for every post while `down`.
pub struct FlakyStore {
    inner: MemoryEventStore,
    broken: Mutex<HashSet<String>>,
    down: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryEventStore::new_6h(),
            broken: Mutex::new(HashSet::new()),
            down: AtomicBool::new(false),
        }
    }

    pub fn with_broken(posts: &[&str]) -> Self {
        let store = Self::new();
        for p in posts {
            store.break_post(p);
        }
        store
    }

    pub fn break_post(&self, post_id: &str) {
        self.broken.lock().insert(post_id.to_string());
    }

    pub fn heal_post(&self, post_id: &str) {
        self.broken.lock().remove(post_id);
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn failing(&self, post_id: &str) -> bool {
        self.down.load(Ordering::SeqCst) || self.broken.lock().contains(post_id)
    }
}

#[async_trait]
impl EventStore for FlakyStore {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn record_event(&self, event: &EngagementEvent, now_ms: i64) -> Result<(), TrendingError> {
        self.inner.record_event(event, now_ms).await
    }

    async fn remove_event(
        &self,
        post_id: &str,
        kind: EngagementKind,
        actor_id: &str,
        timestamp_ms: i64,
    ) -> Result<bool, TrendingError> {
        self.inner
            .remove_event(post_id, kind, actor_id, timestamp_ms)
            .await
    }

    async fn count_in_window(
        &self,
        post_id: &str,
        kind: EngagementKind,
        window_start_ms: i64,
        window_end_ms: i64,
    ) -> Result<u64, TrendingError> {
        if self.failing(post_id) {
            return Err(TrendingError::StoreUnavailable("connection reset".into()));
        }
        self.inner
            .count_in_window(post_id, kind, window_start_ms, window_end_ms)
            .await
    }
}

/// Once armed, the next window count signals `entered` and waits for `release`.
pub struct GatedStore {
    inner: MemoryEventStore,
    armed: AtomicBool,
    pub entered: Notify,
    pub release: Notify,
}

impl GatedStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryEventStore::new_6h(),
            armed: AtomicBool::new(false),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventStore for GatedStore {
    fn name(&self) -> &'static str {
        "gated"
    }

    async fn record_event(&self, event: &EngagementEvent, now_ms: i64) -> Result<(), TrendingError> {
        self.inner.record_event(event, now_ms).await
    }

    async fn remove_event(
        &self,
        post_id: &str,
        kind: EngagementKind,
        actor_id: &str,
        timestamp_ms: i64,
    ) -> Result<bool, TrendingError> {
        self.inner
            .remove_event(post_id, kind, actor_id, timestamp_ms)
            .await
    }

    async fn count_in_window(
        &self,
        post_id: &str,
        kind: EngagementKind,
        window_start_ms: i64,
        window_end_ms: i64,
    ) -> Result<u64, TrendingError> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner
            .count_in_window(post_id, kind, window_start_ms, window_end_ms)
            .await
    }
}
