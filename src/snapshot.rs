//! # Ranking Snapshot
//! Immutable ranking published by the recompute cycle. Readers clone an `Arc`
//! to the current snapshot and never wait on scoring.

use std::cmp::Ordering;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPost {
    pub post_id: String,
    pub score: f64,
}

impl RankedPost {
    pub fn new(post_id: impl Into<String>, score: f64) -> Self {
        Self {
            post_id: post_id.into(),
            score,
        }
    }
}

/// Score descending, then post id ascending.
pub fn rank_order(a: &RankedPost, b: &RankedPost) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.post_id.cmp(&b.post_id))
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RankingSnapshot {
    /// `None` until the first cycle publishes.
    pub published_at_ms: Option<i64>,
    pub entries: Vec<RankedPost>,
}

impl RankingSnapshot {
    /// Build a snapshot from unordered entries.
    pub fn ranked(mut entries: Vec<RankedPost>, published_at_ms: i64) -> Self {
        entries.sort_by(rank_order);
        Self {
            published_at_ms: Some(published_at_ms),
            entries,
        }
    }

    /// First `n` entries, or all of them when shorter.
    pub fn top_n(&self, n: usize) -> &[RankedPost] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn score_of(&self, post_id: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.post_id == post_id)
            .map(|e| e.score)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shared pointer to the latest snapshot. Publishing swaps the whole value.
#[derive(Debug, Clone, Default)]
pub struct SnapshotHandle {
    inner: Arc<RwLock<Arc<RankingSnapshot>>>,
}

impl SnapshotHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Arc<RankingSnapshot> {
        Arc::clone(&self.inner.read())
    }

    pub(crate) fn publish(&self, snapshot: RankingSnapshot) {
        *self.inner.write() = Arc::new(snapshot);
    }

    pub fn top_n(&self, n: usize) -> Vec<RankedPost> {
        self.current().top_n(n).to_vec()
    }

    pub fn post_ids(&self, n: usize) -> Vec<String> {
        self.current()
            .top_n(n)
            .iter()
            .map(|e| e.post_id.clone())
            .collect()
    }
}
