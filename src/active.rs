//! # Active Set
//! Posts that received engagement since the last recompute. The scheduler drains
//! it once per cycle so only touched posts are rescored.
//!
//! Every mark carries a sequence number. Retiring a post is a compare-and-remove
//! against the number seen before the emptiness check, so a mark that lands while
//! the check is in flight is never dropped.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::engagement::EngagementKind;
use crate::error::TrendingError;
use crate::store::EventStore;

#[derive(Debug, Default)]
pub struct ActiveSet {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    /// post_id -> sequence number of its latest mark
    posts: HashMap<String, u64>,
    seq: u64,
}

impl ActiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `post_id` to the set. Returns the mark's sequence number.
    pub fn mark_active(&self, post_id: &str) -> u64 {
        let mut g = self.inner.lock();
        g.seq += 1;
        let seq = g.seq;
        g.posts.insert(post_id.to_string(), seq);
        seq
    }

    pub fn mark_of(&self, post_id: &str) -> Option<u64> {
        self.inner.lock().posts.get(post_id).copied()
    }

    /// Remove `post_id` only if its latest mark is still `mark`.
    pub fn retire_if_unchanged(&self, post_id: &str, mark: u64) -> bool {
        let mut g = self.inner.lock();
        if g.posts.get(post_id) == Some(&mark) {
            g.posts.remove(post_id);
            true
        } else {
            false
        }
    }

    /// Drop `post_id` when none of its streams has an event in
    /// `[window_start_ms, window_end_ms]`. Returns whether it was retired.
    pub async fn maybe_retire(
        &self,
        store: &dyn EventStore,
        post_id: &str,
        window_start_ms: i64,
        window_end_ms: i64,
    ) -> Result<bool, TrendingError> {
        let Some(mark) = self.mark_of(post_id) else {
            return Ok(false);
        };
        for kind in EngagementKind::ALL {
            if store
                .count_in_window(post_id, kind, window_start_ms, window_end_ms)
                .await?
                > 0
            {
                return Ok(false);
            }
        }
        Ok(self.retire_if_unchanged(post_id, mark))
    }

    /// Take every active post id and leave an empty set behind, in one critical
    /// section. Ids come back sorted.
    pub fn drain_all(&self) -> Vec<String> {
        let drained = {
            let mut g = self.inner.lock();
            std::mem::take(&mut g.posts)
        };
        let mut ids: Vec<String> = drained.into_keys().collect();
        ids.sort();
        ids
    }

    pub fn contains(&self, post_id: &str) -> bool {
        self.inner.lock().posts.contains_key(post_id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
