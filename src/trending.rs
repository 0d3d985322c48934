//! # Trending Engine
//! Owns the event store, active set, score calculator and published snapshot,
//! and exposes the operations the post/comment controllers and the listing
//! endpoint call.
//!
//! Write path: record/remove in the store → mark the post active.
//! Recompute: drain active posts → score each → merge with the previous
//! snapshot → publish. Posts that fail to score go back into the active set
//! and keep their previous entry. Read path: the published snapshot only.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram};
use tracing::{debug, info, warn};

use crate::active::ActiveSet;
use crate::clock::Clock;
use crate::engagement::{anon_id, EngagementEvent, EngagementKind, Weights};
use crate::error::TrendingError;
use crate::metrics::ensure_metrics_described;
use crate::scheduler::{CycleGate, CycleOutcome, CycleState};
use crate::snapshot::{RankedPost, RankingSnapshot, SnapshotHandle};
use crate::score::ScoreCalculator;
use crate::store::EventStore;

/// Published cycles between full-store compactions. Other cycles only sweep
/// the streams of the posts they scored.
pub const FULL_COMPACTION_EVERY: u64 = 60;

pub struct TrendingEngine {
    store: Arc<dyn EventStore>,
    active: ActiveSet,
    calculator: ScoreCalculator,
    snapshot: SnapshotHandle,
    clock: Arc<dyn Clock>,
    gate: CycleGate,
    published_cycles: AtomicU64,
}

impl TrendingEngine {
    pub fn new(
        store: Arc<dyn EventStore>,
        weights: Weights,
        window: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        ensure_metrics_described();
        Self {
            store,
            active: ActiveSet::new(),
            calculator: ScoreCalculator::new(weights, window),
            snapshot: SnapshotHandle::new(),
            clock,
            gate: CycleGate::default(),
            published_cycles: AtomicU64::new(0),
        }
    }

    /* -------- write path -------- */

    /// Record an engagement that happened at `at`.
    pub async fn add_engagement(
        &self,
        post_id: &str,
        kind: EngagementKind,
        actor_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), TrendingError> {
        self.record(&EngagementEvent::at(post_id, kind, actor_id, at))
            .await
    }

    pub async fn record(&self, event: &EngagementEvent) -> Result<(), TrendingError> {
        let now = self.clock.now_ms();
        self.store.record_event(event, now).await?;
        self.active.mark_active(&event.post_id);

        counter!("trending_engagements_recorded_total", "kind" => event.kind.as_str())
            .increment(1);
        gauge!("trending_active_posts").set(self.active.len() as f64);
        debug!(
            target: "trending",
            post_id = %event.post_id,
            kind = %event.kind,
            actor = %anon_id(&event.actor_id),
            ts = event.timestamp_ms,
            "engagement recorded"
        );
        Ok(())
    }

    /// Undo an engagement. `timestamp_ms` must be the exact instant the original
    /// event was recorded with; anything else is a silent no-op.
    pub async fn remove_engagement(
        &self,
        kind: EngagementKind,
        post_id: &str,
        actor_id: &str,
        timestamp_ms: i64,
    ) -> Result<(), TrendingError> {
        let removed = self
            .store
            .remove_event(post_id, kind, actor_id, timestamp_ms)
            .await?;
        self.active.mark_active(post_id);

        let now = self.clock.now_ms();
        let retired = self
            .active
            .maybe_retire(
                self.store.as_ref(),
                post_id,
                self.calculator.window_start(now),
                now,
            )
            .await?;

        if removed {
            counter!("trending_engagements_removed_total", "kind" => kind.as_str()).increment(1);
        }
        gauge!("trending_active_posts").set(self.active.len() as f64);
        debug!(
            target: "trending",
            post_id = %post_id,
            kind = %kind,
            actor = %anon_id(actor_id),
            ts = timestamp_ms,
            removed,
            retired,
            "engagement removed"
        );
        Ok(())
    }

    /* -------- scoring & recompute -------- */

    /// Live score of `post_id` as of now. Used by diagnostics and tests; the
    /// read path serves the snapshot instead.
    pub async fn compute_score(&self, post_id: &str) -> Result<f64, TrendingError> {
        self.calculator
            .compute_score(self.store.as_ref(), post_id, self.clock.now_ms())
            .await
    }

    /// Run one recompute cycle now, unless one is already running.
    pub async fn recompute(&self) -> CycleOutcome {
        let Some(_guard) = self.gate.try_enter() else {
            counter!("trending_recompute_skipped_total").increment(1);
            debug!(target: "trending", "recompute already running; tick skipped");
            return CycleOutcome::Skipped;
        };

        let started = Instant::now();
        let candidates = self.active.drain_all();
        gauge!("trending_active_posts").set(self.active.len() as f64);
        if candidates.is_empty() {
            debug!(target: "trending", "no active posts; snapshot unchanged");
            return CycleOutcome::Empty;
        }

        let now = self.clock.now_ms();
        let mut fresh = Vec::with_capacity(candidates.len());
        let mut failed = 0usize;
        for post_id in &candidates {
            match self
                .calculator
                .compute_score(self.store.as_ref(), post_id, now)
                .await
            {
                Ok(score) => fresh.push(RankedPost::new(post_id.clone(), score)),
                Err(e) => {
                    failed += 1;
                    self.active.mark_active(post_id);
                    counter!("trending_scoring_failures_total").increment(1);
                    warn!(target: "trending", post_id = %post_id, error = %e, "scoring failed; retrying next cycle");
                }
            }
        }

        if fresh.is_empty() {
            gauge!("trending_active_posts").set(self.active.len() as f64);
            warn!(target: "trending", failed, "every active post failed to score; keeping previous snapshot");
            return CycleOutcome::AllFailed { failed };
        }

        // Anything not rescored this cycle keeps its previous (possibly stale) score.
        let rescored: HashSet<String> = fresh.iter().map(|e| e.post_id.clone()).collect();
        let previous = self.snapshot.current();
        let scored = fresh.len();
        let mut entries = fresh;
        entries.extend(
            previous
                .entries
                .iter()
                .filter(|e| !rescored.contains(&e.post_id))
                .cloned(),
        );

        let snapshot = RankingSnapshot::ranked(entries, now);
        let published = snapshot.len();
        self.snapshot.publish(snapshot);
        gauge!("trending_active_posts").set(self.active.len() as f64);

        let cycle = self.published_cycles.fetch_add(1, Ordering::Relaxed) + 1;
        let compacted = if cycle % FULL_COMPACTION_EVERY == 0 {
            self.store.compact(now).await
        } else {
            self.store.compact_posts(&candidates, now).await
        };
        if let Err(e) = compacted {
            warn!(target: "trending", store = self.store.name(), error = %e, "store compaction failed");
        }

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        counter!("trending_recompute_cycles_total").increment(1);
        gauge!("trending_snapshot_entries").set(published as f64);
        gauge!("trending_last_recompute_ts").set((now / 1000) as f64);
        histogram!("trending_recompute_duration_ms").record(elapsed_ms);
        info!(
            target: "trending",
            scored,
            failed,
            entries = published,
            elapsed_ms,
            "trending snapshot published"
        );

        CycleOutcome::Published {
            scored,
            failed,
            entries: published,
        }
    }

    /* -------- read path -------- */

    /// Ids of the top `limit` posts in the last published snapshot.
    pub fn trending_post_ids(&self, limit: usize) -> Vec<String> {
        self.snapshot.post_ids(limit)
    }

    pub fn top_n(&self, n: usize) -> Vec<RankedPost> {
        self.snapshot.top_n(n)
    }

    pub fn snapshot(&self) -> Arc<RankingSnapshot> {
        self.snapshot.current()
    }

    /* -------- diagnostics -------- */

    pub fn cycle_state(&self) -> CycleState {
        self.gate.state()
    }

    pub fn active_posts(&self) -> usize {
        self.active.len()
    }

    pub fn is_active(&self, post_id: &str) -> bool {
        self.active.contains(post_id)
    }

    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    pub fn calculator(&self) -> &ScoreCalculator {
        &self.calculator
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }
}
