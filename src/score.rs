//! Weighted window score: Σ count_in_window(kind) × weight(kind).

use std::time::Duration;

use crate::engagement::{EngagementKind, Weights};
use crate::error::TrendingError;
use crate::store::EventStore;

#[derive(Debug, Clone, Copy)]
pub struct ScoreCalculator {
    weights: Weights,
    window_ms: i64,
}

impl ScoreCalculator {
    pub fn new(weights: Weights, window: Duration) -> Self {
        Self {
            weights,
            window_ms: window.as_millis() as i64,
        }
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    pub fn window_ms(&self) -> i64 {
        self.window_ms
    }

    /// Start of the window ending at `now_ms`.
    pub fn window_start(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.window_ms)
    }

    /// Score of `post_id` over `[now - window, now]`. Reads only; zero when the
    /// post has no in-window events.
    pub async fn compute_score(
        &self,
        store: &dyn EventStore,
        post_id: &str,
        now_ms: i64,
    ) -> Result<f64, TrendingError> {
        let start = self.window_start(now_ms);
        let mut score = 0.0;
        for kind in EngagementKind::ALL {
            let count = store.count_in_window(post_id, kind, start, now_ms).await?;
            score += count as f64 * self.weights.weight_for(kind);
        }
        Ok(score)
    }
}
