// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod active;
pub mod api;
pub mod clock;
pub mod config;
pub mod engagement;
pub mod error;
pub mod metrics;
pub mod scheduler;
pub mod score;
pub mod snapshot;
pub mod store;
pub mod trending;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

pub use crate::api::{router, AppState};
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::config::{StoreBackend, TrendingConfig};
pub use crate::engagement::{EngagementEvent, EngagementKind, Weights};
pub use crate::error::TrendingError;
pub use crate::scheduler::{spawn_recompute_loop, CycleOutcome, CycleState, RecomputeLoop};
pub use crate::snapshot::{RankedPost, RankingSnapshot};
pub use crate::store::{EventStore, MemoryEventStore, RedisEventStore};
pub use crate::trending::TrendingEngine;

/// Build the configured event store.
pub async fn build_store(cfg: &TrendingConfig) -> anyhow::Result<Arc<dyn EventStore>> {
    let store: Arc<dyn EventStore> = match cfg.store {
        StoreBackend::Memory => Arc::new(MemoryEventStore::new(cfg.window())),
        StoreBackend::Redis => {
            let url = cfg
                .redis_url
                .as_deref()
                .context("redis store selected without redis_url")?;
            Arc::new(RedisEventStore::connect(url, cfg.window()).await?)
        }
    };
    info!(target: "trending", store = store.name(), window_secs = cfg.window_secs, "event store ready");
    Ok(store)
}

/// Engine wired to the configured store and the system clock.
pub async fn build_engine(cfg: &TrendingConfig) -> anyhow::Result<Arc<TrendingEngine>> {
    let store = build_store(cfg).await?;
    Ok(Arc::new(TrendingEngine::new(
        store,
        cfg.weights,
        cfg.window(),
        Arc::new(SystemClock),
    )))
}
