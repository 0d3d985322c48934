// src/scheduler.rs
//! Recompute loop: `Idle -> Running -> Idle` on a fixed interval.
//!
//! A tick that finds a cycle already running is skipped, never queued. Shutdown
//! is only observed between cycles, so an in-flight cycle always completes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::trending::TrendingEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleState {
    Idle,
    Running,
}

/// Result of one recompute attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Another cycle was running.
    Skipped,
    /// Nothing was active; snapshot untouched.
    Empty,
    /// Every active post failed to score; snapshot untouched.
    AllFailed { failed: usize },
    Published {
        scored: usize,
        failed: usize,
        entries: usize,
    },
}

/// Single-flight guard for recompute cycles.
#[derive(Debug, Default)]
pub struct CycleGate {
    running: AtomicBool,
}

impl CycleGate {
    pub fn try_enter(&self) -> Option<CycleGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CycleGuard { gate: self })
    }

    pub fn state(&self) -> CycleState {
        if self.running.load(Ordering::Acquire) {
            CycleState::Running
        } else {
            CycleState::Idle
        }
    }
}

/// Returns the gate to `Idle` when dropped.
#[derive(Debug)]
pub struct CycleGuard<'a> {
    gate: &'a CycleGate,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.gate.running.store(false, Ordering::Release);
    }
}

/// Handle to the background recompute task.
pub struct RecomputeLoop {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl RecomputeLoop {
    /// Stop ticking. Waits for a cycle that is already running to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            tracing::warn!(target: "trending", error = %e, "recompute loop ended abnormally");
        }
    }

    /// Let the loop run for the rest of the process lifetime.
    pub fn detach(self) {}
}

/// Spawn the periodic recompute task. The first tick fires immediately.
pub fn spawn_recompute_loop(engine: Arc<TrendingEngine>, interval: Duration) -> RecomputeLoop {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // Once the handle is detached the sender is gone; stop polling it.
        let mut watching = true;

        info!(
            target: "trending",
            interval_secs = interval.as_secs(),
            "recompute loop started"
        );

        loop {
            tokio::select! {
                biased;
                changed = shutdown_rx.changed(), if watching => {
                    match changed {
                        Ok(()) if *shutdown_rx.borrow() => break,
                        Ok(()) => {}
                        Err(_) => watching = false,
                    }
                }
                _ = ticker.tick() => {
                    engine.recompute().await;
                }
            }
        }

        info!(target: "trending", "recompute loop stopped");
    });

    RecomputeLoop {
        shutdown_tx,
        handle,
    }
}
