//! Trending Service — Binary Entrypoint
//! Loads config, builds the ranking engine, starts the recompute loop and
//! serves the Axum router.

use shuttle_axum::ShuttleAxum;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use trending_ranker::{build_engine, router, spawn_recompute_loop, AppState, TrendingConfig};

fn is_dev_env() -> bool {
    cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        )
}

/// Compact stdout tracing when `dev_log` is on and we are not in production.
/// `RUST_LOG` wins over the configured filter.
fn init_dev_tracing(cfg: &TrendingConfig) {
    if !(cfg.dev_log && is_dev_env()) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // The runtime may already have installed a subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    let cfg = TrendingConfig::load_default()?;
    init_dev_tracing(&cfg);

    let engine = build_engine(&cfg).await?;

    spawn_recompute_loop(engine.clone(), cfg.recompute_interval()).detach();
    info!(
        target: "trending",
        window_secs = cfg.window_secs,
        interval_secs = cfg.recompute_interval_secs,
        "trending service starting"
    );

    Ok(router(AppState::new(engine, cfg)).into())
}
