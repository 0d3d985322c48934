use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use tower_http::cors::CorsLayer;

use crate::config::TrendingConfig;
use crate::engagement::{EngagementEvent, EngagementKind};
use crate::error::TrendingError;
use crate::metrics::Metrics;
use crate::scheduler::CycleOutcome;
use crate::snapshot::RankedPost;
use crate::trending::TrendingEngine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<TrendingEngine>,
    pub config: Arc<TrendingConfig>,
}

impl AppState {
    pub fn new(engine: Arc<TrendingEngine>, config: TrendingConfig) -> Self {
        Self {
            engine,
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let app = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/trending", get(trending_ids))
        .route("/trending/scores", get(trending_scores))
        .route(
            "/engagements",
            post(add_engagement).delete(remove_engagement),
        )
        .route("/admin/recompute", post(admin_recompute))
        .layer(CorsLayer::very_permissive())
        .with_state(state);

    match Metrics::global() {
        Some(m) => app.merge(m.router()),
        None => app,
    }
}

#[derive(serde::Deserialize)]
struct LimitQuery {
    #[serde(default)]
    limit: Option<usize>,
}

async fn trending_ids(
    State(state): State<AppState>,
    Query(q): Query<LimitQuery>,
) -> Json<Vec<String>> {
    let limit = state.config.clamp_limit(q.limit);
    Json(state.engine.trending_post_ids(limit))
}

#[derive(serde::Serialize)]
struct ScoresOut {
    published_at_ms: Option<i64>,
    entries: Vec<RankedPost>,
}

async fn trending_scores(
    State(state): State<AppState>,
    Query(q): Query<LimitQuery>,
) -> Json<ScoresOut> {
    let limit = state.config.clamp_limit(q.limit);
    let snap = state.engine.snapshot();
    Json(ScoresOut {
        published_at_ms: snap.published_at_ms,
        entries: snap.top_n(limit).to_vec(),
    })
}

#[derive(serde::Deserialize)]
struct AddReq {
    post_id: String,
    kind: String,
    actor_id: String,
    #[serde(default)]
    at: Option<DateTime<Utc>>, // defaults to "now"
}

#[derive(serde::Serialize)]
struct AddResp {
    /// Needed later to remove this exact engagement.
    timestamp_ms: i64,
}

async fn add_engagement(
    State(state): State<AppState>,
    Json(body): Json<AddReq>,
) -> Result<(StatusCode, Json<AddResp>), TrendingError> {
    let kind: EngagementKind = body.kind.parse()?;
    let timestamp_ms = body
        .at
        .map(|at| at.timestamp_millis())
        .unwrap_or_else(|| state.engine.now_ms());

    state
        .engine
        .record(&EngagementEvent::new(
            body.post_id,
            kind,
            body.actor_id,
            timestamp_ms,
        ))
        .await?;

    Ok((StatusCode::CREATED, Json(AddResp { timestamp_ms })))
}

#[derive(serde::Deserialize)]
struct RemoveReq {
    post_id: String,
    kind: String,
    actor_id: String,
    timestamp_ms: i64,
}

async fn remove_engagement(
    State(state): State<AppState>,
    Json(body): Json<RemoveReq>,
) -> Result<StatusCode, TrendingError> {
    let kind: EngagementKind = body.kind.parse()?;
    if DateTime::<Utc>::from_timestamp_millis(body.timestamp_ms).is_none() {
        return Err(TrendingError::InvalidTimestamp(body.timestamp_ms));
    }
    state
        .engine
        .remove_engagement(kind, &body.post_id, &body.actor_id, body.timestamp_ms)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn admin_recompute(State(state): State<AppState>) -> Json<CycleOutcome> {
    Json(state.engine.recompute().await)
}
