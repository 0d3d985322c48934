use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(describe_all);
}

fn describe_all() {
    describe_counter!(
        "trending_engagements_recorded_total",
        "Engagement events written to the event store."
    );
    describe_counter!(
        "trending_engagements_removed_total",
        "Engagement events removed by an un-like/un-comment."
    );
    describe_counter!(
        "trending_recompute_cycles_total",
        "Recompute cycles that published a snapshot."
    );
    describe_counter!(
        "trending_recompute_skipped_total",
        "Recompute ticks skipped because a cycle was already running."
    );
    describe_counter!(
        "trending_scoring_failures_total",
        "Posts left out of a cycle because scoring failed."
    );
    describe_gauge!("trending_active_posts", "Posts waiting for the next recompute.");
    describe_gauge!("trending_snapshot_entries", "Entries in the published ranking.");
    describe_gauge!(
        "trending_last_recompute_ts",
        "Unix ts of the last published snapshot."
    );
    describe_histogram!(
        "trending_recompute_duration_ms",
        "Wall time of one recompute cycle in milliseconds."
    );
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the process-wide Prometheus recorder once. Later calls reuse it;
    /// `None` means some other recorder was installed first.
    pub fn global() -> Option<&'static Metrics> {
        static METRICS: OnceCell<Option<Metrics>> = OnceCell::new();
        METRICS
            .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
                Ok(handle) => {
                    // Descriptions sent before the recorder existed went nowhere.
                    describe_all();
                    Some(Metrics { handle })
                }
                Err(e) => {
                    tracing::warn!(error = %e, "prometheus recorder not installed");
                    None
                }
            })
            .as_ref()
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
