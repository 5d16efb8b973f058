// src/metrics.rs
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "advisor_recommendations_total",
            "Crop recommendations served."
        );
        describe_counter!(
            "advisor_input_rejected_total",
            "Recommendation requests rejected by input validation."
        );
        describe_counter!(
            "advisor_disease_requests_total",
            "Disease diagnoses served, labelled by source (remote|fallback)."
        );
        describe_counter!(
            "advisor_market_lookups_total",
            "Mandi price lookups, labelled by outcome (exact|fuzzy|unknown)."
        );
        describe_counter!(
            "advisor_chat_intents_total",
            "Chat messages classified, labelled by intent."
        );
        describe_histogram!(
            "advisor_recommend_duration_ms",
            "Scoring time per recommendation in milliseconds."
        );
        describe_gauge!("advisor_catalog_crops", "Crops in the loaded catalog.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Fails if one is already installed.
    pub fn install(catalog_crops: usize) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;

        ensure_metrics_described();
        gauge!("advisor_catalog_crops").set(catalog_crops as f64);

        Ok(Self { handle })
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
