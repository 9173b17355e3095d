//! Observability Metrics
//!
//! Prometheus exposition for the counters and histograms recorded across the
//! pipeline and agent crates.

use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder.
///
/// Must be called once at startup before recording any metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    register_default_metrics();
    METRICS_HANDLE.get_or_init(|| handle.clone());
    Ok(handle)
}

pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Zero-valued series so dashboards see every metric from the first scrape
fn register_default_metrics() {
    for stage in ["greeting", "routing", "conversing"] {
        counter!("phone_agent_turns_total", "stage" => stage).absolute(0);
    }
    counter!("phone_agent_synthesis_fallback_total").absolute(0);
    counter!("phone_agent_cache_hits_total").absolute(0);
    counter!("phone_agent_cache_misses_total").absolute(0);
    counter!("phone_agent_webhook_rejected_total").absolute(0);
    counter!("phone_agent_turn_budget_exceeded_total").absolute(0);
    histogram!("phone_agent_turn_ms").record(0.0);
}

/// Record a webhook refused for a bad signature or an unreadable body
pub fn record_rejected_webhook(endpoint: &'static str) {
    counter!("phone_agent_webhook_rejected_total", "endpoint" => endpoint).increment(1);
}

/// GET /metrics
pub async fn metrics_handler() -> impl IntoResponse {
    match get_metrics_handle() {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            "# metrics recorder not installed\n".to_string(),
        ),
    }
}
