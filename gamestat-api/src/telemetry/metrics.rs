//! Prometheus Metrics Definitions
//!
//! Defines all gamestat metrics with appropriate labels and types.
//! Exposes a /metrics endpoint for Prometheus scraping.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge,
    HistogramVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Upstream call latency buckets (seconds), capped by the request timeout
const UPSTREAM_LATENCY_BUCKETS: &[f64] = &[0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<GamestatMetrics>> = Lazy::new(GamestatMetrics::new);

/// Container for all gamestat metrics.
#[derive(Clone)]
pub struct GamestatMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Upstream call counter - labels: outcome
    pub upstream_requests_total: CounterVec,

    /// Upstream call duration histogram - labels: outcome
    pub upstream_request_duration_seconds: HistogramVec,

    /// Cache lookup counter - labels: cache, result (fresh/miss/stale)
    pub cache_lookups_total: CounterVec,

    /// Last aggregated concurrent players
    pub current_ccu: Gauge,

    /// Last returned peak concurrent players
    pub peak_ccu: Gauge,
}

fn register_error(name: &str, e: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, e))
}

impl GamestatMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "gamestat_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| register_error("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "gamestat_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| register_error("http_request_duration_seconds", e))?,

            upstream_requests_total: register_counter_vec!(
                "gamestat_upstream_requests_total",
                "Total number of upstream games API requests",
                &["outcome"]
            )
            .map_err(|e| register_error("upstream_requests_total", e))?,

            upstream_request_duration_seconds: register_histogram_vec!(
                "gamestat_upstream_request_duration_seconds",
                "Upstream games API request duration in seconds",
                &["outcome"],
                UPSTREAM_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| register_error("upstream_request_duration_seconds", e))?,

            cache_lookups_total: register_counter_vec!(
                "gamestat_cache_lookups_total",
                "Cache lookups by cache and result",
                &["cache", "result"]
            )
            .map_err(|e| register_error("cache_lookups_total", e))?,

            current_ccu: register_gauge!(
                "gamestat_current_ccu",
                "Most recently aggregated concurrent players"
            )
            .map_err(|e| register_error("current_ccu", e))?,

            peak_ccu: register_gauge!(
                "gamestat_peak_ccu",
                "Peak concurrent players for the tracked period"
            )
            .map_err(|e| register_error("peak_ccu", e))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Record an upstream call; `outcome` is `ok` or an error kind.
    pub fn record_upstream(&self, outcome: &str, duration_secs: f64) {
        self.upstream_requests_total
            .with_label_values(&[outcome])
            .inc();
        self.upstream_request_duration_seconds
            .with_label_values(&[outcome])
            .observe(duration_secs);
    }

    /// Record a cache lookup result.
    pub fn record_cache_lookup(&self, cache: &str, result: &str) {
        self.cache_lookups_total
            .with_label_values(&[cache, result])
            .inc();
    }

    /// Publish the latest aggregate and peak.
    pub fn set_ccu(&self, current: u64, peak: u64) {
        self.current_ccu.set(current as f64);
        self.peak_ccu.set(peak as f64);
    }
}

/// Run `f` against the global metrics if they registered successfully.
pub fn with_metrics(f: impl FnOnce(&GamestatMetrics)) {
    if let Ok(metrics) = METRICS.as_ref() {
        f(metrics);
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 500, description = "Failed to encode metrics"),
    ),
)]
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
