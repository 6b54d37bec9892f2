//! Prometheus Metrics Definitions
//!
//! Defines all Chirp metrics with appropriate labels and types.
//! Exposes a /metrics endpoint for Prometheus scraping.

use axum::{http::StatusCode, response::IntoResponse};
use chirp_core::{NotificationType, ToggleDirection, ToggleKind};
use chirp_storage::CacheOutcome;
use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram_vec, Counter,
    CounterVec, Encoder, Gauge, HistogramVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<ChirpMetrics>> = Lazy::new(ChirpMetrics::new);

fn registration_error(name: &str, e: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, e))
}

/// Container for all Chirp metrics.
#[derive(Clone)]
pub struct ChirpMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Toggle outcomes - labels: kind, direction
    pub toggles_total: CounterVec,

    /// Cache interactions - labels: operation, outcome
    pub cache_operations_total: CounterVec,

    /// Notifications persisted - labels: type
    pub notifications_created_total: CounterVec,

    /// Notification creations that failed and were swallowed
    pub notification_failures_total: Counter,

    /// Current active WebSocket connections
    pub websocket_connections: Gauge,

    /// Users with at least one live connection
    pub online_users: Gauge,

    /// Hub events emitted - labels: event
    pub hub_events_total: CounterVec,

    /// Requests rejected by a rate limiter - labels: scope
    pub rate_limited_total: CounterVec,
}

impl ChirpMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "chirp_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| registration_error("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "chirp_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("http_request_duration_seconds", e))?,

            toggles_total: register_counter_vec!(
                "chirp_toggles_total",
                "Toggle operations by kind and resulting direction",
                &["kind", "direction"]
            )
            .map_err(|e| registration_error("toggles_total", e))?,

            cache_operations_total: register_counter_vec!(
                "chirp_cache_operations_total",
                "Cache interactions by operation and outcome",
                &["operation", "outcome"]
            )
            .map_err(|e| registration_error("cache_operations_total", e))?,

            notifications_created_total: register_counter_vec!(
                "chirp_notifications_created_total",
                "Notifications persisted by type",
                &["type"]
            )
            .map_err(|e| registration_error("notifications_created_total", e))?,

            notification_failures_total: register_counter!(
                "chirp_notification_failures_total",
                "Notification creations that failed and were swallowed"
            )
            .map_err(|e| registration_error("notification_failures_total", e))?,

            websocket_connections: register_gauge!(
                "chirp_websocket_connections",
                "Current number of active WebSocket connections"
            )
            .map_err(|e| registration_error("websocket_connections", e))?,

            online_users: register_gauge!(
                "chirp_online_users",
                "Users with at least one live connection"
            )
            .map_err(|e| registration_error("online_users", e))?,

            hub_events_total: register_counter_vec!(
                "chirp_hub_events_total",
                "Events emitted by the delivery hub",
                &["event"]
            )
            .map_err(|e| registration_error("hub_events_total", e))?,

            rate_limited_total: register_counter_vec!(
                "chirp_rate_limited_total",
                "Requests rejected by a rate limiter",
                &["scope"]
            )
            .map_err(|e| registration_error("rate_limited_total", e))?,
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

    pub fn record_toggle(&self, kind: ToggleKind, direction: ToggleDirection) {
        self.toggles_total
            .with_label_values(&[kind.as_str(), direction.as_str()])
            .inc();
    }

    pub fn record_cache(&self, operation: &str, outcome: CacheOutcome) {
        self.cache_operations_total
            .with_label_values(&[operation, outcome.as_str()])
            .inc();
    }

    pub fn record_notification_created(&self, notification_type: NotificationType) {
        self.notifications_created_total
            .with_label_values(&[notification_type.as_str()])
            .inc();
    }

    pub fn record_notification_failure(&self) {
        self.notification_failures_total.inc();
    }

    /// Increment WebSocket connection count.
    pub fn ws_connected(&self) {
        self.websocket_connections.inc();
    }

    /// Decrement WebSocket connection count.
    pub fn ws_disconnected(&self) {
        self.websocket_connections.dec();
    }

    pub fn set_online_users(&self, count: usize) {
        self.online_users.set(count as f64);
    }

    pub fn record_hub_event(&self, event: &str) {
        self.hub_events_total.with_label_values(&[event]).inc();
    }

    pub fn record_rate_limited(&self, scope: &str) {
        self.rate_limited_total.with_label_values(&[scope]).inc();
    }
}

/// Run `f` against the global metrics, if they registered.
pub fn with_metrics(f: impl FnOnce(&ChirpMetrics)) {
    if let Ok(metrics) = METRICS.as_ref() {
        f(metrics);
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
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

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::core::Collector;

    fn metrics() -> Result<&'static ChirpMetrics, String> {
        METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))
    }

    #[test]
    fn test_metrics_creation() -> Result<(), String> {
        assert!(!metrics()?.http_requests_total.desc().is_empty());
        Ok(())
    }

    #[test]
    fn test_record_http_request() -> Result<(), String> {
        metrics()?.record_http_request("GET", "/api/v1/tweets", 200, 0.015);
        Ok(())
    }

    #[test]
    fn test_toggle_counter_is_labelled() -> Result<(), String> {
        let m = metrics()?;
        let before = m
            .toggles_total
            .with_label_values(&["like", "added"])
            .get();
        m.record_toggle(ToggleKind::Like, ToggleDirection::Added);
        let after = m.toggles_total.with_label_values(&["like", "added"]).get();
        assert!(after >= before + 1.0);
        Ok(())
    }

    #[test]
    fn test_notification_failure_counter_increments() -> Result<(), String> {
        let m = metrics()?;
        let before = m.notification_failures_total.get();
        m.record_notification_failure();
        assert!(m.notification_failures_total.get() >= before + 1.0);
        Ok(())
    }

    #[test]
    fn test_websocket_metrics() -> Result<(), String> {
        let m = metrics()?;
        m.ws_connected();
        m.ws_disconnected();
        m.set_online_users(3);
        m.record_hub_event("presence:online");
        m.record_cache("get", CacheOutcome::Hit);
        Ok(())
    }
}
