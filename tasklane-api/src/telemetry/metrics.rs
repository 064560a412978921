//! Prometheus collectors for the API process, plus the `/metrics` scrape
//! handler. Collectors live in the default registry.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder,
    HistogramVec, IntCounterVec, IntGauge, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// Seconds. Most handlers finish well under 100ms against the pool.
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Registered lazily; a registration failure is kept and reported on use.
pub static METRICS: Lazy<ApiResult<TasklaneMetrics>> = Lazy::new(TasklaneMetrics::new);

fn registration_error(name: &str, err: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("metric {} could not be registered: {}", name, err))
}

#[derive(Clone)]
pub struct TasklaneMetrics {
    /// Labels: method, route template, status.
    pub http_requests_total: IntCounterVec,

    pub http_request_duration_seconds: HistogramVec,

    pub websocket_connections: IntGauge,

    /// Labelled by event variant name.
    pub ws_events_broadcast_total: IntCounterVec,

    pub member_roles_loaded: IntGauge,
}

impl TasklaneMetrics {
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_int_counter_vec!(
                "tasklane_http_requests_total",
                "HTTP requests served, by route and status",
                &["method", "path", "status"]
            )
            .map_err(|e| registration_error("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "tasklane_http_request_duration_seconds",
                "Wall time spent serving HTTP requests",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("http_request_duration_seconds", e))?,

            websocket_connections: register_int_gauge!(
                "tasklane_websocket_connections",
                "Current number of open WebSocket sessions"
            )
            .map_err(|e| registration_error("websocket_connections", e))?,

            ws_events_broadcast_total: register_int_counter_vec!(
                "tasklane_ws_events_broadcast_total",
                "Total events published to WebSocket subscribers",
                &["event_type"]
            )
            .map_err(|e| registration_error("ws_events_broadcast_total", e))?,

            member_roles_loaded: register_int_gauge!(
                "tasklane_member_roles_loaded",
                "Number of member roles cached by the role registry"
            )
            .map_err(|e| registration_error("member_roles_loaded", e))?,
        })
    }

    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, status.as_str()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    pub fn ws_connected(&self) {
        self.websocket_connections.inc();
    }

    pub fn ws_disconnected(&self) {
        self.websocket_connections.dec();
    }

    pub fn record_broadcast(&self, event_type: &str) {
        self.ws_events_broadcast_total
            .with_label_values(&[event_type])
            .inc();
    }

    pub fn set_member_roles_loaded(&self, count: usize) {
        self.member_roles_loaded.set(count as i64);
    }
}

/// Text exposition of the default registry.
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Text exposition format", content_type = "text/plain"),
        (status = 500, description = "Encoder failure"),
    ),
)]
pub async fn metrics_handler() -> impl IntoResponse {
    // Registers the Tasklane collectors before the first scrape.
    if let Err(e) = METRICS.as_ref() {
        tracing::warn!(error = %e, "Tasklane metrics are not registered");
    }

    let mut body = Vec::new();
    match TextEncoder::new().encode(&prometheus::gather(), &mut body) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Metrics scrape failed to encode");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                e.to_string().into_bytes(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::core::Collector;

    fn metrics() -> Result<&'static TasklaneMetrics, String> {
        METRICS
            .as_ref()
            .map_err(|e| e.to_string())
    }

    #[test]
    fn test_collectors_register_once() -> Result<(), String> {
        let metrics = metrics()?;
        assert!(!metrics.http_requests_total.desc().is_empty());
        Ok(())
    }

    #[test]
    fn test_request_counter_uses_route_template() -> Result<(), String> {
        let metrics = metrics()?;
        metrics.record_http_request("GET", "/api/v1/projects/{id}", 200, 0.015);
        let count = metrics
            .http_requests_total
            .with_label_values(&["GET", "/api/v1/projects/{id}", "200"])
            .get();
        assert!(count >= 1);
        Ok(())
    }

    #[test]
    fn test_member_roles_gauge() -> Result<(), String> {
        let metrics = metrics()?;
        metrics.set_member_roles_loaded(4);
        assert_eq!(metrics.member_roles_loaded.get(), 4);
        Ok(())
    }

    #[test]
    fn test_broadcast_counter() -> Result<(), String> {
        let metrics = metrics()?;
        let before = metrics
            .ws_events_broadcast_total
            .with_label_values(&["CommentDeleted"])
            .get();
        metrics.record_broadcast("CommentDeleted");
        let after = metrics
            .ws_events_broadcast_total
            .with_label_values(&["CommentDeleted"])
            .get();
        assert!(after > before);
        Ok(())
    }
}
