//! Per-request tracing and metrics.
//!
//! Each request runs inside a `tracing` span and an OpenTelemetry server span
//! whose parent comes from the caller's `traceparent` header, if any. Metric
//! labels use the route template so ids never become label values.

use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use opentelemetry::{
    global,
    trace::{SpanKind, Status, TraceContextExt, Tracer},
    Context, KeyValue,
};
use opentelemetry_http::HeaderExtractor;
use std::time::Instant;
use tracing::{info_span, Instrument};

use super::metrics::METRICS;

/// `/api/v1/projects/5/members/9` becomes `/api/v1/projects/{id}/members/{id}`.
pub(crate) fn normalize_path(path: &str) -> String {
    let is_id = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    path.split('/')
        .map(|s| if is_id(s) { "{id}" } else { s })
        .collect::<Vec<_>>()
        .join("/")
}

fn otel_status(status: StatusCode) -> Status {
    match status.as_u16() {
        500.. => Status::error("server error"),
        400.. => Status::error("client error"),
        _ => Status::Ok,
    }
}

fn start_server_span(request: &Request, route: &str) -> Context {
    let parent = global::get_text_map_propagator(|p| p.extract(&HeaderExtractor(request.headers())));
    let tracer = global::tracer("tasklane-api");
    let span = tracer
        .span_builder(format!("{} {}", request.method(), route))
        .with_kind(SpanKind::Server)
        .with_attributes(vec![
            KeyValue::new("http.method", request.method().to_string()),
            KeyValue::new("http.target", request.uri().path().to_string()),
            KeyValue::new("http.route", route.to_string()),
        ])
        .start_with_context(&tracer, &parent);
    Context::current_with_span(span)
}

pub async fn observability_middleware(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let target = request.uri().path().to_string();
    let route = normalize_path(&target);

    let otel_cx = start_server_span(&request, &route);
    let span = info_span!(
        "http_request",
        http.method = %method,
        http.route = %route,
        otel.kind = "server",
    );

    let response = next.run(request).instrument(span).await;
    let status = response.status();
    let elapsed = started.elapsed();

    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_http_request(method.as_str(), &route, status.as_u16(), elapsed.as_secs_f64());
    }

    let server_span = otel_cx.span();
    server_span.set_attribute(KeyValue::new("http.status_code", i64::from(status.as_u16())));
    server_span.set_status(otel_status(status));
    server_span.end();

    tracing::info!(
        %method,
        path = %target,
        status = status.as_u16(),
        elapsed_ms = elapsed.as_millis() as u64,
        "request finished"
    );

    response
}
