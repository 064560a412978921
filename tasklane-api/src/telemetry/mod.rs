//! Tasklane Telemetry - Observability Infrastructure
//!
//! Structured logging, OpenTelemetry tracing and Prometheus metrics for the
//! API layer. Span export is optional; everything else works standalone.

pub mod metrics;
pub mod middleware;
pub mod tracer;

pub use metrics::{metrics_handler, TasklaneMetrics, METRICS};
pub use middleware::observability_middleware;
pub use tracer::{init_tracer, shutdown_tracer, TelemetryConfig};
