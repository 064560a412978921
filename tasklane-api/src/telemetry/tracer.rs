//! Logging and tracing bootstrap.
//!
//! Installs the global tracing subscriber (JSON logs filtered by `RUST_LOG`)
//! with an OpenTelemetry layer. Spans are exported over OTLP/HTTP when an
//! endpoint is configured.

use std::sync::OnceLock;

use opentelemetry::{global, trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{
    propagation::TraceContextPropagator,
    trace::{Sampler, SdkTracerProvider},
    Resource,
};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ApiError, ApiResult};

/// Provider kept for flushing on shutdown.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Read from `TASKLANE_OTLP_ENDPOINT`, `TASKLANE_SERVICE_NAME`,
/// `TASKLANE_ENVIRONMENT` and `TASKLANE_TRACE_SAMPLE_RATE`.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// OTLP/HTTP endpoint for traces (e.g. "http://localhost:4318/v1/traces")
    pub otlp_endpoint: Option<String>,
    pub service_name: String,
    pub service_version: String,
    /// Deployment environment (production, staging, development)
    pub environment: String,
    /// Trace sampling ratio (0.0 to 1.0)
    pub trace_sample_rate: f64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: std::env::var("TASKLANE_OTLP_ENDPOINT")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            service_name: std::env::var("TASKLANE_SERVICE_NAME")
                .unwrap_or_else(|_| "tasklane-api".to_string()),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: std::env::var("TASKLANE_ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            trace_sample_rate: std::env::var("TASKLANE_TRACE_SAMPLE_RATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1.0),
        }
    }
}

impl TelemetryConfig {
    pub fn sampler(&self) -> Sampler {
        if self.trace_sample_rate >= 1.0 {
            Sampler::AlwaysOn
        } else if self.trace_sample_rate <= 0.0 {
            Sampler::AlwaysOff
        } else {
            Sampler::TraceIdRatioBased(self.trace_sample_rate)
        }
    }
}

/// Installs the propagator, tracer provider and JSON subscriber. Errors if a
/// subscriber is already set.
pub fn init_tracer(config: &TelemetryConfig) -> ApiResult<()> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let resource = Resource::builder_empty()
        .with_attributes([
            KeyValue::new("service.name", config.service_name.clone()),
            KeyValue::new("service.version", config.service_version.clone()),
            KeyValue::new("deployment.environment", config.environment.clone()),
        ])
        .build();

    let builder = SdkTracerProvider::builder()
        .with_sampler(config.sampler())
        .with_resource(resource);

    let provider = match &config.otlp_endpoint {
        Some(endpoint) => {
            let exporter = SpanExporter::builder()
                .with_http()
                .with_endpoint(endpoint)
                .build()
                .map_err(|e| {
                    ApiError::internal_error(format!("OTLP exporter for {} failed: {}", endpoint, e))
                })?;
            builder.with_batch_exporter(exporter).build()
        }
        // Spans still carry trace ids into the logs without an exporter.
        None => builder.build(),
    };

    let tracer = provider.tracer("tasklane-api");
    global::set_tracer_provider(provider.clone());
    let _ = TRACER_PROVIDER.set(provider);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tasklane_api=debug,tasklane_storage=info,info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .with(OpenTelemetryLayer::new(tracer))
        .try_init()
        .map_err(|e| ApiError::internal_error(format!("a global subscriber is already installed: {}", e)))?;

    tracing::info!(
        service_name = %config.service_name,
        environment = %config.environment,
        otlp_endpoint = ?config.otlp_endpoint,
        "Telemetry initialized"
    );

    Ok(())
}

/// Flush pending spans and shut the tracer provider down.
pub fn shutdown_tracer() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.force_flush() {
            tracing::warn!(error = %e, "Failed to flush spans during shutdown");
        }
        if let Err(e) = provider.shutdown() {
            tracing::warn!(error = %e, "Failed to shut down tracer provider");
        }
    }
    tracing::info!("Tracer provider stopped");
}
