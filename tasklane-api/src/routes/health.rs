//! Liveness and readiness endpoints for orchestrators.
//!
//! `/ping` and `/live` never touch the backend. `/ready` answers 503 until the
//! role registry has loaded and storage answers its health query. None of
//! them read `X-User-Id`.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tasklane_storage::{RoleRegistry, SharedStorage};

use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    fn all_healthy<'a>(parts: impl IntoIterator<Item = &'a ComponentHealth>) -> Self {
        if parts.into_iter().all(|c| c.status == HealthStatus::Healthy) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }

    fn http_status(self) -> StatusCode {
        match self {
            HealthStatus::Healthy => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Per-component breakdown included in readiness answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthDetails {
    pub storage: ComponentHealth,
    pub role_registry: ComponentHealth,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ComponentHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentHealth {
    fn up(latency_ms: Option<u64>) -> Self {
        ComponentHealth {
            status: HealthStatus::Healthy,
            latency_ms,
            error: None,
        }
    }

    fn down(reason: impl Into<String>) -> Self {
        ComponentHealth {
            status: HealthStatus::Unhealthy,
            latency_ms: None,
            error: Some(reason.into()),
        }
    }
}

#[utoipa::path(
    get,
    path = "/health/ping",
    tag = "Health",
    responses((status = 200, description = "Plain-text pong", body = String)),
)]
pub async fn ping() -> &'static str {
    "pong"
}

#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses((status = 200, description = "Process is running", body = HealthResponse)),
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: HealthStatus::Healthy,
        message: Some("tasklane-api is running".to_string()),
        details: None,
    })
}

#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Registry loaded and storage reachable", body = HealthResponse),
        (status = 503, description = "A dependency is not ready", body = HealthResponse),
    ),
)]
pub async fn readiness(
    State(storage): State<SharedStorage>,
    State(registry): State<Arc<RoleRegistry>>,
    State(started): State<Instant>,
) -> impl IntoResponse {
    let storage_check = check_storage(&storage).await;
    let registry_check = match registry.is_ready() {
        true => ComponentHealth::up(None),
        false => ComponentHealth::down("member roles not loaded yet"),
    };

    let status = HealthStatus::all_healthy([&storage_check, &registry_check]);
    let body = HealthResponse {
        status,
        message: None,
        details: Some(HealthDetails {
            storage: storage_check,
            role_registry: registry_check,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: started.elapsed().as_secs(),
        }),
    };

    (status.http_status(), Json(body))
}

async fn check_storage(storage: &SharedStorage) -> ComponentHealth {
    let timer = Instant::now();
    match storage.health_check().await {
        Ok(true) => ComponentHealth::up(Some(timer.elapsed().as_millis() as u64)),
        Ok(false) => ComponentHealth::down("storage reported unhealthy"),
        Err(e) => ComponentHealth::down(e.to_string()),
    }
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}
