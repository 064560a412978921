//! HTTP surface assembly.
//!
//! Entity routes live under `/api/v1` and identify the caller by `X-User-Id`.
//! Health checks, metrics and the OpenAPI document sit at the root and need no caller.

pub mod assignee;
pub mod comment;
pub mod health;
pub mod member;
pub mod project;
pub mod role;
pub mod task;
pub mod user;

use std::time::Duration;

use axum::{
    http::{header, header::HeaderName, HeaderValue, Method},
    middleware::from_fn,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::config::ApiConfig;
use crate::extractors::USER_ID_HEADER;
use crate::openapi::ApiDoc;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};
use crate::ws::ws_handler;

async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

#[cfg(feature = "openapi")]
async fn openapi_yaml() -> impl IntoResponse {
    use axum::http::StatusCode;

    match ApiDoc::to_yaml() {
        Ok(yaml) => (StatusCode::OK, [(header::CONTENT_TYPE, "text/yaml")], yaml),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain")],
            format!("could not render the document as YAML: {}", e),
        ),
    }
}

/// Member, task and comment routes hang off their parent's path, so each
/// parent merges its children's routers before nesting.
fn build_entity_routes() -> Router<AppState> {
    Router::new()
        .nest("/users", user::create_router())
        .nest(
            "/projects",
            project::create_router()
                .merge(member::create_router())
                .merge(task::project_router()),
        )
        .nest(
            "/tasks",
            task::create_router()
                .merge(assignee::create_router())
                .merge(comment::task_router()),
        )
        .nest("/comments", comment::create_router())
        .nest("/roles", role::create_router())
        .route("/ws", get(ws_handler))
}

/// Full application router with state applied.
///
/// Layers wrap outside-in: CORS, then `TraceLayer`, then request metrics.
pub fn create_api_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config);

    let mut router = Router::new()
        .nest("/api/v1", build_entity_routes())
        .nest("/health", health::create_router())
        .route("/metrics", get(metrics_handler))
        .route("/openapi.json", get(openapi_json));

    #[cfg(feature = "openapi")]
    {
        router = router.route("/openapi.yaml", get(openapi_yaml));
    }

    #[cfg(feature = "swagger-ui")]
    {
        use utoipa_swagger_ui::SwaggerUi;
        router = router.merge(SwaggerUi::new("/swagger-ui").url("/openapi.json", ApiDoc::openapi()));
    }

    router
        .with_state(state)
        .layer(from_fn(observability_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// An empty origin list means any origin may call.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(USER_ID_HEADER),
        ])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::warn!("No CORS origins configured; accepting any origin");
        cors.allow_origin(Any)
    } else {
        tracing::info!(origins = ?config.cors_origins, "Restricting CORS origins");
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}
