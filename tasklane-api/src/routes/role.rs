//! Member Role REST API Routes
//!
//! Read-only view of the role registry's cache. Served without touching
//! storage.

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use std::sync::Arc;
use tasklane_storage::RoleRegistry;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    types::ListRolesResponse,
};

/// GET /api/v1/roles - List the cached member roles
#[utoipa::path(
    get,
    path = "/api/v1/roles",
    tag = "Roles",
    responses(
        (status = 200, description = "Cached member roles, by role ID", body = ListRolesResponse),
        (status = 503, description = "Role registry not initialized", body = ApiError),
    ),
)]
pub async fn list_roles(State(registry): State<Arc<RoleRegistry>>) -> ApiResult<impl IntoResponse> {
    if !registry.is_ready() {
        return Err(ApiError::service_unavailable(
            "Role registry is not initialized",
        ));
    }

    Ok(Json(ListRolesResponse {
        roles: registry.roles(),
    }))
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/", get(list_roles))
}
