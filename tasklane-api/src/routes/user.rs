//! User REST API Routes
//!
//! Account creation is open: it is how the first acting user comes to exist.
//! Reading users requires an acting user.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tasklane_core::UserId;
use tasklane_storage::{NewUser, SharedStorage};

use crate::{
    config::ApiConfig,
    error::{ApiError, ApiResult},
    extractors::ActorExtractor,
    state::AppState,
    types::{CreateUserRequest, ListUsersResponse, PageParams, UserResponse},
    validation::{validate_email, validate_username},
};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /api/v1/users - Create a user account
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created successfully", body = UserResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 409, description = "Username or email already taken", body = ApiError),
    ),
)]
pub async fn create_user(
    State(storage): State<SharedStorage>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_string();
    validate_username(&username)?;
    validate_email(&email)?;

    let full_name = req
        .full_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());

    let user = storage
        .user_insert(&NewUser {
            username,
            email,
            full_name,
        })
        .await?;

    tracing::info!(user_id = user.user_id, username = %user.username, "User created");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// GET /api/v1/users - List users
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    params(
        ("limit" = Option<i64>, Query, description = "Maximum number of results"),
        ("offset" = Option<i64>, Query, description = "Offset for pagination"),
        ("X-User-Id" = i64, Header, description = "Acting user"),
    ),
    responses(
        (status = 200, description = "List of users", body = ListUsersResponse),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
)]
pub async fn list_users(
    State(storage): State<SharedStorage>,
    State(config): State<Arc<ApiConfig>>,
    ActorExtractor(_actor): ActorExtractor,
    Query(params): Query<PageParams>,
) -> ApiResult<impl IntoResponse> {
    let users = storage
        .user_list(config.page_limit(params.limit), params.offset())
        .await?;

    Ok(Json(ListUsersResponse {
        users: users.into_iter().map(UserResponse::from).collect(),
    }))
}

/// GET /api/v1/users/{id} - Get a user
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "Users",
    params(
        ("id" = i64, Path, description = "User ID"),
        ("X-User-Id" = i64, Header, description = "Acting user"),
    ),
    responses(
        (status = 200, description = "User details", body = UserResponse),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "User not found", body = ApiError),
    ),
)]
pub async fn get_user(
    State(storage): State<SharedStorage>,
    ActorExtractor(_actor): ActorExtractor,
    Path(id): Path<UserId>,
) -> ApiResult<impl IntoResponse> {
    let user = storage
        .user_get(id)
        .await?
        .ok_or_else(|| ApiError::entity_not_found("User", id))?;

    Ok(Json(UserResponse::from(user)))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user))
}
