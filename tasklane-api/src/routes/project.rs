//! Project REST API Routes
//!
//! Creating a project makes the acting user its OWNER member. Reads need any
//! membership; edits need Owner or Admin; deletion needs the Owner.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tasklane_core::{ProjectId, RoleCode};
use tasklane_storage::{NewProject, ProjectUpdate, RoleRegistry, SharedStorage};

use crate::{
    error::{ApiError, ApiResult},
    events::WsEvent,
    extractors::ActorExtractor,
    services::{require_member, require_permission, Permission},
    state::AppState,
    types::{CreateProjectRequest, ListProjectsResponse, ProjectResponse, UpdateProjectRequest},
    validation::{validate_name, HasUpdates},
    ws::WsState,
};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /api/v1/projects - Create a project owned by the acting user
#[utoipa::path(
    post,
    path = "/api/v1/projects",
    tag = "Projects",
    params(("X-User-Id" = i64, Header, description = "Acting user")),
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created successfully", body = ProjectResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
)]
pub async fn create_project(
    State(storage): State<SharedStorage>,
    State(registry): State<Arc<RoleRegistry>>,
    State(ws): State<Arc<WsState>>,
    ActorExtractor(actor): ActorExtractor,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_name(&req.name, "name")?;

    let owner_role_id = registry.get_role_id(RoleCode::Owner)?;
    let project = storage
        .project_insert(
            &NewProject {
                name: req.name.trim().to_string(),
                description: req.description,
                owner_id: actor.user_id,
            },
            owner_role_id,
        )
        .await?;

    tracing::info!(
        project_id = project.project_id,
        owner_id = actor.user_id,
        "Project created"
    );

    let response = ProjectResponse::from(project);
    ws.broadcast(WsEvent::ProjectCreated {
        project: response.clone(),
    });

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/projects - List the acting user's projects
#[utoipa::path(
    get,
    path = "/api/v1/projects",
    tag = "Projects",
    params(("X-User-Id" = i64, Header, description = "Acting user")),
    responses(
        (status = 200, description = "Projects the acting user is a member of", body = ListProjectsResponse),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
)]
pub async fn list_projects(
    State(storage): State<SharedStorage>,
    ActorExtractor(actor): ActorExtractor,
) -> ApiResult<impl IntoResponse> {
    let projects = storage.project_list_for_user(actor.user_id).await?;

    Ok(Json(ListProjectsResponse {
        projects: projects.into_iter().map(ProjectResponse::from).collect(),
    }))
}

/// GET /api/v1/projects/{id} - Get a project
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}",
    tag = "Projects",
    params(
        ("id" = i64, Path, description = "Project ID"),
        ("X-User-Id" = i64, Header, description = "Acting user"),
    ),
    responses(
        (status = 200, description = "Project details", body = ProjectResponse),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Not a member of the project", body = ApiError),
        (status = 404, description = "Project not found", body = ApiError),
    ),
)]
pub async fn get_project(
    State(storage): State<SharedStorage>,
    State(registry): State<Arc<RoleRegistry>>,
    ActorExtractor(actor): ActorExtractor,
    Path(id): Path<ProjectId>,
) -> ApiResult<impl IntoResponse> {
    require_member(&storage, &registry, id, actor.user_id).await?;

    let project = storage
        .project_get(id)
        .await?
        .ok_or_else(|| ApiError::entity_not_found("Project", id))?;

    Ok(Json(ProjectResponse::from(project)))
}

/// PATCH /api/v1/projects/{id} - Update a project
#[utoipa::path(
    patch,
    path = "/api/v1/projects/{id}",
    tag = "Projects",
    params(
        ("id" = i64, Path, description = "Project ID"),
        ("X-User-Id" = i64, Header, description = "Acting user"),
    ),
    request_body = UpdateProjectRequest,
    responses(
        (status = 200, description = "Project updated successfully", body = ProjectResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Owner or Admin role required", body = ApiError),
        (status = 404, description = "Project not found", body = ApiError),
    ),
)]
pub async fn update_project(
    State(storage): State<SharedStorage>,
    State(registry): State<Arc<RoleRegistry>>,
    State(ws): State<Arc<WsState>>,
    ActorExtractor(actor): ActorExtractor,
    Path(id): Path<ProjectId>,
    Json(req): Json<UpdateProjectRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate_has_updates()?;
    if let Some(name) = &req.name {
        validate_name(name, "name")?;
    }

    require_permission(&storage, &registry, id, actor.user_id, Permission::ManageMembers).await?;

    let update = ProjectUpdate {
        name: req.name.map(|name| name.trim().to_string()),
        description: req.description,
    };
    let project = storage.project_update(id, &update).await?;

    let response = ProjectResponse::from(project);
    ws.broadcast(WsEvent::ProjectUpdated {
        project: response.clone(),
    });

    Ok(Json(response))
}

/// DELETE /api/v1/projects/{id} - Delete a project with its members, tasks and comments
#[utoipa::path(
    delete,
    path = "/api/v1/projects/{id}",
    tag = "Projects",
    params(
        ("id" = i64, Path, description = "Project ID"),
        ("X-User-Id" = i64, Header, description = "Acting user"),
    ),
    responses(
        (status = 204, description = "Project deleted successfully"),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Owner role required", body = ApiError),
        (status = 404, description = "Project not found", body = ApiError),
    ),
)]
pub async fn delete_project(
    State(storage): State<SharedStorage>,
    State(registry): State<Arc<RoleRegistry>>,
    State(ws): State<Arc<WsState>>,
    ActorExtractor(actor): ActorExtractor,
    Path(id): Path<ProjectId>,
) -> ApiResult<StatusCode> {
    require_permission(&storage, &registry, id, actor.user_id, Permission::ManageProject).await?;

    storage.project_delete(id).await?;
    tracing::info!(project_id = id, user_id = actor.user_id, "Project deleted");

    ws.broadcast(WsEvent::ProjectDeleted { project_id: id });

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route(
            "/:id",
            get(get_project).patch(update_project).delete(delete_project),
        )
}
