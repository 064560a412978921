//! Task Assignee REST API Routes
//!
//! Assignments are association rows keyed by `(task_id, user_id)`. Only
//! members of the task's project can be assigned.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use std::sync::Arc;
use tasklane_core::{ProjectMemberId, TaskAssigneeId, TaskId, UserId};
use tasklane_storage::{RoleRegistry, SharedStorage};

use crate::{
    error::{ApiError, ApiResult},
    events::WsEvent,
    extractors::ActorExtractor,
    services::{require_task_permission, Permission},
    state::AppState,
    types::{AssignTaskRequest, AssigneeResponse, ListAssigneesResponse},
    ws::WsState,
};

/// GET /api/v1/tasks/{id}/assignees - List a task's assignees
#[utoipa::path(
    get,
    path = "/api/v1/tasks/{id}/assignees",
    tag = "Assignees",
    params(
        ("id" = i64, Path, description = "Task ID"),
        ("X-User-Id" = i64, Header, description = "Acting user"),
    ),
    responses(
        (status = 200, description = "Task assignees", body = ListAssigneesResponse),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Not a member of the task's project", body = ApiError),
        (status = 404, description = "Task not found", body = ApiError),
    ),
)]
pub async fn list_assignees(
    State(storage): State<SharedStorage>,
    State(registry): State<Arc<RoleRegistry>>,
    ActorExtractor(actor): ActorExtractor,
    Path(task_id): Path<TaskId>,
) -> ApiResult<impl IntoResponse> {
    require_task_permission(&storage, &registry, task_id, actor.user_id, Permission::View).await?;

    let assignees = storage.assignee_list(task_id).await?;

    Ok(Json(ListAssigneesResponse {
        assignees: assignees.into_iter().map(AssigneeResponse::from).collect(),
    }))
}

/// POST /api/v1/tasks/{id}/assignees - Assign a project member to a task
#[utoipa::path(
    post,
    path = "/api/v1/tasks/{id}/assignees",
    tag = "Assignees",
    params(
        ("id" = i64, Path, description = "Task ID"),
        ("X-User-Id" = i64, Header, description = "Acting user"),
    ),
    request_body = AssignTaskRequest,
    responses(
        (status = 201, description = "User assigned", body = AssigneeResponse),
        (status = 400, description = "User is not a member of the task's project", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Viewers cannot assign tasks", body = ApiError),
        (status = 404, description = "Task not found", body = ApiError),
        (status = 409, description = "User is already assigned", body = ApiError),
    ),
)]
pub async fn assign_task(
    State(storage): State<SharedStorage>,
    State(registry): State<Arc<RoleRegistry>>,
    State(ws): State<Arc<WsState>>,
    ActorExtractor(actor): ActorExtractor,
    Path(task_id): Path<TaskId>,
    Json(req): Json<AssignTaskRequest>,
) -> ApiResult<impl IntoResponse> {
    let (task, _) = require_task_permission(
        &storage,
        &registry,
        task_id,
        actor.user_id,
        Permission::EditTasks,
    )
    .await?;

    let membership = ProjectMemberId::new(task.project_id, req.user_id);
    if storage.member_get(membership).await?.is_none() {
        return Err(ApiError::validation_failed(format!(
            "User {} is not a member of project {}",
            req.user_id, task.project_id
        )));
    }

    let assignee = storage
        .assignee_insert(TaskAssigneeId::new(task_id, req.user_id))
        .await?;

    let response = AssigneeResponse::from(assignee);
    ws.broadcast(WsEvent::TaskAssigned {
        project_id: task.project_id,
        assignee: response.clone(),
    });

    Ok((StatusCode::CREATED, Json(response)))
}

/// DELETE /api/v1/tasks/{id}/assignees/{user_id} - Unassign a user
#[utoipa::path(
    delete,
    path = "/api/v1/tasks/{id}/assignees/{user_id}",
    tag = "Assignees",
    params(
        ("id" = i64, Path, description = "Task ID"),
        ("user_id" = i64, Path, description = "Assigned user ID"),
        ("X-User-Id" = i64, Header, description = "Acting user"),
    ),
    responses(
        (status = 204, description = "User unassigned"),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Viewers cannot unassign tasks", body = ApiError),
        (status = 404, description = "Task or assignment not found", body = ApiError),
    ),
)]
pub async fn unassign_task(
    State(storage): State<SharedStorage>,
    State(registry): State<Arc<RoleRegistry>>,
    State(ws): State<Arc<WsState>>,
    ActorExtractor(actor): ActorExtractor,
    Path((task_id, user_id)): Path<(TaskId, UserId)>,
) -> ApiResult<StatusCode> {
    let (task, _) = require_task_permission(
        &storage,
        &registry,
        task_id,
        actor.user_id,
        Permission::EditTasks,
    )
    .await?;

    storage
        .assignee_delete(TaskAssigneeId::new(task_id, user_id))
        .await?;

    ws.broadcast(WsEvent::TaskUnassigned {
        project_id: task.project_id,
        task_id,
        user_id,
    });

    Ok(StatusCode::NO_CONTENT)
}

/// Assignee routes, merged into the `/tasks` router.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/:id/assignees", get(list_assignees).post(assign_task))
        .route("/:id/assignees/:user_id", delete(unassign_task))
}
