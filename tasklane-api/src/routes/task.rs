//! Task REST API Routes
//!
//! Tasks are listed and created under their project
//! (`/projects/{id}/tasks`) and addressed directly afterwards (`/tasks/{id}`).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tasklane_core::{ProjectId, TaskId};
use tasklane_storage::{NewTask, RoleRegistry, SharedStorage, TaskFilter, TaskUpdate};

use crate::{
    config::ApiConfig,
    error::{ApiError, ApiResult},
    events::WsEvent,
    extractors::ActorExtractor,
    services::{require_permission, require_task_permission, Permission},
    state::AppState,
    types::{CreateTaskRequest, ListTasksRequest, ListTasksResponse, TaskResponse, UpdateTaskRequest},
    validation::{validate_name, HasUpdates},
    ws::WsState,
};

// ============================================================================
// PROJECT-SCOPED HANDLERS
// ============================================================================

/// GET /api/v1/projects/{id}/tasks - List a project's tasks
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}/tasks",
    tag = "Tasks",
    params(
        ("id" = i64, Path, description = "Project ID"),
        ("status" = Option<String>, Query, description = "Filter by status (TODO, IN_PROGRESS, IN_REVIEW, DONE)"),
        ("assignee_id" = Option<i64>, Query, description = "Only tasks assigned to this user"),
        ("limit" = Option<i64>, Query, description = "Maximum number of results"),
        ("offset" = Option<i64>, Query, description = "Offset for pagination"),
        ("X-User-Id" = i64, Header, description = "Acting user"),
    ),
    responses(
        (status = 200, description = "List of tasks", body = ListTasksResponse),
        (status = 400, description = "Invalid filter", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Not a member of the project", body = ApiError),
        (status = 404, description = "Project not found", body = ApiError),
    ),
)]
pub async fn list_tasks(
    State(storage): State<SharedStorage>,
    State(registry): State<Arc<RoleRegistry>>,
    State(config): State<Arc<ApiConfig>>,
    ActorExtractor(actor): ActorExtractor,
    Path(project_id): Path<ProjectId>,
    Query(params): Query<ListTasksRequest>,
) -> ApiResult<impl IntoResponse> {
    require_permission(&storage, &registry, project_id, actor.user_id, Permission::View).await?;

    let filter = TaskFilter {
        project_id,
        status: params.status,
        assignee_id: params.assignee_id,
        limit: config.page_limit(params.limit),
        offset: params.offset.unwrap_or(0).max(0),
    };
    let tasks = storage.task_list(&filter).await?;

    Ok(Json(ListTasksResponse {
        tasks: tasks.into_iter().map(TaskResponse::from).collect(),
    }))
}

/// POST /api/v1/projects/{id}/tasks - Create a task
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/tasks",
    tag = "Tasks",
    params(
        ("id" = i64, Path, description = "Project ID"),
        ("X-User-Id" = i64, Header, description = "Acting user"),
    ),
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created successfully", body = TaskResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Viewers cannot create tasks", body = ApiError),
        (status = 404, description = "Project not found", body = ApiError),
    ),
)]
pub async fn create_task(
    State(storage): State<SharedStorage>,
    State(registry): State<Arc<RoleRegistry>>,
    State(ws): State<Arc<WsState>>,
    ActorExtractor(actor): ActorExtractor,
    Path(project_id): Path<ProjectId>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_name(&req.title, "title")?;
    require_permission(
        &storage,
        &registry,
        project_id,
        actor.user_id,
        Permission::EditTasks,
    )
    .await?;

    let task = storage
        .task_insert(&NewTask {
            project_id,
            title: req.title.trim().to_string(),
            description: req.description,
            status: req.status.unwrap_or_default(),
            priority: req.priority.unwrap_or_default(),
            due_date: req.due_date,
            created_by: actor.user_id,
        })
        .await?;

    tracing::debug!(task_id = task.task_id, project_id, "Task created");

    let response = TaskResponse::from(task);
    ws.broadcast(WsEvent::TaskCreated {
        task: response.clone(),
    });

    Ok((StatusCode::CREATED, Json(response)))
}

// ============================================================================
// TASK HANDLERS
// ============================================================================

/// GET /api/v1/tasks/{id} - Get a task
#[utoipa::path(
    get,
    path = "/api/v1/tasks/{id}",
    tag = "Tasks",
    params(
        ("id" = i64, Path, description = "Task ID"),
        ("X-User-Id" = i64, Header, description = "Acting user"),
    ),
    responses(
        (status = 200, description = "Task details", body = TaskResponse),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Not a member of the task's project", body = ApiError),
        (status = 404, description = "Task not found", body = ApiError),
    ),
)]
pub async fn get_task(
    State(storage): State<SharedStorage>,
    State(registry): State<Arc<RoleRegistry>>,
    ActorExtractor(actor): ActorExtractor,
    Path(id): Path<TaskId>,
) -> ApiResult<impl IntoResponse> {
    let (task, _) =
        require_task_permission(&storage, &registry, id, actor.user_id, Permission::View).await?;

    Ok(Json(TaskResponse::from(task)))
}

/// PATCH /api/v1/tasks/{id} - Update a task
#[utoipa::path(
    patch,
    path = "/api/v1/tasks/{id}",
    tag = "Tasks",
    params(
        ("id" = i64, Path, description = "Task ID"),
        ("X-User-Id" = i64, Header, description = "Acting user"),
    ),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Task updated successfully", body = TaskResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Viewers cannot edit tasks", body = ApiError),
        (status = 404, description = "Task not found", body = ApiError),
    ),
)]
pub async fn update_task(
    State(storage): State<SharedStorage>,
    State(registry): State<Arc<RoleRegistry>>,
    State(ws): State<Arc<WsState>>,
    ActorExtractor(actor): ActorExtractor,
    Path(id): Path<TaskId>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate_has_updates()?;
    if let Some(title) = &req.title {
        validate_name(title, "title")?;
    }

    require_task_permission(&storage, &registry, id, actor.user_id, Permission::EditTasks)
        .await?;

    let update = TaskUpdate {
        title: req.title.map(|title| title.trim().to_string()),
        description: req.description,
        status: req.status,
        priority: req.priority,
        due_date: req.due_date,
    };
    let task = storage.task_update(id, &update).await?;

    let response = TaskResponse::from(task);
    ws.broadcast(WsEvent::TaskUpdated {
        task: response.clone(),
    });

    Ok(Json(response))
}

/// DELETE /api/v1/tasks/{id} - Delete a task with its assignees and comments
#[utoipa::path(
    delete,
    path = "/api/v1/tasks/{id}",
    tag = "Tasks",
    params(
        ("id" = i64, Path, description = "Task ID"),
        ("X-User-Id" = i64, Header, description = "Acting user"),
    ),
    responses(
        (status = 204, description = "Task deleted successfully"),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Viewers cannot delete tasks", body = ApiError),
        (status = 404, description = "Task not found", body = ApiError),
    ),
)]
pub async fn delete_task(
    State(storage): State<SharedStorage>,
    State(registry): State<Arc<RoleRegistry>>,
    State(ws): State<Arc<WsState>>,
    ActorExtractor(actor): ActorExtractor,
    Path(id): Path<TaskId>,
) -> ApiResult<StatusCode> {
    let (task, _) =
        require_task_permission(&storage, &registry, id, actor.user_id, Permission::EditTasks)
            .await?;

    storage.task_delete(id).await?;

    ws.broadcast(WsEvent::TaskDeleted {
        project_id: task.project_id,
        task_id: id,
    });

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// ROUTERS
// ============================================================================

/// Routes merged into the `/projects` router.
pub fn project_router() -> Router<AppState> {
    Router::new().route("/:id/tasks", get(list_tasks).post(create_task))
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/:id", get(get_task).patch(update_task).delete(delete_task))
}
