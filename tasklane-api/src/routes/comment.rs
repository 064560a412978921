//! Task Comment REST API Routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use std::sync::Arc;
use tasklane_core::{CommentId, TaskId};
use tasklane_storage::{NewComment, RoleRegistry, SharedStorage};

use crate::{
    error::{ApiError, ApiResult},
    events::WsEvent,
    extractors::ActorExtractor,
    services::{require_member, require_task_permission, Permission},
    state::AppState,
    types::{CommentResponse, CreateCommentRequest, ListCommentsResponse},
    validation::validate_comment,
    ws::WsState,
};

/// GET /api/v1/tasks/{id}/comments - List a task's comments, oldest first
#[utoipa::path(
    get,
    path = "/api/v1/tasks/{id}/comments",
    tag = "Comments",
    params(
        ("id" = i64, Path, description = "Task ID"),
        ("X-User-Id" = i64, Header, description = "Acting user"),
    ),
    responses(
        (status = 200, description = "Task comments", body = ListCommentsResponse),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Not a member of the task's project", body = ApiError),
        (status = 404, description = "Task not found", body = ApiError),
    ),
)]
pub async fn list_comments(
    State(storage): State<SharedStorage>,
    State(registry): State<Arc<RoleRegistry>>,
    ActorExtractor(actor): ActorExtractor,
    Path(task_id): Path<TaskId>,
) -> ApiResult<impl IntoResponse> {
    require_task_permission(&storage, &registry, task_id, actor.user_id, Permission::View).await?;

    let comments = storage.comment_list(task_id).await?;

    Ok(Json(ListCommentsResponse {
        comments: comments.into_iter().map(CommentResponse::from).collect(),
    }))
}

/// POST /api/v1/tasks/{id}/comments - Add a comment
#[utoipa::path(
    post,
    path = "/api/v1/tasks/{id}/comments",
    tag = "Comments",
    params(
        ("id" = i64, Path, description = "Task ID"),
        ("X-User-Id" = i64, Header, description = "Acting user"),
    ),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment added", body = CommentResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Not a member of the task's project", body = ApiError),
        (status = 404, description = "Task not found", body = ApiError),
    ),
)]
pub async fn add_comment(
    State(storage): State<SharedStorage>,
    State(registry): State<Arc<RoleRegistry>>,
    State(ws): State<Arc<WsState>>,
    ActorExtractor(actor): ActorExtractor,
    Path(task_id): Path<TaskId>,
    Json(req): Json<CreateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_comment(&req.content)?;
    let (task, _) = require_task_permission(
        &storage,
        &registry,
        task_id,
        actor.user_id,
        Permission::Comment,
    )
    .await?;

    let comment = storage
        .comment_insert(&NewComment {
            task_id,
            author_id: actor.user_id,
            content: req.content,
        })
        .await?;

    let response = CommentResponse::from(comment);
    ws.broadcast(WsEvent::CommentAdded {
        project_id: task.project_id,
        comment: response.clone(),
    });

    Ok((StatusCode::CREATED, Json(response)))
}

/// DELETE /api/v1/comments/{id} - Delete a comment
///
/// Authors may delete their own comments; Owner and Admin may delete any.
#[utoipa::path(
    delete,
    path = "/api/v1/comments/{id}",
    tag = "Comments",
    params(
        ("id" = i64, Path, description = "Comment ID"),
        ("X-User-Id" = i64, Header, description = "Acting user"),
    ),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Not the author, Owner or Admin", body = ApiError),
        (status = 404, description = "Comment not found", body = ApiError),
    ),
)]
pub async fn delete_comment(
    State(storage): State<SharedStorage>,
    State(registry): State<Arc<RoleRegistry>>,
    State(ws): State<Arc<WsState>>,
    ActorExtractor(actor): ActorExtractor,
    Path(id): Path<CommentId>,
) -> ApiResult<StatusCode> {
    let comment = storage
        .comment_get(id)
        .await?
        .ok_or_else(|| ApiError::entity_not_found("TaskComment", id))?;
    let task = storage
        .task_get(comment.task_id)
        .await?
        .ok_or_else(|| ApiError::entity_not_found("Task", comment.task_id))?;

    let membership = require_member(&storage, &registry, task.project_id, actor.user_id).await?;
    if comment.author_id != actor.user_id && !membership.role.can_manage_members() {
        return Err(ApiError::forbidden(
            "Only the author, an Owner or an Admin can delete this comment",
        ));
    }

    storage.comment_delete(id).await?;

    ws.broadcast(WsEvent::CommentDeleted {
        project_id: task.project_id,
        task_id: task.task_id,
        comment_id: id,
    });

    Ok(StatusCode::NO_CONTENT)
}

/// Routes merged into the `/tasks` router.
pub fn task_router() -> Router<AppState> {
    Router::new().route("/:id/comments", get(list_comments).post(add_comment))
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/:id", delete(delete_comment))
}
