//! Project Member REST API Routes
//!
//! Memberships are association rows keyed by `(project_id, user_id)`. Role
//! codes on the wire are translated to `role_id`s through the role registry.
//!
//! Rules:
//! - OWNER is never granted through these routes; a project has one owner.
//! - The owner's membership cannot be changed or removed.
//! - Any member may remove themselves; removing others needs Owner or Admin.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use std::sync::Arc;
use tasklane_core::{ProjectId, ProjectMember, ProjectMemberId, RoleCode, UserId};
use tasklane_storage::{RoleRegistry, SharedStorage};

use crate::{
    error::{ApiError, ApiResult},
    events::WsEvent,
    extractors::ActorExtractor,
    services::{require_member, require_permission, Permission},
    state::AppState,
    types::{AddMemberRequest, ListMembersResponse, MemberResponse, UpdateMemberRequest},
    ws::WsState,
};

fn reject_owner_grant(role: RoleCode) -> ApiResult<()> {
    if role == RoleCode::Owner {
        return Err(ApiError::invalid_input(
            "OWNER cannot be granted; a project has exactly one owner",
        ));
    }
    Ok(())
}

/// Load the target membership and refuse to touch the owner's.
async fn load_non_owner_member(
    storage: &SharedStorage,
    registry: &RoleRegistry,
    key: ProjectMemberId,
) -> ApiResult<ProjectMember> {
    let member = storage
        .member_get(key)
        .await?
        .ok_or_else(|| ApiError::entity_not_found("ProjectMember", key))?;

    if registry.code_for_id(member.role_id)? == RoleCode::Owner {
        return Err(ApiError::forbidden(format!(
            "The owner of project {} cannot be changed or removed",
            key.project_id()
        )));
    }
    Ok(member)
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /api/v1/projects/{id}/members - List members with their role codes
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}/members",
    tag = "Members",
    params(
        ("id" = i64, Path, description = "Project ID"),
        ("X-User-Id" = i64, Header, description = "Acting user"),
    ),
    responses(
        (status = 200, description = "Project members", body = ListMembersResponse),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Not a member of the project", body = ApiError),
        (status = 404, description = "Project not found", body = ApiError),
    ),
)]
pub async fn list_members(
    State(storage): State<SharedStorage>,
    State(registry): State<Arc<RoleRegistry>>,
    ActorExtractor(actor): ActorExtractor,
    Path(project_id): Path<ProjectId>,
) -> ApiResult<impl IntoResponse> {
    require_member(&storage, &registry, project_id, actor.user_id).await?;

    let members = storage
        .member_list(project_id)
        .await?
        .into_iter()
        .map(|member| {
            let role = registry.code_for_id(member.role_id)?;
            Ok(MemberResponse::new(member, role))
        })
        .collect::<ApiResult<Vec<_>>>()?;

    Ok(Json(ListMembersResponse { members }))
}

/// POST /api/v1/projects/{id}/members - Add a member
#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/members",
    tag = "Members",
    params(
        ("id" = i64, Path, description = "Project ID"),
        ("X-User-Id" = i64, Header, description = "Acting user"),
    ),
    request_body = AddMemberRequest,
    responses(
        (status = 201, description = "Member added", body = MemberResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Owner or Admin role required", body = ApiError),
        (status = 404, description = "Project or user not found", body = ApiError),
        (status = 409, description = "User is already a member", body = ApiError),
    ),
)]
pub async fn add_member(
    State(storage): State<SharedStorage>,
    State(registry): State<Arc<RoleRegistry>>,
    State(ws): State<Arc<WsState>>,
    ActorExtractor(actor): ActorExtractor,
    Path(project_id): Path<ProjectId>,
    Json(req): Json<AddMemberRequest>,
) -> ApiResult<impl IntoResponse> {
    reject_owner_grant(req.role)?;
    require_permission(
        &storage,
        &registry,
        project_id,
        actor.user_id,
        Permission::ManageMembers,
    )
    .await?;

    if storage.user_get(req.user_id).await?.is_none() {
        return Err(ApiError::entity_not_found("User", req.user_id));
    }

    let role_id = registry.get_role_id(req.role)?;
    let key = ProjectMemberId::new(project_id, req.user_id);
    let member = storage.member_insert(key, role_id).await?;

    tracing::info!(%key, role = %req.role, added_by = actor.user_id, "Member added");

    let response = MemberResponse::new(member, req.role);
    ws.broadcast(WsEvent::MemberAdded {
        member: response.clone(),
    });

    Ok((StatusCode::CREATED, Json(response)))
}

/// PATCH /api/v1/projects/{id}/members/{user_id} - Change a member's role
#[utoipa::path(
    patch,
    path = "/api/v1/projects/{id}/members/{user_id}",
    tag = "Members",
    params(
        ("id" = i64, Path, description = "Project ID"),
        ("user_id" = i64, Path, description = "Member user ID"),
        ("X-User-Id" = i64, Header, description = "Acting user"),
    ),
    request_body = UpdateMemberRequest,
    responses(
        (status = 200, description = "Role changed", body = MemberResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Owner or Admin role required, or target is the owner", body = ApiError),
        (status = 404, description = "Project or member not found", body = ApiError),
    ),
)]
pub async fn update_member(
    State(storage): State<SharedStorage>,
    State(registry): State<Arc<RoleRegistry>>,
    State(ws): State<Arc<WsState>>,
    ActorExtractor(actor): ActorExtractor,
    Path((project_id, user_id)): Path<(ProjectId, UserId)>,
    Json(req): Json<UpdateMemberRequest>,
) -> ApiResult<impl IntoResponse> {
    reject_owner_grant(req.role)?;
    require_permission(
        &storage,
        &registry,
        project_id,
        actor.user_id,
        Permission::ManageMembers,
    )
    .await?;

    let key = ProjectMemberId::new(project_id, user_id);
    load_non_owner_member(&storage, &registry, key).await?;

    let role_id = registry.get_role_id(req.role)?;
    let member = storage.member_update_role(key, role_id).await?;

    let response = MemberResponse::new(member, req.role);
    ws.broadcast(WsEvent::MemberRoleChanged {
        member: response.clone(),
    });

    Ok(Json(response))
}

/// DELETE /api/v1/projects/{id}/members/{user_id} - Remove a member
///
/// The member's task assignments in the project go with it, each announced
/// as `TaskUnassigned` ahead of `MemberRemoved`.
#[utoipa::path(
    delete,
    path = "/api/v1/projects/{id}/members/{user_id}",
    tag = "Members",
    params(
        ("id" = i64, Path, description = "Project ID"),
        ("user_id" = i64, Path, description = "Member user ID"),
        ("X-User-Id" = i64, Header, description = "Acting user"),
    ),
    responses(
        (status = 204, description = "Member removed"),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Owner or Admin role required, or target is the owner", body = ApiError),
        (status = 404, description = "Project or member not found", body = ApiError),
    ),
)]
pub async fn remove_member(
    State(storage): State<SharedStorage>,
    State(registry): State<Arc<RoleRegistry>>,
    State(ws): State<Arc<WsState>>,
    ActorExtractor(actor): ActorExtractor,
    Path((project_id, user_id)): Path<(ProjectId, UserId)>,
) -> ApiResult<StatusCode> {
    if actor.user_id == user_id {
        require_member(&storage, &registry, project_id, actor.user_id).await?;
    } else {
        require_permission(
            &storage,
            &registry,
            project_id,
            actor.user_id,
            Permission::ManageMembers,
        )
        .await?;
    }

    let key = ProjectMemberId::new(project_id, user_id);
    load_non_owner_member(&storage, &registry, key).await?;
    let dropped = storage.member_delete(key).await?;

    tracing::info!(
        %key,
        removed_by = actor.user_id,
        unassigned = dropped.len(),
        "Member removed"
    );
    // Unassignments go first so a session losing the project topic still sees them.
    for assignment in dropped {
        ws.broadcast(WsEvent::TaskUnassigned {
            project_id,
            task_id: assignment.task_id(),
            user_id: assignment.user_id(),
        });
    }
    ws.broadcast(WsEvent::MemberRemoved {
        project_id,
        user_id,
    });

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// ROUTER
// ============================================================================

/// Member routes, merged into the `/projects` router.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/:id/members", get(list_members).post(add_member))
        .route(
            "/:id/members/:user_id",
            patch(update_member).delete(remove_member),
        )
}
