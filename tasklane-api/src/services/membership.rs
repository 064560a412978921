//! Membership Service
//!
//! Resolves the acting user's membership in a project and checks it against
//! the permission an operation needs. Stored `role_id`s are translated to
//! role codes through the role registry.

use tasklane_core::{
    ProjectId, ProjectMember, ProjectMemberId, RoleCode, Task, TaskId, UserId,
};
use tasklane_storage::{RoleRegistry, SharedStorage};

use crate::error::{ApiError, ApiResult};

/// What an operation requires of the acting member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Read project data
    View,
    /// Add comments
    Comment,
    /// Create, edit and delete tasks and assignments
    EditTasks,
    /// Add, change and remove members; edit project settings
    ManageMembers,
    /// Delete the project
    ManageProject,
}

impl Permission {
    pub fn allows(&self, role: RoleCode) -> bool {
        match self {
            Permission::View => true,
            Permission::Comment => role.can_comment(),
            Permission::EditTasks => role.can_edit_tasks(),
            Permission::ManageMembers => role.can_manage_members(),
            Permission::ManageProject => role.can_manage_project(),
        }
    }
}

/// The acting user's membership with its resolved role.
#[derive(Debug, Clone, PartialEq)]
pub struct Membership {
    pub member: ProjectMember,
    pub role: RoleCode,
}

/// Look up `user_id`'s membership in an existing project.
///
/// Fails with 404 when the project does not exist and 403 when the user is
/// not a member.
pub async fn require_member(
    storage: &SharedStorage,
    registry: &RoleRegistry,
    project_id: ProjectId,
    user_id: UserId,
) -> ApiResult<Membership> {
    if storage.project_get(project_id).await?.is_none() {
        return Err(ApiError::entity_not_found("Project", project_id));
    }

    let member = storage
        .member_get(ProjectMemberId::new(project_id, user_id))
        .await?
        .ok_or_else(|| {
            ApiError::forbidden(format!(
                "User {} is not a member of project {}",
                user_id, project_id
            ))
        })?;

    let role = registry.code_for_id(member.role_id)?;
    Ok(Membership { member, role })
}

/// Like [`require_member`], additionally requiring `permission`.
pub async fn require_permission(
    storage: &SharedStorage,
    registry: &RoleRegistry,
    project_id: ProjectId,
    user_id: UserId,
    permission: Permission,
) -> ApiResult<Membership> {
    let membership = require_member(storage, registry, project_id, user_id).await?;
    if !permission.allows(membership.role) {
        tracing::debug!(
            project_id,
            user_id,
            role = %membership.role,
            ?permission,
            "Permission denied"
        );
        return Err(ApiError::forbidden(format!(
            "Role {} does not allow {:?} in project {}",
            membership.role, permission, project_id
        )));
    }
    Ok(membership)
}

/// Load a task and check `permission` on its project.
pub async fn require_task_permission(
    storage: &SharedStorage,
    registry: &RoleRegistry,
    task_id: TaskId,
    user_id: UserId,
    permission: Permission,
) -> ApiResult<(Task, Membership)> {
    let task = storage
        .task_get(task_id)
        .await?
        .ok_or_else(|| ApiError::entity_not_found("Task", task_id))?;
    let membership =
        require_permission(storage, registry, task.project_id, user_id, permission).await?;
    Ok((task, membership))
}
