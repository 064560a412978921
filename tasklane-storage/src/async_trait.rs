//! Async storage trait for Tasklane entities.
//!
//! Implemented by the in-memory store in this crate and by the Postgres
//! client in tasklane-api. Every implementation is also a [`RoleSource`],
//! so the role registry can be initialized from whichever store is active.

use crate::{
    NewComment, NewProject, NewTask, NewUser, ProjectUpdate, RoleSource, TaskFilter, TaskUpdate,
};
use ::async_trait::async_trait;
use std::sync::Arc;
use tasklane_core::{
    CommentId, Project, ProjectId, ProjectMember, ProjectMemberId, RoleId, Task, TaskAssignee,
    TaskAssigneeId, TaskComment, TaskId, TasklaneResult, User, UserId,
};

/// Shared handle to the active storage backend.
pub type SharedStorage = Arc<dyn AsyncStorageTrait>;

/// Async storage trait for database operations.
///
/// `*_get` methods return `Ok(None)` for a missing row. Updates and deletes
/// of a missing row fail with `StorageError::NotFound`. Inserts fail with
/// `StorageError::NotFound` when a referenced row is missing and with
/// `StorageError::AlreadyExists` on a uniqueness conflict.
#[async_trait]
pub trait AsyncStorageTrait: RoleSource {
    // ========================================================================
    // USER OPERATIONS
    // ========================================================================

    /// Insert a new user. Usernames and emails are unique.
    async fn user_insert(&self, user: &NewUser) -> TasklaneResult<User>;

    /// Get a user by ID.
    async fn user_get(&self, id: UserId) -> TasklaneResult<Option<User>>;

    /// List users ordered by ID.
    async fn user_list(&self, limit: i64, offset: i64) -> TasklaneResult<Vec<User>>;

    // ========================================================================
    // PROJECT OPERATIONS
    // ========================================================================

    /// Insert a project and, atomically, its owner's membership with
    /// `owner_role_id`.
    async fn project_insert(
        &self,
        project: &NewProject,
        owner_role_id: RoleId,
    ) -> TasklaneResult<Project>;

    /// Get a project by ID.
    async fn project_get(&self, id: ProjectId) -> TasklaneResult<Option<Project>>;

    /// List the projects a user is a member of, ordered by ID.
    async fn project_list_for_user(&self, user_id: UserId) -> TasklaneResult<Vec<Project>>;

    /// Update a project's name or description.
    async fn project_update(
        &self,
        id: ProjectId,
        update: &ProjectUpdate,
    ) -> TasklaneResult<Project>;

    /// Delete a project with its members, tasks, assignees and comments.
    async fn project_delete(&self, id: ProjectId) -> TasklaneResult<()>;

    // ========================================================================
    // MEMBER OPERATIONS
    // ========================================================================

    /// Add a user to a project.
    async fn member_insert(
        &self,
        id: ProjectMemberId,
        role_id: RoleId,
    ) -> TasklaneResult<ProjectMember>;

    /// Get a membership by composite key.
    async fn member_get(&self, id: ProjectMemberId) -> TasklaneResult<Option<ProjectMember>>;

    /// List the members of a project ordered by user ID.
    async fn member_list(&self, project_id: ProjectId) -> TasklaneResult<Vec<ProjectMember>>;

    /// Change a member's role.
    async fn member_update_role(
        &self,
        id: ProjectMemberId,
        role_id: RoleId,
    ) -> TasklaneResult<ProjectMember>;

    /// Remove a member along with their assignments on the project's tasks.
    ///
    /// Returns the assignments that went with the member, ordered by task id.
    async fn member_delete(&self, id: ProjectMemberId) -> TasklaneResult<Vec<TaskAssigneeId>>;

    // ========================================================================
    // TASK OPERATIONS
    // ========================================================================

    /// Insert a new task.
    async fn task_insert(&self, task: &NewTask) -> TasklaneResult<Task>;

    /// Get a task by ID.
    async fn task_get(&self, id: TaskId) -> TasklaneResult<Option<Task>>;

    /// List a project's tasks matching `filter`, ordered by ID.
    async fn task_list(&self, filter: &TaskFilter) -> TasklaneResult<Vec<Task>>;

    /// Update task fields.
    async fn task_update(&self, id: TaskId, update: &TaskUpdate) -> TasklaneResult<Task>;

    /// Delete a task with its assignees and comments.
    async fn task_delete(&self, id: TaskId) -> TasklaneResult<()>;

    // ========================================================================
    // ASSIGNEE OPERATIONS
    // ========================================================================

    /// Assign a user to a task.
    async fn assignee_insert(&self, id: TaskAssigneeId) -> TasklaneResult<TaskAssignee>;

    /// List a task's assignees ordered by user ID.
    async fn assignee_list(&self, task_id: TaskId) -> TasklaneResult<Vec<TaskAssignee>>;

    /// Unassign a user from a task.
    async fn assignee_delete(&self, id: TaskAssigneeId) -> TasklaneResult<()>;

    // ========================================================================
    // COMMENT OPERATIONS
    // ========================================================================

    /// Insert a new comment.
    async fn comment_insert(&self, comment: &NewComment) -> TasklaneResult<TaskComment>;

    /// Get a comment by ID.
    async fn comment_get(&self, id: CommentId) -> TasklaneResult<Option<TaskComment>>;

    /// List a task's comments, oldest first.
    async fn comment_list(&self, task_id: TaskId) -> TasklaneResult<Vec<TaskComment>>;

    /// Delete a comment.
    async fn comment_delete(&self, id: CommentId) -> TasklaneResult<()>;

    // ========================================================================
    // HEALTH & DIAGNOSTICS
    // ========================================================================

    /// Check if the storage backend is reachable.
    async fn health_check(&self) -> TasklaneResult<bool>;
}
