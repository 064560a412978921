//! Tasklane Storage - Storage Traits, In-Memory Store and Role Registry
//!
//! Defines the storage abstraction for Tasklane entities and the member role
//! registry that caches `member_roles` reference data. The Postgres
//! implementation lives in tasklane-api.

pub mod async_trait;
pub mod memory;
pub mod registry;

pub use async_trait::{AsyncStorageTrait, SharedStorage};
pub use memory::InMemoryStorage;
pub use registry::{default_role_rows, RoleRegistry, RoleRegistryConfig, RoleSource};

use chrono::NaiveDate;
use tasklane_core::{ProjectId, TaskId, TaskPriority, TaskStatus, UserId};

// ============================================================================
// INSERT TYPES
// ============================================================================

/// Insert payload for users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
}

/// Insert payload for projects. `owner_id` also becomes the owning member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub owner_id: UserId,
}

/// Insert payload for tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub project_id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    pub created_by: UserId,
}

/// Insert payload for task comments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub task_id: TaskId,
    pub author_id: UserId,
    pub content: String,
}

// ============================================================================
// UPDATE TYPES
// ============================================================================

/// Update payload for projects.
///
/// `description: Some(None)` clears the description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

impl ProjectUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

/// Update payload for tasks. The outer `Option` of a nullable field says
/// whether to touch it, the inner one is the new value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<Option<NaiveDate>>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
    }
}

// ============================================================================
// QUERY TYPES
// ============================================================================

/// Filter for listing the tasks of one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFilter {
    pub project_id: ProjectId,
    pub status: Option<TaskStatus>,
    /// Only tasks this user is assigned to.
    pub assignee_id: Option<UserId>,
    pub limit: i64,
    pub offset: i64,
}

impl TaskFilter {
    pub fn for_project(project_id: ProjectId) -> Self {
        Self {
            project_id,
            status: None,
            assignee_id: None,
            limit: i64::MAX,
            offset: 0,
        }
    }
}
