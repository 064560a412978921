//! Task-related API types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tasklane_core::{
    ProjectId, Task, TaskAssignee, TaskId, TaskPriority, TaskStatus, Timestamp, UserId,
};

/// Request to create a task in a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    /// Defaults to TODO
    pub status: Option<TaskStatus>,
    /// Defaults to MEDIUM
    pub priority: Option<TaskPriority>,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date"))]
    pub due_date: Option<NaiveDate>,
}

/// Request to update a task. Absent fields are left unchanged; `null`
/// clears `description` or `due_date`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "super::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    #[serde(
        default,
        deserialize_with = "super::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date"))]
    pub due_date: Option<Option<NaiveDate>>,
}

/// Query parameters for listing a project's tasks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ListTasksRequest {
    pub status: Option<TaskStatus>,
    /// Only tasks assigned to this user
    pub assignee_id: Option<UserId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Task response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TaskResponse {
    pub task_id: TaskId,
    pub project_id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date"))]
    pub due_date: Option<NaiveDate>,
    pub created_by: UserId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            task_id: task.task_id,
            project_id: task.project_id,
            title: task.title,
            description: task.description,
            status: task.status,
            priority: task.priority,
            due_date: task.due_date,
            created_by: task.created_by,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// Response containing a page of tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ListTasksResponse {
    pub tasks: Vec<TaskResponse>,
}

// ============================================================================
// ASSIGNEES
// ============================================================================

/// Request to assign a project member to a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AssignTaskRequest {
    pub user_id: UserId,
}

/// Assignment response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AssigneeResponse {
    pub task_id: TaskId,
    pub user_id: UserId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub assigned_at: Timestamp,
}

impl From<TaskAssignee> for AssigneeResponse {
    fn from(assignee: TaskAssignee) -> Self {
        Self {
            task_id: assignee.task_id(),
            user_id: assignee.user_id(),
            assigned_at: assignee.assigned_at,
        }
    }
}

/// Response containing a task's assignees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ListAssigneesResponse {
    pub assignees: Vec<AssigneeResponse>,
}
