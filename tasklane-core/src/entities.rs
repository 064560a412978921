//! Entity records persisted by the storage layer.

use crate::{
    CommentId, ProjectId, ProjectMemberId, RoleCode, RoleId, TaskAssigneeId, TaskId,
    TaskPriority, TaskStatus, Timestamp, UserId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// USERS
// ============================================================================

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct User {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = DateTime))]
    pub created_at: Timestamp,
}

// ============================================================================
// MEMBER ROLES
// ============================================================================

/// A membership role resolved against the closed [`RoleCode`] set.
///
/// This is the record the role registry caches and hands out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MemberRole {
    pub role_id: RoleId,
    pub code: RoleCode,
    pub description: Option<String>,
}

/// A raw `member_roles` reference-data row.
///
/// The code is kept as text because the table can hold values the
/// [`RoleCode`] enum does not know about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRoleRow {
    pub role_id: RoleId,
    pub code: String,
    pub description: Option<String>,
}

impl MemberRoleRow {
    pub fn new(role_id: RoleId, code: impl Into<String>) -> Self {
        Self {
            role_id,
            code: code.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

// ============================================================================
// PROJECTS
// ============================================================================

/// A project: the container for tasks and members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Project {
    pub project_id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: UserId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = DateTime))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = DateTime))]
    pub updated_at: Timestamp,
}

/// Association row: a user's membership in a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ProjectMember {
    pub id: ProjectMemberId,
    pub role_id: RoleId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = DateTime))]
    pub joined_at: Timestamp,
}

impl ProjectMember {
    pub fn project_id(&self) -> ProjectId {
        self.id.project_id()
    }

    pub fn user_id(&self) -> UserId {
        self.id.user_id()
    }
}

// ============================================================================
// TASKS
// ============================================================================

/// A unit of work inside a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Task {
    pub task_id: TaskId,
    pub project_id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    pub created_by: UserId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = DateTime))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = DateTime))]
    pub updated_at: Timestamp,
}

/// Association row: a user assigned to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TaskAssignee {
    pub id: TaskAssigneeId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = DateTime))]
    pub assigned_at: Timestamp,
}

impl TaskAssignee {
    pub fn task_id(&self) -> TaskId {
        self.id.task_id()
    }

    pub fn user_id(&self) -> UserId {
        self.id.user_id()
    }
}

/// A comment left on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TaskComment {
    pub comment_id: CommentId,
    pub task_id: TaskId,
    pub author_id: UserId,
    pub content: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = DateTime))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = DateTime))]
    pub updated_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::now;

    #[test]
    fn test_member_accessors_follow_key() {
        let member = ProjectMember {
            id: ProjectMemberId::new(5, 9),
            role_id: 3,
            joined_at: now(),
        };
        assert_eq!(member.project_id(), 5);
        assert_eq!(member.user_id(), 9);
    }

    #[test]
    fn test_assignee_accessors_follow_key() {
        let assignee = TaskAssignee {
            id: TaskAssigneeId::new(40, 2),
            assigned_at: now(),
        };
        assert_eq!(assignee.task_id(), 40);
        assert_eq!(assignee.user_id(), 2);
    }

    #[test]
    fn test_member_role_row_builder() {
        let row = MemberRoleRow::new(1, "OWNER").with_description("Project owner");
        assert_eq!(row.role_id, 1);
        assert_eq!(row.code, "OWNER");
        assert_eq!(row.description.as_deref(), Some("Project owner"));
    }

    #[cfg(feature = "openapi")]
    #[test]
    fn test_timestamps_document_as_date_time_strings() -> Result<(), serde_json::Error> {
        use utoipa::PartialSchema;

        let schema = serde_json::to_value(Task::schema())?;
        for field in ["created_at", "updated_at"] {
            let property = &schema["properties"][field];
            assert_eq!(property["type"], "string", "{}", field);
            assert_eq!(property["format"], "date-time", "{}", field);
        }

        let schema = serde_json::to_value(ProjectMember::schema())?;
        assert_eq!(schema["properties"]["joined_at"]["format"], "date-time");
        Ok(())
    }
}
