//! OpenAPI Specification for the Tasklane API
//!
//! Builds the OpenAPI document from the route annotations and the request
//! and response types with utoipa.

use utoipa::OpenApi;

use crate::error::{ApiError, ErrorCode};
use crate::routes::{assignee, comment, health, member, project, role, task, user};
use crate::types::*;

use tasklane_core::{MemberRole, RoleCode, TaskPriority, TaskStatus};

/// OpenAPI document for the Tasklane API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tasklane API",
        version = "0.1.0",
        description = "Projects, members with roles, tasks, assignees and comments, with real-time change notifications over WebSocket topics",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "Users", description = "User accounts"),
        (name = "Projects", description = "Projects and their settings"),
        (name = "Members", description = "Project membership with role codes"),
        (name = "Tasks", description = "Tasks inside a project"),
        (name = "Assignees", description = "Users assigned to tasks"),
        (name = "Comments", description = "Task discussion"),
        (name = "Roles", description = "Member role reference data"),
        (name = "Health", description = "Liveness and readiness checks"),
        (name = "Observability", description = "Prometheus metrics")
    ),
    paths(
        // Users
        user::create_user,
        user::list_users,
        user::get_user,
        // Projects
        project::create_project,
        project::list_projects,
        project::get_project,
        project::update_project,
        project::delete_project,
        // Members
        member::list_members,
        member::add_member,
        member::update_member,
        member::remove_member,
        // Tasks
        task::list_tasks,
        task::create_task,
        task::get_task,
        task::update_task,
        task::delete_task,
        // Assignees
        assignee::list_assignees,
        assignee::assign_task,
        assignee::unassign_task,
        // Comments
        comment::list_comments,
        comment::add_comment,
        comment::delete_comment,
        // Roles
        role::list_roles,
        // Health
        health::ping,
        health::liveness,
        health::readiness,
        // Metrics
        crate::telemetry::metrics::metrics_handler,
    ),
    components(
        schemas(
            // Errors
            ApiError,
            ErrorCode,
            // Domain enums
            RoleCode,
            TaskStatus,
            TaskPriority,
            MemberRole,
            // Pagination
            PageParams,
            // Users
            CreateUserRequest,
            UserResponse,
            ListUsersResponse,
            // Projects
            CreateProjectRequest,
            UpdateProjectRequest,
            ProjectResponse,
            ListProjectsResponse,
            // Members
            AddMemberRequest,
            UpdateMemberRequest,
            MemberResponse,
            ListMembersResponse,
            // Tasks
            CreateTaskRequest,
            UpdateTaskRequest,
            ListTasksRequest,
            TaskResponse,
            ListTasksResponse,
            AssignTaskRequest,
            AssigneeResponse,
            ListAssigneesResponse,
            // Comments
            CreateCommentRequest,
            CommentResponse,
            ListCommentsResponse,
            // Roles
            ListRolesResponse,
            // Health
            health::HealthResponse,
            health::HealthStatus,
            health::HealthDetails,
            health::ComponentHealth,
        )
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Generate OpenAPI spec as JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        let openapi = Self::openapi();
        serde_json::to_string_pretty(&openapi)
    }

    /// Generate OpenAPI spec as YAML string.
    #[cfg(feature = "openapi")]
    pub fn to_yaml() -> Result<String, String> {
        let openapi = Self::openapi();
        serde_yaml::to_string(&openapi).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_generation() -> Result<(), String> {
        let openapi = ApiDoc::openapi();

        assert_eq!(openapi.info.title, "Tasklane API");
        assert_eq!(openapi.info.version, "0.1.0");

        let tags = openapi
            .tags
            .as_ref()
            .ok_or_else(|| "OpenAPI tags missing".to_string())?;
        assert_eq!(tags.len(), 9);

        let components = openapi
            .components
            .as_ref()
            .ok_or_else(|| "OpenAPI components missing".to_string())?;
        assert!(components.schemas.contains_key("RoleCode"));
        assert!(components.schemas.contains_key("MemberResponse"));
        Ok(())
    }

    #[test]
    fn test_openapi_json_serialization() -> Result<(), String> {
        let json = ApiDoc::to_json().map_err(|e| format!("Failed to serialize OpenAPI: {}", e))?;

        serde_json::from_str::<serde_json::Value>(&json)
            .map_err(|e| format!("Generated JSON invalid: {}", e))?;

        assert!(json.contains("Tasklane API"));
        assert!(json.contains("X-User-Id"));
        Ok(())
    }

    #[cfg(feature = "openapi")]
    #[test]
    fn test_openapi_yaml_serialization() -> Result<(), String> {
        let yaml = ApiDoc::to_yaml()?;
        assert!(yaml.contains("openapi:"));
        assert!(yaml.contains("/api/v1/projects/{id}/members/{user_id}"));
        Ok(())
    }

    #[test]
    fn test_openapi_paths_exist() {
        let openapi = ApiDoc::openapi();
        let paths = &openapi.paths.paths;

        assert!(paths.contains_key("/api/v1/users"));
        assert!(paths.contains_key("/api/v1/users/{id}"));
        assert!(paths.contains_key("/api/v1/projects"));
        assert!(paths.contains_key("/api/v1/projects/{id}"));
        assert!(paths.contains_key("/api/v1/projects/{id}/members"));
        assert!(paths.contains_key("/api/v1/projects/{id}/members/{user_id}"));
        assert!(paths.contains_key("/api/v1/projects/{id}/tasks"));
        assert!(paths.contains_key("/api/v1/tasks/{id}"));
        assert!(paths.contains_key("/api/v1/tasks/{id}/assignees"));
        assert!(paths.contains_key("/api/v1/tasks/{id}/assignees/{user_id}"));
        assert!(paths.contains_key("/api/v1/tasks/{id}/comments"));
        assert!(paths.contains_key("/api/v1/comments/{id}"));
        assert!(paths.contains_key("/api/v1/roles"));
        assert!(paths.contains_key("/health/ready"));
        assert!(paths.contains_key("/metrics"));
    }
}
