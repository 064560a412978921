//! Enum types for Tasklane entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// ROLE CODES
// ============================================================================

/// Closed set of project membership roles.
///
/// Every code is mirrored by one row of `member_roles` reference data. The
/// persisted table may lag behind this enum; lookups for a code without a row
/// fail in the role registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleCode {
    /// Created the project; full control, cannot be removed
    Owner,
    /// Manages members and project settings
    Admin,
    /// Creates and edits tasks
    Member,
    /// Read-only access plus comments
    Viewer,
}

impl RoleCode {
    /// Every role code, in descending order of privilege.
    pub const ALL: [RoleCode; 4] = [
        RoleCode::Owner,
        RoleCode::Admin,
        RoleCode::Member,
        RoleCode::Viewer,
    ];

    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            RoleCode::Owner => "OWNER",
            RoleCode::Admin => "ADMIN",
            RoleCode::Member => "MEMBER",
            RoleCode::Viewer => "VIEWER",
        }
    }

    /// Parse from database string representation (case-insensitive).
    pub fn from_db_str(s: &str) -> Result<Self, RoleCodeParseError> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OWNER" => Ok(RoleCode::Owner),
            "ADMIN" => Ok(RoleCode::Admin),
            "MEMBER" => Ok(RoleCode::Member),
            "VIEWER" => Ok(RoleCode::Viewer),
            _ => Err(RoleCodeParseError(s.to_string())),
        }
    }

    /// Rename the project or delete it.
    pub fn can_manage_project(&self) -> bool {
        matches!(self, RoleCode::Owner)
    }

    /// Add, remove, and re-role members; edit project details.
    pub fn can_manage_members(&self) -> bool {
        matches!(self, RoleCode::Owner | RoleCode::Admin)
    }

    /// Create, edit, delete, and assign tasks.
    pub fn can_edit_tasks(&self) -> bool {
        matches!(self, RoleCode::Owner | RoleCode::Admin | RoleCode::Member)
    }

    /// Post comments on tasks.
    pub fn can_comment(&self) -> bool {
        true
    }
}

impl fmt::Display for RoleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

impl FromStr for RoleCode {
    type Err = RoleCodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an unknown role code string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleCodeParseError(pub String);

impl fmt::Display for RoleCodeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid role code: {}", self.0)
    }
}

impl std::error::Error for RoleCodeParseError {}

// ============================================================================
// TASK ENUMS
// ============================================================================

/// Workflow status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    InReview,
    Done,
}

impl TaskStatus {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::InReview => "IN_REVIEW",
            TaskStatus::Done => "DONE",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, EnumParseError> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TODO" => Ok(TaskStatus::Todo),
            "IN_PROGRESS" => Ok(TaskStatus::InProgress),
            "IN_REVIEW" => Ok(TaskStatus::InReview),
            "DONE" => Ok(TaskStatus::Done),
            _ => Err(EnumParseError::new("task status", s)),
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

impl FromStr for TaskStatus {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Priority of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "LOW",
            TaskPriority::Medium => "MEDIUM",
            TaskPriority::High => "HIGH",
            TaskPriority::Urgent => "URGENT",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, EnumParseError> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(TaskPriority::Low),
            "MEDIUM" => Ok(TaskPriority::Medium),
            "HIGH" => Ok(TaskPriority::High),
            "URGENT" => Ok(TaskPriority::Urgent),
            _ => Err(EnumParseError::new("task priority", s)),
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

impl FromStr for TaskPriority {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when a stored string does not name a variant of a task enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumParseError {
    pub kind: &'static str,
    pub value: String,
}

impl EnumParseError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for EnumParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid {}: {}", self.kind, self.value)
    }
}

impl std::error::Error for EnumParseError {}

// ============================================================================
// ENTITY TYPE
// ============================================================================

/// Entity type discriminator used in errors and change events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum EntityType {
    User,
    Project,
    ProjectMember,
    MemberRole,
    Task,
    TaskAssignee,
    TaskComment,
}

impl EntityType {
    /// Human-readable name used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::User => "User",
            EntityType::Project => "Project",
            EntityType::ProjectMember => "ProjectMember",
            EntityType::MemberRole => "MemberRole",
            EntityType::Task => "Task",
            EntityType::TaskAssignee => "TaskAssignee",
            EntityType::TaskComment => "TaskComment",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
