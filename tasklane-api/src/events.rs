//! WebSocket Event Types
//!
//! Every mutation on projects, members, tasks, assignees and comments
//! produces one of these events. Each event names the topics it belongs to;
//! a WebSocket session only receives events for topics it subscribed to.

use crate::types::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tasklane_core::{CommentId, ProjectId, TaskId, UserId};
use uuid::Uuid;

/// WebSocket event types for real-time updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsEvent {
    // ========================================================================
    // PROJECT EVENTS
    // ========================================================================
    ProjectCreated {
        project: ProjectResponse,
    },

    ProjectUpdated {
        project: ProjectResponse,
    },

    ProjectDeleted {
        project_id: ProjectId,
    },

    // ========================================================================
    // MEMBER EVENTS
    // ========================================================================
    MemberAdded {
        member: MemberResponse,
    },

    MemberRoleChanged {
        member: MemberResponse,
    },

    MemberRemoved {
        project_id: ProjectId,
        user_id: UserId,
    },

    // ========================================================================
    // TASK EVENTS
    // ========================================================================
    TaskCreated {
        task: TaskResponse,
    },

    TaskUpdated {
        task: TaskResponse,
    },

    TaskDeleted {
        project_id: ProjectId,
        task_id: TaskId,
    },

    /// A user was assigned to a task.
    TaskAssigned {
        project_id: ProjectId,
        assignee: AssigneeResponse,
    },

    TaskUnassigned {
        project_id: ProjectId,
        task_id: TaskId,
        user_id: UserId,
    },

    // ========================================================================
    // COMMENT EVENTS
    // ========================================================================
    CommentAdded {
        project_id: ProjectId,
        comment: CommentResponse,
    },

    CommentDeleted {
        project_id: ProjectId,
        task_id: TaskId,
        comment_id: CommentId,
    },

    // ========================================================================
    // CONNECTION EVENTS
    // ========================================================================
    /// Sent once when a session opens.
    Connected {
        session_id: Uuid,
    },

    Subscribed {
        topic: String,
    },

    Unsubscribed {
        topic: String,
    },

    /// Sent before the server closes a session.
    Disconnected {
        reason: String,
    },

    /// A client frame was rejected or the session lagged behind.
    Error {
        message: String,
    },
}

impl WsEvent {
    /// Get the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            WsEvent::ProjectCreated { .. } => "ProjectCreated",
            WsEvent::ProjectUpdated { .. } => "ProjectUpdated",
            WsEvent::ProjectDeleted { .. } => "ProjectDeleted",
            WsEvent::MemberAdded { .. } => "MemberAdded",
            WsEvent::MemberRoleChanged { .. } => "MemberRoleChanged",
            WsEvent::MemberRemoved { .. } => "MemberRemoved",
            WsEvent::TaskCreated { .. } => "TaskCreated",
            WsEvent::TaskUpdated { .. } => "TaskUpdated",
            WsEvent::TaskDeleted { .. } => "TaskDeleted",
            WsEvent::TaskAssigned { .. } => "TaskAssigned",
            WsEvent::TaskUnassigned { .. } => "TaskUnassigned",
            WsEvent::CommentAdded { .. } => "CommentAdded",
            WsEvent::CommentDeleted { .. } => "CommentDeleted",
            WsEvent::Connected { .. } => "Connected",
            WsEvent::Subscribed { .. } => "Subscribed",
            WsEvent::Unsubscribed { .. } => "Unsubscribed",
            WsEvent::Disconnected { .. } => "Disconnected",
            WsEvent::Error { .. } => "Error",
        }
    }

    /// Session-level events are written to one socket, never broadcast.
    pub fn is_connection_event(&self) -> bool {
        matches!(
            self,
            WsEvent::Connected { .. }
                | WsEvent::Subscribed { .. }
                | WsEvent::Unsubscribed { .. }
                | WsEvent::Disconnected { .. }
                | WsEvent::Error { .. }
        )
    }

    /// Topics this event is published on.
    pub fn topics(&self) -> Vec<Topic> {
        match self {
            WsEvent::ProjectCreated { project } | WsEvent::ProjectUpdated { project } => {
                vec![Topic::Project(project.project_id)]
            }
            WsEvent::ProjectDeleted { project_id }
            | WsEvent::MemberRemoved { project_id, .. }
            | WsEvent::TaskDeleted { project_id, .. }
            | WsEvent::CommentAdded { project_id, .. }
            | WsEvent::CommentDeleted { project_id, .. } => vec![Topic::Project(*project_id)],
            WsEvent::MemberAdded { member } | WsEvent::MemberRoleChanged { member } => {
                vec![Topic::Project(member.project_id)]
            }
            WsEvent::TaskCreated { task } | WsEvent::TaskUpdated { task } => {
                vec![Topic::Project(task.project_id)]
            }
            WsEvent::TaskAssigned {
                project_id,
                assignee,
            } => vec![Topic::Project(*project_id), Topic::User(assignee.user_id)],
            WsEvent::TaskUnassigned {
                project_id,
                user_id,
                ..
            } => vec![Topic::Project(*project_id), Topic::User(*user_id)],
            WsEvent::Connected { .. }
            | WsEvent::Subscribed { .. }
            | WsEvent::Unsubscribed { .. }
            | WsEvent::Disconnected { .. }
            | WsEvent::Error { .. } => Vec::new(),
        }
    }
}

// ============================================================================
// TOPICS
// ============================================================================

/// A subscription channel: `projects/{id}` or `users/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Project(ProjectId),
    User(UserId),
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Project(id) => write!(f, "projects/{}", id),
            Topic::User(id) => write!(f, "users/{}", id),
        }
    }
}

impl FromStr for Topic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("Invalid topic '{}': expected projects/<id> or users/<id>", s);
        let (kind, id) = s.trim().split_once('/').ok_or_else(invalid)?;
        let id = id.parse::<i64>().map_err(|_| invalid())?;
        match kind {
            "projects" => Ok(Topic::Project(id)),
            "users" => Ok(Topic::User(id)),
            _ => Err(invalid()),
        }
    }
}
