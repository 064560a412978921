//! Task comment API types

use serde::{Deserialize, Serialize};
use tasklane_core::{CommentId, TaskComment, TaskId, Timestamp, UserId};

/// Request to add a comment to a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateCommentRequest {
    pub content: String,
}

/// Comment response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CommentResponse {
    pub comment_id: CommentId,
    pub task_id: TaskId,
    pub author_id: UserId,
    pub content: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

impl From<TaskComment> for CommentResponse {
    fn from(comment: TaskComment) -> Self {
        Self {
            comment_id: comment.comment_id,
            task_id: comment.task_id,
            author_id: comment.author_id,
            content: comment.content,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

/// Response containing a task's comments, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ListCommentsResponse {
    pub comments: Vec<CommentResponse>,
}
