//! Identity types for Tasklane entities

use chrono::{DateTime, Timelike, Utc};

/// Row identifier assigned by the store (BIGSERIAL in Postgres).
pub type EntityId = i64;

/// Identifier of a user account.
pub type UserId = EntityId;

/// Identifier of a project.
pub type ProjectId = EntityId;

/// Identifier of a task.
pub type TaskId = EntityId;

/// Identifier of a task comment.
pub type CommentId = EntityId;

/// Identifier of a member role reference-data row.
pub type RoleId = EntityId;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Current wall-clock time, truncated to microseconds so values survive a
/// round trip through Postgres `TIMESTAMPTZ` unchanged.
pub fn now() -> Timestamp {
    let ts = Utc::now();
    ts.with_nanosecond(ts.timestamp_subsec_micros() * 1_000)
        .unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_has_microsecond_precision() {
        let ts = now();
        assert_eq!(ts.timestamp_subsec_nanos() % 1_000, 0);
    }
}
