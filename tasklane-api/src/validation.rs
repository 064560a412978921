//! Validation Traits
//!
//! Request validation shared by the route handlers.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ApiError, ApiResult};
use crate::types::{UpdateProjectRequest, UpdateTaskRequest};

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 50;
pub const NAME_MAX_LEN: usize = 200;
pub const COMMENT_MAX_LEN: usize = 10_000;

static USERNAME_PATTERN: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$"));

static EMAIL_PATTERN: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$"));

fn pattern(lazy: &'static Lazy<Result<Regex, regex::Error>>) -> ApiResult<&'static Regex> {
    lazy.as_ref()
        .map_err(|e| ApiError::internal_error(format!("Invalid validation pattern: {}", e)))
}

/// Trait for validating non-empty strings.
pub trait ValidateNonEmpty {
    /// Fails with `ApiError::missing_field` for an empty or whitespace-only value.
    fn validate_non_empty(&self, field_name: &str) -> ApiResult<()>;
}

impl ValidateNonEmpty for str {
    fn validate_non_empty(&self, field_name: &str) -> ApiResult<()> {
        if self.trim().is_empty() {
            return Err(ApiError::missing_field(field_name));
        }
        Ok(())
    }
}

impl ValidateNonEmpty for String {
    fn validate_non_empty(&self, field_name: &str) -> ApiResult<()> {
        self.as_str().validate_non_empty(field_name)
    }
}

/// Trait for validating string length in characters.
pub trait ValidateLength {
    fn validate_length(&self, field_name: &str, min: usize, max: usize) -> ApiResult<()>;
}

impl ValidateLength for str {
    fn validate_length(&self, field_name: &str, min: usize, max: usize) -> ApiResult<()> {
        let len = self.chars().count();
        if len < min || len > max {
            return Err(ApiError::invalid_range(field_name, min, max).with_details(
                serde_json::json!({ "field": field_name, "length": len }),
            ));
        }
        Ok(())
    }
}

/// Trait for checking if an update request has any fields set.
pub trait HasUpdates {
    fn has_any_updates(&self) -> bool;

    /// Validate that at least one update field is set.
    fn validate_has_updates(&self) -> ApiResult<()> {
        if !self.has_any_updates() {
            return Err(ApiError::invalid_input(
                "At least one field must be provided for update",
            ));
        }
        Ok(())
    }
}

impl HasUpdates for UpdateProjectRequest {
    fn has_any_updates(&self) -> bool {
        self.name.is_some() || self.description.is_some()
    }
}

impl HasUpdates for UpdateTaskRequest {
    fn has_any_updates(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.status.is_some()
            || self.priority.is_some()
            || self.due_date.is_some()
    }
}

// ============================================================================
// FIELD VALIDATORS
// ============================================================================

/// Usernames are 3 to 50 characters of letters, digits, `_`, `.` or `-`.
pub fn validate_username(username: &str) -> ApiResult<()> {
    username.validate_length("username", USERNAME_MIN_LEN, USERNAME_MAX_LEN)?;
    if !pattern(&USERNAME_PATTERN)?.is_match(username) {
        return Err(ApiError::invalid_format(
            "username",
            "letters, digits, '_', '.' or '-'",
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> ApiResult<()> {
    email.validate_non_empty("email")?;
    if email.len() > 254 || !pattern(&EMAIL_PATTERN)?.is_match(email) {
        return Err(ApiError::invalid_format("email", "an email address"));
    }
    Ok(())
}

/// Project names and task titles: non-blank, at most 200 characters.
pub fn validate_name(value: &str, field_name: &str) -> ApiResult<()> {
    value.validate_non_empty(field_name)?;
    value.validate_length(field_name, 1, NAME_MAX_LEN)
}

pub fn validate_comment(content: &str) -> ApiResult<()> {
    content.validate_non_empty("content")?;
    content.validate_length("content", 1, COMMENT_MAX_LEN)
}
