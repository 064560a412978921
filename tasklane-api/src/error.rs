//! HTTP error surface.
//!
//! Every failed request answers with a JSON body `{ code, message, details? }`.
//! The `code` decides the status line; handlers never pick a status directly.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tasklane_core::{RegistryError, StorageError, TasklaneError, ValidationError};

/// Machine-readable failure category carried in every error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// No usable `X-User-Id`, or it names nobody.
    Unauthorized,
    /// Caller is known but their project role does not allow the action.
    Forbidden,

    ValidationFailed,
    InvalidInput,
    MissingField,
    InvalidRange,
    InvalidFormat,

    EntityNotFound,
    EntityAlreadyExists,

    InternalError,
    DatabaseError,
    /// Member role reference data does not line up with the role codes.
    RoleRegistryError,
    ServiceUnavailable,
    /// Timed out waiting for a pooled connection.
    ConnectionPoolExhausted,
}

impl ErrorCode {
    pub fn status_code(&self) -> StatusCode {
        use ErrorCode::*;
        match self {
            Unauthorized => StatusCode::UNAUTHORIZED,
            Forbidden => StatusCode::FORBIDDEN,
            ValidationFailed | InvalidInput | MissingField | InvalidRange | InvalidFormat => {
                StatusCode::BAD_REQUEST
            }
            EntityNotFound => StatusCode::NOT_FOUND,
            EntityAlreadyExists => StatusCode::CONFLICT,
            ServiceUnavailable | ConnectionPoolExhausted => StatusCode::SERVICE_UNAVAILABLE,
            InternalError | DatabaseError | RoleRegistryError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Fallback message when a call site has nothing more specific to say.
    pub fn default_message(&self) -> &'static str {
        use ErrorCode::*;
        match self {
            Unauthorized => "Caller could not be identified",
            Forbidden => "Role does not permit this action",
            ValidationFailed => "Request failed validation",
            InvalidInput => "Request body could not be used",
            MissingField => "A required field was not supplied",
            InvalidRange => "A value fell outside its allowed bounds",
            InvalidFormat => "A value was not in the expected shape",
            EntityNotFound => "No such record",
            EntityAlreadyExists => "Record already present",
            InternalError => "Unexpected server fault",
            DatabaseError => "Store rejected the operation",
            RoleRegistryError => "Member roles are not available",
            ServiceUnavailable => "Backend is not reachable right now",
            ConnectionPoolExhausted => "No store connection free",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Same spelling as the wire form.
        let wire = serde_json::to_value(self).map_err(|_| fmt::Error)?;
        f.write_str(wire.as_str().unwrap_or("UNKNOWN"))
    }
}

/// JSON body returned for any non-2xx answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    /// Structured context, such as the bounds of a range check.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn from_code(code: ErrorCode) -> Self {
        ApiError::new(code, code.default_message())
    }

    pub fn with_details(self, details: serde_json::Value) -> Self {
        ApiError {
            details: Some(details),
            ..self
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Forbidden, message)
    }

    pub fn validation_failed(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationFailed, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::InvalidInput, message)
    }

    pub fn missing_field(field: &str) -> Self {
        ApiError::new(ErrorCode::MissingField, format!("`{}` is required", field))
    }

    pub fn invalid_range(field: &str, min: impl fmt::Display, max: impl fmt::Display) -> Self {
        ApiError::new(
            ErrorCode::InvalidRange,
            format!("`{}` must lie in {}..={}", field, min, max),
        )
    }

    pub fn invalid_format(field: &str, expected: &str) -> Self {
        ApiError::new(
            ErrorCode::InvalidFormat,
            format!("`{}` should be {}", field, expected),
        )
    }

    /// `entity` is the display name, e.g. "Task"; `id` may be a composite key.
    pub fn entity_not_found(entity: &str, id: impl fmt::Display) -> Self {
        ApiError::new(ErrorCode::EntityNotFound, format!("{} {} does not exist", entity, id))
    }

    pub fn entity_already_exists(entity: &str, id: impl fmt::Display) -> Self {
        ApiError::new(
            ErrorCode::EntityAlreadyExists,
            format!("{} {} is already present", entity, id),
        )
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::InternalError, message)
    }

    pub fn database_error(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::DatabaseError, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ServiceUnavailable, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { entity_type, id } => {
                ApiError::entity_not_found(entity_type.as_str(), id)
            }
            StorageError::AlreadyExists { entity_type, id } => {
                ApiError::entity_already_exists(entity_type.as_str(), id)
            }
            StorageError::ConnectionFailed { .. } => {
                tracing::error!(error = %err, "Storage connection failed");
                ApiError::service_unavailable("Storage backend is unavailable")
            }
            other => {
                tracing::error!(error = %other, "Storage operation failed");
                ApiError::database_error(other.to_string())
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::RequiredFieldMissing { field } => ApiError::missing_field(&field),
            other => ApiError::validation_failed(other.to_string()),
        }
    }
}

/// Registry misses are server faults: either the reference data drifted from
/// the role codes or the registry was never initialized.
impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        tracing::error!(error = %err, "Member role registry lookup failed");
        ApiError::new(ErrorCode::RoleRegistryError, err.to_string())
    }
}

impl From<TasklaneError> for ApiError {
    fn from(err: TasklaneError) -> Self {
        match err {
            TasklaneError::Storage(e) => e.into(),
            TasklaneError::Validation(e) => e.into(),
            TasklaneError::Registry(e) => e.into(),
        }
    }
}

/// Driver errors are logged in full; the client only learns that the store failed.
impl From<tokio_postgres::Error> for ApiError {
    fn from(err: tokio_postgres::Error) -> Self {
        tracing::error!(error = ?err, "Postgres query failed");
        ApiError::from_code(ErrorCode::DatabaseError)
    }
}

impl From<deadpool_postgres::PoolError> for ApiError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        tracing::error!(error = ?err, "Could not check out a pooled connection");
        match err {
            deadpool_postgres::PoolError::Timeout(_) => {
                ApiError::from_code(ErrorCode::ConnectionPoolExhausted)
            }
            deadpool_postgres::PoolError::Closed => {
                ApiError::service_unavailable("Connection pool has been shut down")
            }
            _ => ApiError::from_code(ErrorCode::DatabaseError),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        tracing::warn!(error = %err, "Rejected malformed JSON");
        ApiError::invalid_input(format!("Body is not valid JSON: {}", err))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
