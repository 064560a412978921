//! Error types for Tasklane operations

use crate::{EntityType, RoleCode, RoleId};
use std::fmt;
use thiserror::Error;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: EntityType, id: String },

    #[error("Entity already exists: {entity_type} with id {id}")]
    AlreadyExists { entity_type: EntityType, id: String },

    #[error("Insert failed for {entity_type}: {reason}")]
    InsertFailed { entity_type: EntityType, reason: String },

    #[error("Update failed for {entity_type} with id {id}: {reason}")]
    UpdateFailed {
        entity_type: EntityType,
        id: String,
        reason: String,
    },

    #[error("Query failed: {reason}")]
    QueryFailed { reason: String },

    #[error("Storage connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

impl StorageError {
    pub fn not_found(entity_type: EntityType, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    pub fn already_exists(entity_type: EntityType, id: impl fmt::Display) -> Self {
        Self::AlreadyExists {
            entity_type,
            id: id.to_string(),
        }
    }
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Constraint violation on {constraint}: {reason}")]
    ConstraintViolation { constraint: String, reason: String },
}

/// Role registry errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// No cached role for the code: reference data has drifted from the enum,
    /// or the registry has not been initialized yet.
    #[error("Member role not found for code {code}")]
    RoleNotFound { code: RoleCode },

    #[error("Member role not found for id {role_id}")]
    RoleIdNotFound { role_id: RoleId },

    /// Strict initialization found codes with no persisted row.
    #[error("Member role reference data is missing codes: {}", format_codes(.missing))]
    Incomplete { missing: Vec<RoleCode> },
}

fn format_codes(codes: &[RoleCode]) -> String {
    codes
        .iter()
        .map(RoleCode::as_db_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Master error type for all Tasklane errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TasklaneError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Result type alias for Tasklane operations.
pub type TasklaneResult<T> = Result<T, TasklaneError>;

// =============================================================================
// TESTS
// =============================================================================
