//! Tasklane API - REST/WebSocket API Layer
//!
//! Axum REST endpoints for users, projects, members, tasks, assignees and
//! comments, plus WebSocket topics that stream change events in real time.
//!
//! Storage is pluggable: the PostgreSQL client in [`db`] or the in-memory
//! store from tasklane-storage. Member roles are resolved through the role
//! registry, which is loaded once at startup and shared through [`AppState`].

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod extractors;
pub mod macros;
pub mod openapi;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod types;
pub mod validation;
pub mod ws;

// Re-export commonly used types
pub use config::{ApiConfig, StorageBackend};
pub use db::{DbClient, DbConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use events::{Topic, WsEvent};
pub use extractors::{Actor, ActorExtractor, USER_ID_HEADER};
pub use openapi::ApiDoc;
pub use routes::create_api_router;
pub use state::AppState;
pub use types::*;
pub use ws::WsState;
