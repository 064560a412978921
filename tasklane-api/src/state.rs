//! Shared application state for Axum routers.

use std::sync::Arc;

use tasklane_storage::{RoleRegistry, SharedStorage};

use crate::config::ApiConfig;
use crate::ws::WsState;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Active storage backend (Postgres or in-memory).
    pub storage: SharedStorage,
    /// Member role registry, initialized before the server accepts requests.
    pub registry: Arc<RoleRegistry>,
    pub ws: Arc<WsState>,
    pub config: Arc<ApiConfig>,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(
        storage: SharedStorage,
        registry: Arc<RoleRegistry>,
        config: ApiConfig,
    ) -> Self {
        let ws = Arc::new(WsState::new(config.ws_capacity));
        Self {
            storage,
            registry,
            ws,
            config: Arc::new(config),
            start_time: std::time::Instant::now(),
        }
    }
}

crate::impl_from_ref!(SharedStorage, storage);
crate::impl_from_ref!(Arc<RoleRegistry>, registry);
crate::impl_from_ref!(Arc<WsState>, ws);
crate::impl_from_ref!(Arc<ApiConfig>, config);
crate::impl_from_ref!(std::time::Instant, start_time);
