//! `tasklane-api` binary: telemetry, storage, role registry, then serve.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tasklane_api::telemetry::{init_tracer, shutdown_tracer, TelemetryConfig, METRICS};
use tasklane_api::{
    create_api_router, ApiConfig, ApiError, ApiResult, AppState, DbClient, DbConfig,
    StorageBackend,
};
use tasklane_storage::{InMemoryStorage, RoleRegistry, RoleRegistryConfig, SharedStorage};

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracer(&TelemetryConfig::default())?;

    let backend = StorageBackend::from_env().map_err(ApiError::invalid_input)?;
    let storage = open_storage(backend).await?;

    // Fail fast: handlers assume every role code resolves.
    let registry = Arc::new(RoleRegistry::new(RoleRegistryConfig::from_env()));
    if let Err(e) = registry.initialize(storage.as_ref()).await {
        tracing::error!(error = %e, "Failed to initialize member role registry");
        shutdown_tracer();
        return Err(e.into());
    }
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.set_member_roles_loaded(registry.roles().len());
    }

    let api_config = ApiConfig::from_env();
    let state = AppState::new(storage, registry, api_config);
    let app: Router = create_api_router(state);

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, %backend, "Starting Tasklane API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("cannot listen on {}: {}", addr, e)))?;

    tokio::select! {
        served = axum::serve(listener, app) => {
            served.map_err(|e| ApiError::internal_error(format!("server stopped: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl-C received, stopping");
        }
    }

    shutdown_tracer();
    Ok(())
}

async fn open_storage(backend: StorageBackend) -> ApiResult<SharedStorage> {
    match backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on exit");
            Ok(Arc::new(InMemoryStorage::new()))
        }
        StorageBackend::Postgres => {
            let pg = DbConfig::from_env();
            let db = DbClient::from_config(&pg)?;
            db.migrate().await?;
            tracing::info!(
                host = %pg.host,
                dbname = %pg.dbname,
                pool_size = pg.max_size,
                "Connected to PostgreSQL"
            );
            Ok(Arc::new(db))
        }
    }
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("TASKLANE_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT")
        .or_else(|_| std::env::var("TASKLANE_API_PORT"))
        .unwrap_or_else(|_| "3000".to_string());
    let port: u16 = port
        .parse()
        .map_err(|_| ApiError::invalid_input(format!("port must be 0-65535, got {:?}", port)))?;

    format!("{}:{}", host, port)
        .parse::<SocketAddr>()
        .map_err(|e| ApiError::invalid_input(format!("bad TASKLANE_API_BIND {:?}: {}", host, e)))
}
