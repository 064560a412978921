//! Process configuration read from `TASKLANE_*` variables at startup.
//!
//! Missing or unparsable values fall back to the defaults below; only the
//! storage backend selector is allowed to fail startup.

use std::fmt;
use std::str::FromStr;

/// HTTP-facing knobs shared through `AppState`.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Origins sent in `Access-Control-Allow-Origin`. Empty accepts any.
    pub cors_origins: Vec<String>,
    pub cors_max_age_secs: u64,

    /// Used when a list request omits `limit`.
    pub default_page_size: i64,
    /// Requested limits are clamped to this.
    pub max_page_size: i64,

    /// Events a slow WebSocket session may lag before it starts dropping them.
    pub ws_capacity: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            cors_origins: Vec::new(),
            cors_max_age_secs: 24 * 60 * 60,
            default_page_size: 50,
            max_page_size: 200,
            ws_capacity: 1000,
        }
    }
}

impl ApiConfig {
    /// Reads `TASKLANE_CORS_ORIGINS` (comma separated), `TASKLANE_CORS_MAX_AGE_SECS`,
    /// `TASKLANE_DEFAULT_PAGE_SIZE`, `TASKLANE_MAX_PAGE_SIZE` and `TASKLANE_WS_CAPACITY`.
    pub fn from_env() -> Self {
        let defaults = ApiConfig::default();

        let cors_origins = std::env::var("TASKLANE_CORS_ORIGINS")
            .map(|list| split_origins(&list))
            .unwrap_or_default();

        let default_page_size = env_parse("TASKLANE_DEFAULT_PAGE_SIZE")
            .filter(|size: &i64| *size > 0)
            .unwrap_or(defaults.default_page_size);

        let max_page_size = env_parse("TASKLANE_MAX_PAGE_SIZE")
            .filter(|size: &i64| *size > 0)
            .unwrap_or(defaults.max_page_size)
            .max(default_page_size);

        ApiConfig {
            cors_origins,
            cors_max_age_secs: env_parse("TASKLANE_CORS_MAX_AGE_SECS")
                .unwrap_or(defaults.cors_max_age_secs),
            default_page_size,
            max_page_size,
            ws_capacity: env_parse("TASKLANE_WS_CAPACITY")
                .filter(|capacity: &usize| *capacity > 0)
                .unwrap_or(defaults.ws_capacity),
        }
    }

    /// Effective `limit` for a list query.
    pub fn page_limit(&self, requested: Option<i64>) -> i64 {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size)
    }
}

fn split_origins(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

/// Which store backs the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    /// PostgreSQL through the connection pool.
    #[default]
    Postgres,
    /// Process-local in-memory tables, lost on exit.
    Memory,
}

impl StorageBackend {
    /// Read `TASKLANE_STORAGE` (`postgres` or `memory`).
    pub fn from_env() -> Result<Self, String> {
        match std::env::var("TASKLANE_STORAGE") {
            Ok(value) => value.parse(),
            Err(_) => Ok(Self::default()),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" | "in-memory" => Ok(Self::Memory),
            other => Err(format!(
                "Invalid TASKLANE_STORAGE value '{}': expected 'postgres' or 'memory'",
                other
            )),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StorageBackend::Postgres => "postgres",
            StorageBackend::Memory => "memory",
        })
    }
}
