//! Member role registry.
//!
//! Loads the `member_roles` reference data once, caches it by [`RoleCode`],
//! and serves lookups from memory for the rest of the process.
//!
//! The registry is not ready until [`RoleRegistry::initialize`] has
//! completed. Initialization runs behind a [`OnceCell`], so concurrent or
//! repeated calls never populate the cache twice. Once published the cache is
//! never mutated, and reads take no lock. A restart is required to observe
//! changes to the persisted roles.

use ::async_trait::async_trait;
use std::collections::HashMap;
use tasklane_core::{
    MemberRole, MemberRoleRow, RegistryError, RoleCode, RoleId, TasklaneError, TasklaneResult,
};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Persistence collaborator that can fetch every role row in one read.
#[async_trait]
pub trait RoleSource: Send + Sync {
    /// Fetch all persisted `member_roles` rows.
    async fn member_role_list(&self) -> TasklaneResult<Vec<MemberRoleRow>>;
}

/// A fixed set of rows, used where reference data is supplied in code.
#[async_trait]
impl RoleSource for [MemberRoleRow] {
    async fn member_role_list(&self) -> TasklaneResult<Vec<MemberRoleRow>> {
        Ok(self.to_vec())
    }
}

/// The reference rows seeded into a fresh store, one per [`RoleCode`].
pub fn default_role_rows() -> Vec<MemberRoleRow> {
    vec![
        MemberRoleRow::new(1, RoleCode::Owner.as_db_str())
            .with_description("Project owner with full control"),
        MemberRoleRow::new(2, RoleCode::Admin.as_db_str())
            .with_description("Manages members and project settings"),
        MemberRoleRow::new(3, RoleCode::Member.as_db_str())
            .with_description("Creates and edits tasks"),
        MemberRoleRow::new(4, RoleCode::Viewer.as_db_str())
            .with_description("Read-only access with comments"),
    ]
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Role registry configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleRegistryConfig {
    /// Fail initialization when a [`RoleCode`] has no persisted row,
    /// instead of logging it and failing lazily at lookup.
    pub strict: bool,
}

impl RoleRegistryConfig {
    /// Load from `TASKLANE_ROLE_REGISTRY_STRICT` ("true" or "1"; default false).
    pub fn from_env() -> Self {
        let strict = std::env::var("TASKLANE_ROLE_REGISTRY_STRICT")
            .ok()
            .map(|s| matches!(s.trim().to_lowercase().as_str(), "true" | "1"))
            .unwrap_or(false);
        Self { strict }
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

#[derive(Debug, Default)]
struct RoleMap {
    by_code: HashMap<RoleCode, MemberRole>,
    by_id: HashMap<RoleId, RoleCode>,
}

impl RoleMap {
    /// Build the cache from raw rows. Rows with an unmapped code are skipped;
    /// when a code appears twice the first row wins.
    fn from_rows(rows: Vec<MemberRoleRow>) -> Self {
        let mut map = Self::default();
        for row in rows {
            let code = match RoleCode::from_db_str(&row.code) {
                Ok(code) => code,
                Err(_) => {
                    warn!(
                        role_id = row.role_id,
                        code = %row.code,
                        "Skipping member role with unmapped code"
                    );
                    continue;
                }
            };

            if let Some(existing) = map.by_code.get(&code) {
                warn!(
                    role_id = row.role_id,
                    kept_role_id = existing.role_id,
                    code = %code,
                    "Skipping duplicate member role row"
                );
                continue;
            }

            debug!(role_id = row.role_id, code = %code, "Cached member role");
            map.by_id.insert(row.role_id, code);
            map.by_code.insert(
                code,
                MemberRole {
                    role_id: row.role_id,
                    code,
                    description: row.description,
                },
            );
        }
        map
    }

    fn missing_codes(&self) -> Vec<RoleCode> {
        RoleCode::ALL
            .into_iter()
            .filter(|code| !self.by_code.contains_key(code))
            .collect()
    }
}

/// Process-wide cache of member roles keyed by [`RoleCode`].
///
/// Constructed once by the entry point, initialized before the server starts
/// accepting requests, then shared by reference.
#[derive(Debug, Default)]
pub struct RoleRegistry {
    config: RoleRegistryConfig,
    roles: OnceCell<RoleMap>,
}

impl RoleRegistry {
    /// Create an empty registry. Lookups fail until [`Self::initialize`] runs.
    pub fn new(config: RoleRegistryConfig) -> Self {
        Self {
            config,
            roles: OnceCell::new(),
        }
    }

    /// Load every role row from `source` and publish the cache.
    ///
    /// Persistence errors propagate unchanged and leave the registry not
    /// ready, so a later call may retry. After a successful call further
    /// calls return immediately without touching `source`.
    pub async fn initialize<S>(&self, source: &S) -> TasklaneResult<()>
    where
        S: RoleSource + ?Sized,
    {
        self.roles
            .get_or_try_init(|| async {
                let rows = source.member_role_list().await?;
                let row_count = rows.len();
                let map = RoleMap::from_rows(rows);

                let missing = map.missing_codes();
                if !missing.is_empty() {
                    if self.config.strict {
                        return Err(TasklaneError::from(RegistryError::Incomplete { missing }));
                    }
                    warn!(
                        missing = ?missing,
                        "Member role codes have no reference data; lookups for them will fail"
                    );
                }

                info!(
                    rows = row_count,
                    cached = map.by_code.len(),
                    "Member role registry initialized"
                );
                Ok::<_, TasklaneError>(map)
            })
            .await?;
        Ok(())
    }

    /// Whether initialization has completed.
    pub fn is_ready(&self) -> bool {
        self.roles.initialized()
    }

    /// Get the cached role for `code`.
    pub fn get_role(&self, code: RoleCode) -> Result<&MemberRole, RegistryError> {
        self.roles
            .get()
            .and_then(|map| map.by_code.get(&code))
            .ok_or(RegistryError::RoleNotFound { code })
    }

    /// Get only the id of the cached role for `code`.
    pub fn get_role_id(&self, code: RoleCode) -> Result<RoleId, RegistryError> {
        self.get_role(code).map(|role| role.role_id)
    }

    /// Reverse lookup from a stored `role_id` to its code.
    pub fn code_for_id(&self, role_id: RoleId) -> Result<RoleCode, RegistryError> {
        self.roles
            .get()
            .and_then(|map| map.by_id.get(&role_id).copied())
            .ok_or(RegistryError::RoleIdNotFound { role_id })
    }

    /// All cached roles ordered by id. Empty before initialization.
    pub fn roles(&self) -> Vec<MemberRole> {
        let mut roles: Vec<MemberRole> = self
            .roles
            .get()
            .map(|map| map.by_code.values().cloned().collect())
            .unwrap_or_default();
        roles.sort_by_key(|role| role.role_id);
        roles
    }
}
