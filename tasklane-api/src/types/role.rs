//! Member role API types

use serde::{Deserialize, Serialize};
use tasklane_core::MemberRole;

/// Response containing the roles cached by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ListRolesResponse {
    pub roles: Vec<MemberRole>,
}
