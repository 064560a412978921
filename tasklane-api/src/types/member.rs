//! Project membership API types

use serde::{Deserialize, Serialize};
use tasklane_core::{ProjectId, ProjectMember, RoleCode, RoleId, Timestamp, UserId};

/// Request to add a user to a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AddMemberRequest {
    pub user_id: UserId,
    /// Role to grant; OWNER cannot be granted
    pub role: RoleCode,
}

/// Request to change a member's role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdateMemberRequest {
    pub role: RoleCode,
}

/// Membership response with the role resolved to its code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MemberResponse {
    pub project_id: ProjectId,
    pub user_id: UserId,
    pub role_id: RoleId,
    pub role: RoleCode,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub joined_at: Timestamp,
}

impl MemberResponse {
    pub fn new(member: ProjectMember, role: RoleCode) -> Self {
        Self {
            project_id: member.project_id(),
            user_id: member.user_id(),
            role_id: member.role_id,
            role,
            joined_at: member.joined_at,
        }
    }
}

/// Response containing the members of a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ListMembersResponse {
    pub members: Vec<MemberResponse>,
}
