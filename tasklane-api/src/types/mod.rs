//! API Request and Response Types
//!
//! Request bodies, query parameters and response envelopes for the REST API.
//! Responses are built from core entities with `From` conversions.

mod comment;
mod member;
mod project;
mod role;
mod task;
mod user;

pub use comment::*;
pub use member::*;
pub use project::*;
pub use role::*;
pub use task::*;
pub use user::*;

use serde::{Deserialize, Deserializer, Serialize};

/// Keeps an explicit JSON `null` apart from an absent field in PATCH bodies:
/// absent is `None`, `null` is `Some(None)`. Pair with `#[serde(default)]`.
pub(crate) fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Pagination query parameters shared by list endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PageParams {
    /// Maximum number of results
    pub limit: Option<i64>,
    /// Offset for pagination
    pub offset: Option<i64>,
}

impl PageParams {
    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}
