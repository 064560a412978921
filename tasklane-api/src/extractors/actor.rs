//! Acting-user extractor.
//!
//! The acting user is named by the `X-User-Id` header. There is no
//! credential check: the header is trusted as-is, but it must parse as a
//! user id and name an existing user.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tasklane_core::UserId;
use tasklane_storage::SharedStorage;

use crate::error::ApiError;

/// Header naming the acting user.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user performing a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
}

/// Extractor for the acting user.
///
/// Rejects with 401 when the header is missing, is not a positive integer,
/// or names a user that does not exist.
#[derive(Debug, Clone, Copy)]
pub struct ActorExtractor(pub Actor);

impl std::ops::Deref for ActorExtractor {
    type Target = Actor;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Parse the header value into a user id.
pub(crate) fn parse_user_id(parts: &Parts) -> Result<UserId, ApiError> {
    let raw = parts
        .headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| ApiError::unauthorized("Missing X-User-Id header"))?;

    raw.to_str()
        .ok()
        .and_then(|value| value.trim().parse::<UserId>().ok())
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::unauthorized("X-User-Id header must be a positive integer"))
}

#[async_trait]
impl<S> FromRequestParts<S> for ActorExtractor
where
    S: Send + Sync,
    SharedStorage: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parse_user_id(parts)?;

        let storage = SharedStorage::from_ref(state);
        if storage.user_get(user_id).await?.is_none() {
            tracing::debug!(user_id, "Rejected request for unknown acting user");
            return Err(ApiError::unauthorized(format!(
                "X-User-Id {} does not name a user",
                user_id
            )));
        }

        Ok(ActorExtractor(Actor { user_id }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use axum::http::Request;
    use std::sync::Arc;
    use tasklane_storage::{AsyncStorageTrait, InMemoryStorage, NewUser};

    fn parts_with_header(value: Option<&str>) -> Result<Parts, axum::http::Error> {
        let mut builder = Request::builder().uri("/api/v1/projects");
        if let Some(value) = value {
            builder = builder.header(USER_ID_HEADER, value);
        }
        Ok(builder.body(())?.into_parts().0)
    }

    #[test]
    fn test_parse_user_id() -> Result<(), axum::http::Error> {
        assert_eq!(parse_user_id(&parts_with_header(Some("42"))?), Ok(42));
        assert_eq!(parse_user_id(&parts_with_header(Some(" 7 "))?), Ok(7));
        Ok(())
    }

    #[test]
    fn test_parse_user_id_rejects_invalid() -> Result<(), axum::http::Error> {
        for value in [None, Some("abc"), Some("0"), Some("-3"), Some("")] {
            let err = parse_user_id(&parts_with_header(value)?)
                .err()
                .map(|e| e.code);
            assert_eq!(err, Some(ErrorCode::Unauthorized), "header {:?}", value);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_extractor_requires_existing_user() -> Result<(), Box<dyn std::error::Error>> {
        let storage = Arc::new(InMemoryStorage::new());
        let user = storage
            .user_insert(&NewUser {
                username: "ada".to_string(),
                email: "ada@example.com".to_string(),
                full_name: None,
            })
            .await?;
        let state: SharedStorage = storage;

        let mut known = parts_with_header(Some(&user.user_id.to_string()))?;
        let ActorExtractor(actor) =
            ActorExtractor::from_request_parts(&mut known, &state).await?;
        assert_eq!(actor.user_id, user.user_id);

        let mut unknown = parts_with_header(Some("999"))?;
        let err = ActorExtractor::from_request_parts(&mut unknown, &state)
            .await
            .err()
            .map(|e| e.code);
        assert_eq!(err, Some(ErrorCode::Unauthorized));
        Ok(())
    }
}
