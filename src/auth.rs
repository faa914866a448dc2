use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::ApiError;

/// Header carrying the principal authenticated by the gateway in front of this service
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller of the administrative endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub Uuid);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized("No valid authentication provided".to_string()))?;

        let id = value
            .to_str()
            .ok()
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
            .ok_or_else(|| {
                ApiError::Unauthorized(format!("Invalid user id in {} header", USER_ID_HEADER))
            })?;

        Ok(AuthUser(id))
    }
}
