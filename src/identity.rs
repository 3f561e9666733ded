// Identity resolution for cart endpoints
//
// Authentication happens upstream; the verified user identity arrives as an
// opaque header value. This extractor parses it into the user id type before
// any cart lookup happens.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};

use crate::cart::error::CartError;

/// Header carrying the upstream-resolved user identity
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated user extractor for cart routes
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub user_id: i32,
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = CartError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or(CartError::Unauthenticated)?
            .to_str()
            .map_err(|_| CartError::InvalidUserId("non-printable header value".to_string()))?;

        let user_id: i32 = raw.trim().parse().map_err(|_| {
            tracing::debug!("Rejected malformed user id header: {:?}", raw);
            CartError::InvalidUserId(format!("Invalid user id: {}", raw))
        })?;

        if user_id <= 0 {
            return Err(CartError::InvalidUserId(format!(
                "Invalid user id: {}",
                user_id
            )));
        }

        Ok(CurrentUser { user_id })
    }
}
