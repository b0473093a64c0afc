use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use crate::{
    auth::{cookie, jwt::TokenKeys, repo::User},
    error::ApiError,
    state::AppState,
};

/// Guard for routes that require a logged-in caller.
///
/// Resolves the bearer token (cookie or Authorization header) to a live user
/// row; handlers receive the full record.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = cookie::extract_token(&parts.headers).ok_or_else(|| {
            ApiError::Unauthorized("Access denied. No token provided. Please log in.".into())
        })?;

        let keys = TokenKeys::from_ref(state);
        let claims = keys.verify(&token).map_err(|_| {
            warn!("invalid or expired token");
            ApiError::Unauthorized("Invalid or expired token. Please log in again.".into())
        })?;

        let user = User::find_by_id(&state.db, claims.sub)
            .await?
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "token subject no longer exists");
                ApiError::Unauthorized("Invalid token. User no longer exists.".into())
            })?;

        Ok(CurrentUser(user))
    }
}
