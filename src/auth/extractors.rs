use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use crate::auth::repo::User;
use crate::auth::tokens::{JwtKeys, TokenPurpose};
use crate::error::ApiError;
use crate::state::AppState;

/// Validates the bearer token and loads the acting user. Every protected
/// route takes this extractor; ownership scoping starts from `user.id`.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing Authorization header".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or_else(|| ApiError::Unauthorized("invalid auth scheme".into()))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys
            .verify_purpose(token, TokenPurpose::Access)
            .map_err(|_| {
                warn!("invalid or expired bearer token");
                ApiError::Unauthorized("invalid or expired token".into())
            })?;

        let user = User::find_by_email(&state.db, &claims.sub)
            .await
            .map_err(ApiError::Internal)?
            .ok_or_else(|| ApiError::Unauthorized("invalid or expired token".into()))?;

        Ok(CurrentUser(user))
    }
}
