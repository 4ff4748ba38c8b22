use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use campus_auth::{Claims, verify_token};
use campus_core::AppError;
use campus_models::UserId;

use crate::state::AppState;

/// Extractor that validates the bearer token and yields its claims.
///
/// A missing or non-bearer header and an expired token are 401; a token that
/// is malformed or wrongly signed is 422.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn user_id(&self) -> UserId {
        self.0.sub
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header".to_string()))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::unauthorized("Invalid authorization header format".to_string())
        })?;

        let claims = verify_token(token.trim(), &state.jwt_config)?;

        Ok(AuthUser(claims))
    }
}

/// Like [`AuthUser`] but tolerates an absent header, for endpoints open to
/// anonymous callers. A header that is present but invalid still fails.
#[derive(Debug, Clone)]
pub struct OptionalAuthUser(pub Option<AuthUser>);

impl OptionalAuthUser {
    pub fn user_id(&self) -> Option<UserId> {
        self.0.as_ref().map(AuthUser::user_id)
    }
}

impl FromRequestParts<AppState> for OptionalAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(header::AUTHORIZATION) {
            return Ok(OptionalAuthUser(None));
        }

        AuthUser::from_request_parts(parts, state)
            .await
            .map(|user| OptionalAuthUser(Some(user)))
    }
}
