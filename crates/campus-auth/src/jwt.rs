//! JWT issue and verification.
//!
//! Tokens are HS256-signed with `JWT_SECRET` and live for
//! `JWT_ACCESS_EXPIRY` seconds. Verification distinguishes an expired token
//! (401, the client should log in again) from one that is malformed or
//! carries a bad signature (422).

use chrono::Utc;
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};

use campus_config::JwtConfig;
use campus_core::AppError;
use campus_models::{Role, UserId};

use crate::claims::Claims;

pub fn create_access_token(
    user_id: UserId,
    role: Role,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp() as usize;
    let exp = now + jwt_config.access_token_expiry.max(0) as usize;

    let claims = Claims {
        sub: user_id,
        role,
        exp,
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal_error(format!("Failed to create token: {}", e)))
}

pub fn verify_token(token: &str, jwt_config: &JwtConfig) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::unauthorized("Token has expired".to_string()),
        _ => AppError::unprocessable(anyhow::anyhow!("Invalid token")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "jwt-test-secret".to_string(),
            access_token_expiry: 900,
        }
    }

    #[test]
    fn test_create_and_verify() {
        let user_id = UserId::new();
        let token = create_access_token(user_id, Role::Student, &config()).unwrap();
        let claims = verify_token(&token, &config()).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, Role::Student);
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_wrong_secret_is_unprocessable() {
        let token = create_access_token(UserId::new(), Role::Student, &config()).unwrap();
        let other = JwtConfig {
            secret: "another-secret".to_string(),
            ..config()
        };
        let err = verify_token(&token, &other).unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_malformed_token_is_unprocessable() {
        let err = verify_token("not.a.jwt", &config()).unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_expired_token_is_unauthorized() {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: UserId::new(),
            role: Role::Professor,
            exp: now - 3600,
            iat: now - 7200,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config().secret.as_bytes()),
        )
        .unwrap();

        let err = verify_token(&token, &config()).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }
}
