//! Access token payload.

use campus_models::{Role, UserId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claims carried by an access token.
///
/// `role` reflects the user at issue time. Services re-read the role from the
/// database before authorizing, so the claim is informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    /// User ID (subject claim)
    pub sub: UserId,
    pub role: Role,
    /// Expiration (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}
