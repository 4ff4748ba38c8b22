//! # Campus Config
//!
//! Configuration types for the Campus records API.
//!
//! Every structure here is loaded from environment variables and falls back
//! to development defaults when a variable is absent:
//!
//! - [`jwt`]: JWT signing secret and token lifetime
//! - [`cors`]: allowed browser origins
//! - [`database`]: PostgreSQL connection settings
//! - [`encryption`]: secret used to derive the at-rest PII key
//! - [`password`]: password policy applied on registration and rotation
//!
//! # Example
//!
//! ```ignore
//! use campus_config::{JwtConfig, PasswordPolicyConfig};
//!
//! let jwt_config = JwtConfig::from_env();
//! let policy = PasswordPolicyConfig::from_env();
//! ```

pub mod cors;
pub mod database;
pub mod encryption;
pub mod jwt;
pub mod password;

pub use cors::CorsConfig;
pub use database::DatabaseConfig;
pub use encryption::EncryptionConfig;
pub use jwt::JwtConfig;
pub use password::PasswordPolicyConfig;

/// Reads a boolean flag, accepting `true`/`1` (case-insensitive).
pub(crate) fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(default)
}
