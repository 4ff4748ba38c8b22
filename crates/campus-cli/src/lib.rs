//! # Campus CLI
//!
//! Administrative operations that must not be reachable over HTTP, starting
//! with bootstrapping the first administrator account.
//!
//! ## Usage
//!
//! ```ignore
//! use campus_cli::{NewAdmin, create_admin};
//!
//! let id = create_admin(&pool, &cipher, &policy, NewAdmin {
//!     name: "Root",
//!     email: "root@campus.edu",
//!     password: "Str0ng!pass",
//! }).await?;
//! ```

use campus_config::PasswordPolicyConfig;
use campus_core::password::check_password_policy;
use campus_core::{CredentialError, PiiCipher, email_lookup_key, hash_password, normalize_email};
use campus_models::{Role, UserId};
use sqlx::PgPool;

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("Name is required")]
    EmptyName,
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error("Failed to encrypt personal data: {0}")]
    Encryption(anyhow::Error),
    #[error("User with this email already exists")]
    EmailTaken,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy)]
pub struct NewAdmin<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Inserts an administrator with the same identity encoding the API uses:
/// encrypted name and email, hashed email lookup key, bcrypt password.
pub async fn create_admin(
    db: &PgPool,
    cipher: &PiiCipher,
    policy: &PasswordPolicyConfig,
    admin: NewAdmin<'_>,
) -> Result<UserId, AdminError> {
    let name = admin.name.trim();
    if name.is_empty() {
        return Err(AdminError::EmptyName);
    }
    check_password_policy(admin.password, policy)?;

    let email = normalize_email(admin.email);
    let hashed_password = hash_password(admin.password)?;
    let name_encrypted = cipher.encrypt(name).map_err(AdminError::Encryption)?;
    let email_encrypted = cipher.encrypt(&email).map_err(AdminError::Encryption)?;

    let mut tx = db.begin().await?;

    let user_id = sqlx::query_scalar::<_, UserId>(
        "INSERT INTO users (id, name_encrypted, email_encrypted, email_hash, password, role)
         VALUES ($1, $2, $3, $4, $5, $6)
         ON CONFLICT (email_hash) DO NOTHING
         RETURNING id",
    )
    .bind(UserId::new())
    .bind(&name_encrypted)
    .bind(&email_encrypted)
    .bind(email_lookup_key(&email))
    .bind(&hashed_password)
    .bind(Role::Administrator)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(user_id) = user_id else {
        tx.rollback().await?;
        return Err(AdminError::EmailTaken);
    };

    tx.commit().await?;

    Ok(user_id)
}
