//! Credential service: password hashing, verification, policy and rotation.
//!
//! Hashing and comparison are delegated to bcrypt. Persistence of a rotated
//! credential is the caller's job; [`rotate_credential`] only decides whether
//! the rotation may happen and produces the replacement hash.

use bcrypt::{DEFAULT_COST, hash, verify};
use campus_config::PasswordPolicyConfig;
use thiserror::Error;

/// Characters that satisfy the "special character" rule.
pub const SPECIAL_CHARACTERS: &str = "!@#$%^&*(),.?\":{}|<>";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("Current password is incorrect")]
    IncorrectCurrentCredential,
    #[error("Password does not meet requirements: {}", .0.join(", "))]
    PolicyViolation(Vec<String>),
    #[error("Failed to process password: {0}")]
    Hashing(String),
}

pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    hash(password, DEFAULT_COST).map_err(|e| CredentialError::Hashing(e.to_string()))
}

/// Returns `Ok(false)` for a wrong password and an error only when `hash` is
/// not a bcrypt hash at all.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, CredentialError> {
    verify(password, hash).map_err(|e| CredentialError::Hashing(e.to_string()))
}

/// Checks `candidate` against every enabled rule and reports all failures at
/// once.
pub fn check_password_policy(
    candidate: &str,
    policy: &PasswordPolicyConfig,
) -> Result<(), CredentialError> {
    let mut violations = Vec::new();

    if candidate.chars().count() < policy.min_length {
        violations.push(format!(
            "must be at least {} characters long",
            policy.min_length
        ));
    }
    if policy.require_uppercase && !candidate.chars().any(|c| c.is_uppercase()) {
        violations.push("must contain an uppercase letter".to_string());
    }
    if policy.require_lowercase && !candidate.chars().any(|c| c.is_lowercase()) {
        violations.push("must contain a lowercase letter".to_string());
    }
    if policy.require_digit && !candidate.chars().any(|c| c.is_ascii_digit()) {
        violations.push("must contain a digit".to_string());
    }
    if policy.require_special && !candidate.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
        violations.push(format!(
            "must contain a special character ({SPECIAL_CHARACTERS})"
        ));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(CredentialError::PolicyViolation(violations))
    }
}

/// Validates a password change and returns the hash to store.
///
/// The current password is checked before the policy so a caller who does
/// not know the current password learns nothing about the new one.
pub fn rotate_credential(
    current_hash: &str,
    old_password: &str,
    new_password: &str,
    policy: &PasswordPolicyConfig,
) -> Result<String, CredentialError> {
    if !verify_password(old_password, current_hash)? {
        return Err(CredentialError::IncorrectCurrentCredential);
    }

    check_password_policy(new_password, policy)?;
    hash_password(new_password)
}
