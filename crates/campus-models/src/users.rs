//! User domain models and DTOs.
//!
//! A user is persisted as a [`UserRecord`]: name and email are encrypted at
//! rest and the email additionally carries a deterministic lookup hash. The
//! decrypted [`User`] is what the rest of the application works with and what
//! goes out over the wire. Password hashes never leave the record type.

use campus_core::{PaginationMeta, PiiCipher};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::ids::{CourseId, UserId};
use crate::roles::Role;

/// A row of the `users` table, exactly as stored.
#[derive(FromRow, Clone)]
pub struct UserRecord {
    pub id: UserId,
    pub name_encrypted: String,
    pub email_encrypted: String,
    pub email_hash: String,
    pub password: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn decrypt(&self, cipher: &PiiCipher) -> anyhow::Result<User> {
        Ok(User {
            id: self.id,
            name: cipher.decrypt(&self.name_encrypted)?,
            email: cipher.decrypt(&self.email_encrypted)?,
            role: self.role,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl std::fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// A user with personal data in the clear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Case-insensitive substring match over name and email.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        self.name.to_lowercase().contains(&needle) || self.email.to_lowercase().contains(&needle)
    }
}

/// A single user together with their course relationships.
///
/// Professors carry the courses they own, students the courses they are
/// enrolled in; administrators carry neither.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub courses_teaching: Option<Vec<CourseId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub courses_enrolled: Option<Vec<CourseId>>,
}

/// Administrator-created account. Only `Student` and `Professor` are
/// accepted here.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUserDto {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(deserialize_with = "campus_core::serde::deserialize_trimmed")]
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserDto {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "campus_core::serde::deserialize_optional_trimmed")]
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1))]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserSearchParams {
    /// Matched case-insensitively against name and email
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedUsersResponse {
    pub data: Vec<User>,
    pub meta: PaginationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(cipher: &PiiCipher) -> UserRecord {
        let now = Utc::now();
        UserRecord {
            id: UserId::new(),
            name_encrypted: cipher.encrypt("Ada Lovelace").unwrap(),
            email_encrypted: cipher.encrypt("ada@example.edu").unwrap(),
            email_hash: campus_core::email_lookup_key("ada@example.edu"),
            password: "$2b$12$hash".to_string(),
            role: Role::Student,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_decrypt_record() {
        let cipher = PiiCipher::from_secret("models-test");
        let record = record(&cipher);
        let user = record.decrypt(&cipher).unwrap();
        assert_eq!(user.id, record.id);
        assert_eq!(user.name, "Ada Lovelace");
        assert_eq!(user.email, "ada@example.edu");
    }

    #[test]
    fn test_decrypt_with_wrong_key_fails() {
        let record = record(&PiiCipher::from_secret("one"));
        assert!(record.decrypt(&PiiCipher::from_secret("two")).is_err());
    }

    #[test]
    fn test_record_debug_hides_secrets() {
        let cipher = PiiCipher::from_secret("models-test");
        let rendered = format!("{:?}", record(&cipher));
        assert!(!rendered.contains("$2b$"));
        assert!(!rendered.contains("ENC:"));
    }

    #[test]
    fn test_user_serialization_has_no_password() {
        let cipher = PiiCipher::from_secret("models-test");
        let user = record(&cipher).decrypt(&cipher).unwrap();
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["role"], "Student");
    }

    #[test]
    fn test_matches_name_or_email() {
        let cipher = PiiCipher::from_secret("models-test");
        let user = record(&cipher).decrypt(&cipher).unwrap();
        assert!(user.matches("LOVE"));
        assert!(user.matches("example.EDU"));
        assert!(!user.matches("grace"));
    }

    #[test]
    fn test_detail_flattens_user() {
        let cipher = PiiCipher::from_secret("models-test");
        let user = record(&cipher).decrypt(&cipher).unwrap();
        let course = CourseId::new();
        let detail = UserDetail {
            user,
            courses_teaching: None,
            courses_enrolled: Some(vec![course]),
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["name"], "Ada Lovelace");
        assert_eq!(json["courses_enrolled"][0], course.to_string());
        assert!(json.get("courses_teaching").is_none());
    }

    #[test]
    fn test_create_user_dto_validation() {
        let dto = CreateUserDto {
            name: "".to_string(),
            email: "not-an-email".to_string(),
            password: "x".to_string(),
            role: Role::Student,
        };
        let errors = dto.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
    }
}
