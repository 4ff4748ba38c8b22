//! The fixed set of user roles.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// A user's role. Assigned at creation and never changed afterwards.
///
/// Stored as the Postgres enum `user_role`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "user_role")]
pub enum Role {
    Student,
    Professor,
    Administrator,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Student, Role::Professor, Role::Administrator];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Professor => "Professor",
            Role::Administrator => "Administrator",
        }
    }

    /// Roles that may own a course.
    pub fn can_teach(&self) -> bool {
        matches!(self, Role::Professor | Role::Administrator)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown role: {s}"))
    }
}
