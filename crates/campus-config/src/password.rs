use std::env;

use crate::env_flag;

/// Password strength rules.
///
/// Defaults: at least 8 characters with an uppercase letter, a lowercase
/// letter, a digit and one of `!@#$%^&*(),.?":{}|<>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswordPolicyConfig {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    pub require_special: bool,
}

impl Default for PasswordPolicyConfig {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_special: true,
        }
    }
}

impl PasswordPolicyConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            min_length: env::var("PASSWORD_MIN_LENGTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.min_length),
            require_uppercase: env_flag("PASSWORD_REQUIRE_UPPERCASE", defaults.require_uppercase),
            require_lowercase: env_flag("PASSWORD_REQUIRE_LOWERCASE", defaults.require_lowercase),
            require_digit: env_flag("PASSWORD_REQUIRE_DIGIT", defaults.require_digit),
            require_special: env_flag("PASSWORD_REQUIRE_SPECIAL", defaults.require_special),
        }
    }
}
