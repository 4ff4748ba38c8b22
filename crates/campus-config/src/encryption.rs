use std::env;

/// Secret material for encrypting personal data at rest.
///
/// The secret is a passphrase, not a raw key; `campus_core::crypto` stretches
/// it into an AES-256 key. Rotating it makes every stored name and email
/// unreadable, so treat it like a database credential.
#[derive(Clone)]
pub struct EncryptionConfig {
    pub secret: String,
}

impl EncryptionConfig {
    pub fn from_env() -> Self {
        Self {
            secret: env::var("PII_ENCRYPTION_KEY")
                .unwrap_or_else(|_| "campus-dev-pii-key-change-in-production".to_string()),
        }
    }
}

impl std::fmt::Debug for EncryptionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionConfig")
            .field("secret", &"<redacted>")
            .finish()
    }
}
