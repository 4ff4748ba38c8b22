//! Encryption of personal data at rest.
//!
//! Names and emails are stored as `ENC:` + base64(nonce || ciphertext || tag)
//! using AES-256-GCM with a fresh 96-bit nonce per value, so equal plaintexts
//! never produce equal ciphertexts. Equality lookups on email therefore go
//! through [`email_lookup_key`], a deterministic SHA-256 digest of the
//! normalized address.
//!
//! Changing [`normalize_email`] or the digest invalidates every stored lookup
//! key and needs a data migration.

use std::num::NonZeroU32;

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit},
};
use anyhow::{Context, Result};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rand::RngCore;
use ring::pbkdf2;
use sha2::{Digest, Sha256};

const KEY_LENGTH: usize = 32;
const NONCE_LENGTH: usize = 12;

const PBKDF2_ITERATIONS: NonZeroU32 = match NonZeroU32::new(100_000) {
    Some(n) => n,
    None => panic!("iteration count must be non-zero"),
};

const PBKDF2_SALT: &[u8] = b"campus-pii-encryption-v1";

pub const ENCRYPTED_PREFIX: &str = "ENC:";

/// Lowercases and trims an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Hex SHA-256 of the normalized email; the unique index on `users`.
pub fn email_lookup_key(email: &str) -> String {
    let digest = Sha256::digest(normalize_email(email).as_bytes());
    hex::encode(digest)
}

/// AES-256-GCM cipher keyed from a passphrase.
#[derive(Clone)]
pub struct PiiCipher {
    cipher: Aes256Gcm,
}

impl PiiCipher {
    /// Stretches `secret` into an AES-256 key with PBKDF2-HMAC-SHA256.
    pub fn from_secret(secret: &str) -> Self {
        let mut key = [0u8; KEY_LENGTH];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            PBKDF2_ITERATIONS,
            PBKDF2_SALT,
            secret.as_bytes(),
            &mut key,
        );

        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key)),
        }
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| anyhow::anyhow!("Encryption failed: {}", e))?;

        let mut combined = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);

        Ok(format!("{}{}", ENCRYPTED_PREFIX, BASE64.encode(&combined)))
    }

    /// Fails on a missing prefix, bad base64, truncated input, or an
    /// authentication failure (wrong key or tampered data).
    pub fn decrypt(&self, stored: &str) -> Result<String> {
        let encoded = stored
            .strip_prefix(ENCRYPTED_PREFIX)
            .context("Stored value is not encrypted")?;

        let combined = BASE64
            .decode(encoded)
            .context("Failed to decode base64")?;

        if combined.len() <= NONCE_LENGTH {
            anyhow::bail!("Ciphertext too short");
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LENGTH);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| anyhow::anyhow!("Decryption failed (wrong key or corrupted data): {}", e))?;

        String::from_utf8(plaintext).context("Decrypted data is not valid UTF-8")
    }
}

impl std::fmt::Debug for PiiCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PiiCipher").finish_non_exhaustive()
    }
}
