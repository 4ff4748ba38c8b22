//! # Campus Core
//!
//! Foundational types shared by every Campus crate:
//!
//! - [`errors`]: the [`AppError`] taxonomy and its HTTP rendering
//! - [`pagination`]: limit/offset/page query handling
//! - [`password`]: the credential service (hash, verify, policy, rotation)
//! - [`crypto`]: encryption of personal data at rest and the email lookup key
//! - [`serde`]: trimming deserializers for request fields
//!
//! # Example
//!
//! ```ignore
//! use campus_core::crypto::{PiiCipher, email_lookup_key};
//! use campus_core::password::{hash_password, verify_password};
//!
//! let cipher = PiiCipher::from_secret("passphrase");
//! let stored = cipher.encrypt("ada@example.edu")?;
//! let key = email_lookup_key(" Ada@Example.edu ");
//!
//! let hash = hash_password("S3cure!pass")?;
//! assert!(verify_password("S3cure!pass", &hash)?);
//! ```

pub mod crypto;
pub mod errors;
pub mod pagination;
pub mod password;
pub mod serde;

pub use crypto::{PiiCipher, email_lookup_key, normalize_email};
pub use errors::AppError;
pub use pagination::{PaginationMeta, PaginationParams};
pub use password::{CredentialError, hash_password, verify_password};
