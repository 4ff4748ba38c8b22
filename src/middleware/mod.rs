//! Request extractors for authentication.
//!
//! Extractors only establish *who* is calling. *Whether* the caller may do
//! something is decided in the services through `campus_auth::policy`, after
//! the caller's role has been re-read from the database.
//!
//! # Example
//!
//! ```ignore
//! use crate::middleware::auth::AuthUser;
//!
//! async fn get_profile(auth_user: AuthUser) -> impl IntoResponse {
//!     let user_id = auth_user.user_id();
//!     // ...
//! }
//! ```

pub mod auth;
