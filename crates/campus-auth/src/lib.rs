//! # Campus Auth
//!
//! Authentication and authorization for the Campus records API.
//!
//! - [`claims`]: the access token payload
//! - [`jwt`]: token issue and verification
//! - [`policy`]: the access policy engine, a pure function deciding whether an
//!   actor may perform an action on a resource
//!
//! # Example
//!
//! ```ignore
//! use campus_auth::policy::{Actor, ActionKind, ResourceRef, enforce};
//!
//! let actor = Actor::new(user_id, Role::Professor);
//! enforce(&actor, ActionKind::UpdateCourse, &ResourceRef::Course { professor_id })?;
//! ```

pub mod claims;
pub mod jwt;
pub mod policy;

pub use claims::Claims;
pub use jwt::{create_access_token, verify_token};
pub use policy::{
    ActionKind, Actor, Decision, DenyReason, ResourceRef, authorize, authorize_registration,
    enforce,
};
