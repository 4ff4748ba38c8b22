//! # Campus Models
//!
//! Domain entities and DTOs for the Campus records API.
//!
//! - [`ids`]: strongly-typed UUID newtypes
//! - [`roles`]: the fixed [`Role`] set
//! - [`users`]: the encrypted user row and its decrypted entity
//! - [`courses`]: courses and enrollments
//! - [`grades`]: labelled grades
//! - [`auth`]: login, registration and password change payloads
//!
//! # Example
//!
//! ```ignore
//! use campus_models::users::{User, UserRecord};
//! use campus_core::PiiCipher;
//!
//! let record: UserRecord = fetch_row().await?;
//! let user: User = record.decrypt(&cipher)?;
//! ```

pub mod auth;
pub mod courses;
pub mod grades;
pub mod ids;
pub mod roles;
pub mod users;

pub use ids::{CourseId, EnrollmentId, GradeId, UserId};
pub use roles::Role;

pub use auth::{ChangePasswordRequest, LoginRequest, LoginResponse, MessageResponse, RegisterRequest};
pub use courses::{
    Course, CourseSearchParams, CreateCourseDto, Enrollment,
    EnrollmentRequest, PaginatedCoursesResponse, UpdateCourseDto,
};
pub use grades::{AssignGradeDto, Grade, UpdateGradeDto};
pub use users::{
    CreateUserDto, PaginatedUsersResponse, UpdateUserDto, User, UserDetail, UserRecord,
    UserSearchParams,
};
