//! Grade models and DTOs.
//!
//! A student may hold several grades in the same course, told apart by their
//! label ("Midterm", "Final").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::ids::{CourseId, GradeId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Grade {
    pub id: GradeId,
    /// Label such as "Midterm"
    pub name: Option<String>,
    pub course_id: CourseId,
    pub student_id: UserId,
    pub value: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AssignGradeDto {
    pub course_id: CourseId,
    pub student_id: UserId,
    #[serde(alias = "grade")]
    #[validate(range(min = 0.0, max = 100.0))]
    #[schema(example = 90.0)]
    pub value: f64,
    #[serde(alias = "grade_name")]
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "Midterm")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateGradeDto {
    #[serde(alias = "grade")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub value: f64,
    #[serde(alias = "grade_name")]
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
}
