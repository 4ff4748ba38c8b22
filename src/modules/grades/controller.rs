use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use campus_core::AppError;
use campus_models::{
    AssignGradeDto, CourseId, Grade, GradeId, MessageResponse, UpdateGradeDto, UserId,
};

use crate::middleware::auth::AuthUser;
use crate::modules::grades::service::GradeService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    get,
    path = "/api/grades",
    responses(
        (status = 200, description = "All grades", body = Vec<Grade>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - professors and administrators only")
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_grades(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Vec<Grade>>, AppError> {
    let grades = GradeService::list_grades(&state.db, auth_user.user_id()).await?;
    Ok(Json(grades))
}

/// Students may read only their own grades.
#[utoipa::path(
    get,
    path = "/api/grades/{id}",
    params(
        ("id" = GradeId, Path, description = "Grade ID")
    ),
    responses(
        (status = 200, description = "Grade", body = Grade),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Grade not found")
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_grade(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<GradeId>,
) -> Result<Json<Grade>, AppError> {
    let grade = GradeService::get_grade(&state.db, auth_user.user_id(), id).await?;
    Ok(Json(grade))
}

#[utoipa::path(
    post,
    path = "/api/grades",
    request_body = AssignGradeDto,
    responses(
        (status = 200, description = "Grade assigned", body = Grade),
        (status = 400, description = "Invalid input or target is not a student"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - professors and administrators only"),
        (status = 404, description = "Course or student not found")
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn assign_grade(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<AssignGradeDto>,
) -> Result<Json<Grade>, AppError> {
    let grade = GradeService::assign_grade(&state.db, auth_user.user_id(), dto).await?;
    Ok(Json(grade))
}

#[utoipa::path(
    put,
    path = "/api/grades/{id}",
    params(
        ("id" = GradeId, Path, description = "Grade ID")
    ),
    request_body = UpdateGradeDto,
    responses(
        (status = 200, description = "Grade updated", body = Grade),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - professors and administrators only"),
        (status = 404, description = "Grade not found")
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_grade(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<GradeId>,
    ValidatedJson(dto): ValidatedJson<UpdateGradeDto>,
) -> Result<Json<Grade>, AppError> {
    let grade = GradeService::update_grade(&state.db, auth_user.user_id(), id, dto).await?;
    Ok(Json(grade))
}

#[utoipa::path(
    delete,
    path = "/api/grades/{id}",
    params(
        ("id" = GradeId, Path, description = "Grade ID")
    ),
    responses(
        (status = 200, description = "Grade deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - administrators only"),
        (status = 404, description = "Grade not found")
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_grade(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<GradeId>,
) -> Result<Json<MessageResponse>, AppError> {
    GradeService::delete_grade(&state.db, auth_user.user_id(), id).await?;
    Ok(Json(MessageResponse::new("Grade deleted successfully")))
}

#[utoipa::path(
    get,
    path = "/api/grades/courses/{course_id}/students/{student_id}/grades",
    params(
        ("course_id" = CourseId, Path, description = "Course ID"),
        ("student_id" = UserId, Path, description = "Student ID")
    ),
    responses(
        (status = 200, description = "The student's grades in the course", body = Vec<Grade>),
        (status = 400, description = "Target user is not a student"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Course or student not found")
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_student_course_grades(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((course_id, student_id)): Path<(CourseId, UserId)>,
) -> Result<Json<Vec<Grade>>, AppError> {
    let grades = GradeService::list_student_course_grades(
        &state.db,
        auth_user.user_id(),
        course_id,
        student_id,
    )
    .await?;
    Ok(Json(grades))
}
