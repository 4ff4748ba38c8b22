use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::instrument;

use campus_core::{AppError, PaginationParams};
use campus_models::{
    Course, CourseId, CourseSearchParams, CreateCourseDto, Enrollment, EnrollmentRequest,
    MessageResponse, PaginatedCoursesResponse, UpdateCourseDto, User,
};

use crate::middleware::auth::AuthUser;
use crate::modules::courses::service::CourseService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    get,
    path = "/api/courses",
    params(PaginationParams),
    responses(
        (status = 200, description = "Paginated list of courses", body = PaginatedCoursesResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_courses(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PaginatedCoursesResponse>, AppError> {
    let courses = CourseService::list_courses(&state.db, auth_user.user_id(), params).await?;
    Ok(Json(courses))
}

#[utoipa::path(
    get,
    path = "/api/courses/search",
    params(CourseSearchParams),
    responses(
        (status = 200, description = "Courses whose name contains the fragment", body = Vec<Course>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn search_courses(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<CourseSearchParams>,
) -> Result<Json<Vec<Course>>, AppError> {
    let courses =
        CourseService::search_courses(&state.db, auth_user.user_id(), &params.name).await?;
    Ok(Json(courses))
}

#[utoipa::path(
    get,
    path = "/api/courses/{id}",
    params(
        ("id" = CourseId, Path, description = "Course ID")
    ),
    responses(
        (status = 200, description = "Course details", body = Course),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Course not found")
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_course(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<CourseId>,
) -> Result<Json<Course>, AppError> {
    let course = CourseService::get_course(&state.db, auth_user.user_id(), id).await?;
    Ok(Json(course))
}

#[utoipa::path(
    get,
    path = "/api/courses/{id}/students",
    params(
        ("id" = CourseId, Path, description = "Course ID")
    ),
    responses(
        (status = 200, description = "Students enrolled in the course", body = Vec<User>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - professors and administrators only"),
        (status = 404, description = "Course not found")
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_course_students(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<CourseId>,
) -> Result<Json<Vec<User>>, AppError> {
    let students =
        CourseService::list_course_students(&state.db, &state.cipher, auth_user.user_id(), id)
            .await?;
    Ok(Json(students))
}

#[utoipa::path(
    post,
    path = "/api/courses",
    request_body = CreateCourseDto,
    responses(
        (status = 200, description = "Course created", body = Course),
        (status = 400, description = "Invalid input or owner cannot teach"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - professors and administrators only"),
        (status = 404, description = "Professor not found")
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_course(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<CreateCourseDto>,
) -> Result<Json<Course>, AppError> {
    let course = CourseService::create_course(&state.db, auth_user.user_id(), dto).await?;
    Ok(Json(course))
}

#[utoipa::path(
    put,
    path = "/api/courses/{id}",
    params(
        ("id" = CourseId, Path, description = "Course ID")
    ),
    request_body = UpdateCourseDto,
    responses(
        (status = 200, description = "Course updated", body = Course),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - owner or administrator only"),
        (status = 404, description = "Course not found")
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_course(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<CourseId>,
    ValidatedJson(dto): ValidatedJson<UpdateCourseDto>,
) -> Result<Json<Course>, AppError> {
    let course = CourseService::update_course(&state.db, auth_user.user_id(), id, dto).await?;
    Ok(Json(course))
}

/// Delete a course with its enrollments and grades
#[utoipa::path(
    delete,
    path = "/api/courses/{id}",
    params(
        ("id" = CourseId, Path, description = "Course ID")
    ),
    responses(
        (status = 200, description = "Course deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - administrators only"),
        (status = 404, description = "Course not found")
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_course(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<CourseId>,
) -> Result<Json<MessageResponse>, AppError> {
    CourseService::delete_course(&state.db, auth_user.user_id(), id).await?;
    Ok(Json(MessageResponse::new("Course deleted successfully")))
}

#[utoipa::path(
    post,
    path = "/api/courses/join",
    request_body = EnrollmentRequest,
    responses(
        (status = 200, description = "Enrolled", body = Enrollment),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - students only"),
        (status = 404, description = "Course not found"),
        (status = 409, description = "Already enrolled")
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn join_course(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<EnrollmentRequest>,
) -> Result<Json<Enrollment>, AppError> {
    let enrollment =
        CourseService::join_course(&state.db, auth_user.user_id(), dto.course_id).await?;
    Ok(Json(enrollment))
}

#[utoipa::path(
    post,
    path = "/api/courses/leave",
    request_body = EnrollmentRequest,
    responses(
        (status = 200, description = "Unenrolled", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - students only"),
        (status = 404, description = "Not enrolled in this course")
    ),
    tag = "Courses",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn leave_course(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<EnrollmentRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let message =
        CourseService::leave_course(&state.db, auth_user.user_id(), dto.course_id).await?;
    Ok(Json(message))
}
