use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use campus_core::{PaginationMeta, PaginationParams};
use campus_models::{
    AssignGradeDto, ChangePasswordRequest, Course, CreateCourseDto, CreateUserDto, Enrollment,
    EnrollmentRequest, Grade, LoginRequest, LoginResponse, MessageResponse,
    PaginatedCoursesResponse, PaginatedUsersResponse, RegisterRequest, Role, UpdateCourseDto,
    UpdateGradeDto, UpdateUserDto, User, UserDetail,
};

use crate::modules::auth::controller::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::controller::register_user,
        crate::modules::auth::controller::login_user,
        crate::modules::auth::controller::get_profile,
        crate::modules::auth::controller::change_password,
        crate::modules::users::controller::get_users,
        crate::modules::users::controller::search_users,
        crate::modules::users::controller::get_user,
        crate::modules::users::controller::create_user,
        crate::modules::users::controller::update_user,
        crate::modules::users::controller::delete_user,
        crate::modules::courses::controller::get_courses,
        crate::modules::courses::controller::search_courses,
        crate::modules::courses::controller::get_course,
        crate::modules::courses::controller::get_course_students,
        crate::modules::courses::controller::create_course,
        crate::modules::courses::controller::update_course,
        crate::modules::courses::controller::delete_course,
        crate::modules::courses::controller::join_course,
        crate::modules::courses::controller::leave_course,
        crate::modules::grades::controller::get_grades,
        crate::modules::grades::controller::get_grade,
        crate::modules::grades::controller::assign_grade,
        crate::modules::grades::controller::update_grade,
        crate::modules::grades::controller::delete_grade,
        crate::modules::grades::controller::get_student_course_grades,
    ),
    components(
        schemas(
            Role,
            User,
            UserDetail,
            CreateUserDto,
            UpdateUserDto,
            PaginatedUsersResponse,
            Course,
            CreateCourseDto,
            UpdateCourseDto,
            Enrollment,
            EnrollmentRequest,
            PaginatedCoursesResponse,
            Grade,
            AssignGradeDto,
            UpdateGradeDto,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            ChangePasswordRequest,
            MessageResponse,
            ErrorResponse,
            PaginationMeta,
            PaginationParams,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration, login and password changes"),
        (name = "Users", description = "User management"),
        (name = "Courses", description = "Courses and enrollment"),
        (name = "Grades", description = "Grade assignment and lookup")
    ),
    info(
        title = "Campus API",
        version = "0.1.0",
        description = "University records API: users, courses, enrollments and grades, with role-based access control and encrypted personal data.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}
