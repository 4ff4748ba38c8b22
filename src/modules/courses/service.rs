use anyhow::Context;
use sqlx::{PgConnection, PgExecutor, PgPool};
use tracing::{info, instrument};

use campus_auth::policy::{ActionKind, ResourceRef, enforce};
use campus_core::{AppError, PaginationMeta, PaginationParams, PiiCipher};
use campus_models::{
    Course, CourseId, CreateCourseDto, Enrollment, EnrollmentId, MessageResponse,
    PaginatedCoursesResponse, Role, UpdateCourseDto, User, UserId, UserRecord,
};

use crate::modules::users::UserService;

const COURSE_COLUMNS: &str = "id, name, professor_id, created_at, updated_at";

/// Escapes `LIKE` wildcards so user input only ever matches literally.
fn like_pattern(fragment: &str) -> String {
    let escaped = fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn course_not_found() -> AppError {
    AppError::not_found(anyhow::anyhow!("Course not found"))
}

pub struct CourseService;

impl CourseService {
    pub async fn find_by_id<'e, E>(
        executor: E,
        course_id: CourseId,
    ) -> Result<Option<Course>, AppError>
    where
        E: PgExecutor<'e>,
    {
        let course = sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"
        ))
        .bind(course_id)
        .fetch_optional(executor)
        .await
        .context("Failed to fetch course")
        .map_err(AppError::database)?;

        Ok(course)
    }

    /// Like [`Self::find_by_id`], but holds a key-share lock on the row until
    /// the transaction ends, so a concurrent delete waits for the caller's
    /// dependent insert (or the caller sees the course gone).
    pub async fn find_for_share(
        conn: &mut PgConnection,
        course_id: CourseId,
    ) -> Result<Option<Course>, AppError> {
        let course = sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1 FOR KEY SHARE"
        ))
        .bind(course_id)
        .fetch_optional(conn)
        .await
        .context("Failed to fetch course")
        .map_err(AppError::database)?;

        Ok(course)
    }

    #[instrument(skip(db))]
    pub async fn list_courses(
        db: &PgPool,
        actor_id: UserId,
        params: PaginationParams,
    ) -> Result<PaginatedCoursesResponse, AppError> {
        let actor = UserService::resolve_actor(db, actor_id).await?;
        enforce(&actor, ActionKind::ReadCourse, &ResourceRef::None)?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM courses")
            .fetch_one(db)
            .await
            .context("Failed to count courses")
            .map_err(AppError::database)?;

        let courses = sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses ORDER BY name, id LIMIT $1 OFFSET $2"
        ))
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(db)
        .await
        .context("Failed to fetch courses")
        .map_err(AppError::database)?;

        Ok(PaginatedCoursesResponse {
            data: courses,
            meta: PaginationMeta::from_params(&params, total),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_course(
        db: &PgPool,
        actor_id: UserId,
        course_id: CourseId,
    ) -> Result<Course, AppError> {
        let actor = UserService::resolve_actor(db, actor_id).await?;
        enforce(&actor, ActionKind::ReadCourse, &ResourceRef::None)?;

        Self::find_by_id(db, course_id)
            .await?
            .ok_or_else(course_not_found)
    }

    /// Case-insensitive substring match on the course name.
    #[instrument(skip(db))]
    pub async fn search_courses(
        db: &PgPool,
        actor_id: UserId,
        name: &str,
    ) -> Result<Vec<Course>, AppError> {
        let actor = UserService::resolve_actor(db, actor_id).await?;
        enforce(&actor, ActionKind::ReadCourse, &ResourceRef::None)?;

        let courses = sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE name ILIKE $1 ORDER BY name, id"
        ))
        .bind(like_pattern(name.trim()))
        .fetch_all(db)
        .await
        .context("Failed to search courses")
        .map_err(AppError::database)?;

        Ok(courses)
    }

    #[instrument(skip(db, cipher))]
    pub async fn list_course_students(
        db: &PgPool,
        cipher: &PiiCipher,
        actor_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<User>, AppError> {
        let actor = UserService::resolve_actor(db, actor_id).await?;
        enforce(&actor, ActionKind::ListCourseStudents, &ResourceRef::None)?;

        if Self::find_by_id(db, course_id).await?.is_none() {
            return Err(course_not_found());
        }

        let records = sqlx::query_as::<_, UserRecord>(
            "SELECT u.id, u.name_encrypted, u.email_encrypted, u.email_hash, u.password, u.role,
                    u.created_at, u.updated_at
             FROM enrollments e
             JOIN users u ON u.id = e.student_id
             WHERE e.course_id = $1
             ORDER BY e.enrolled_at, u.id",
        )
        .bind(course_id)
        .fetch_all(db)
        .await
        .context("Failed to fetch enrolled students")
        .map_err(AppError::database)?;

        records
            .iter()
            .map(|record| record.decrypt(cipher))
            .collect::<anyhow::Result<Vec<_>>>()
            .map_err(AppError::internal)
    }

    /// A professor always owns the courses they create. An administrator
    /// must name the owning professor explicitly.
    #[instrument(skip(db))]
    pub async fn create_course(
        db: &PgPool,
        actor_id: UserId,
        dto: CreateCourseDto,
    ) -> Result<Course, AppError> {
        let mut tx = db.begin().await.map_err(AppError::database)?;

        let actor = UserService::resolve_actor(&mut *tx, actor_id).await?;
        enforce(&actor, ActionKind::CreateCourse, &ResourceRef::None)?;

        let professor_id = match actor.role {
            Role::Professor => actor.id,
            _ => {
                let professor_id = dto.professor_id.ok_or_else(|| {
                    AppError::bad_request(anyhow::anyhow!("professor_id is required"))
                })?;
                let owner_role =
                    sqlx::query_scalar::<_, Role>("SELECT role FROM users WHERE id = $1")
                        .bind(professor_id)
                        .fetch_optional(&mut *tx)
                        .await
                        .context("Failed to fetch professor")
                        .map_err(AppError::database)?
                        .ok_or_else(|| {
                            AppError::not_found(anyhow::anyhow!("Professor not found"))
                        })?;
                if !owner_role.can_teach() {
                    return Err(AppError::bad_request(anyhow::anyhow!(
                        "User cannot own a course"
                    )));
                }
                professor_id
            }
        };

        let name = dto.name.trim();
        if name.is_empty() {
            return Err(AppError::bad_request(anyhow::anyhow!("Name cannot be empty")));
        }

        let course = sqlx::query_as::<_, Course>(&format!(
            "INSERT INTO courses (id, name, professor_id) VALUES ($1, $2, $3)
             RETURNING {COURSE_COLUMNS}"
        ))
        .bind(CourseId::new())
        .bind(name)
        .bind(professor_id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to create course")
        .map_err(AppError::database)?;

        tx.commit().await.map_err(AppError::database)?;

        info!(course_id = %course.id, professor_id = %course.professor_id, "Course created");
        Ok(course)
    }

    #[instrument(skip(db))]
    pub async fn update_course(
        db: &PgPool,
        actor_id: UserId,
        course_id: CourseId,
        dto: UpdateCourseDto,
    ) -> Result<Course, AppError> {
        let mut tx = db.begin().await.map_err(AppError::database)?;

        let actor = UserService::resolve_actor(&mut *tx, actor_id).await?;

        let current = sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1 FOR UPDATE"
        ))
        .bind(course_id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to fetch course")
        .map_err(AppError::database)?
        .ok_or_else(course_not_found)?;

        enforce(
            &actor,
            ActionKind::UpdateCourse,
            &ResourceRef::Course {
                professor_id: current.professor_id,
            },
        )?;

        let name = dto.name.trim();
        if name.is_empty() {
            return Err(AppError::bad_request(anyhow::anyhow!("Name cannot be empty")));
        }

        let course = sqlx::query_as::<_, Course>(&format!(
            "UPDATE courses SET name = $2, updated_at = NOW() WHERE id = $1
             RETURNING {COURSE_COLUMNS}"
        ))
        .bind(course_id)
        .bind(name)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to update course")
        .map_err(AppError::database)?;

        tx.commit().await.map_err(AppError::database)?;
        Ok(course)
    }

    /// Removes the course together with its grades and enrollments. Either all
    /// three go or none do.
    #[instrument(skip(db))]
    pub async fn delete_course(
        db: &PgPool,
        actor_id: UserId,
        course_id: CourseId,
    ) -> Result<(), AppError> {
        let mut tx = db.begin().await.map_err(AppError::database)?;

        let actor = UserService::resolve_actor(&mut *tx, actor_id).await?;
        enforce(&actor, ActionKind::DeleteCourse, &ResourceRef::None)?;

        let locked = sqlx::query_scalar::<_, CourseId>(
            "SELECT id FROM courses WHERE id = $1 FOR UPDATE",
        )
        .bind(course_id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to fetch course")
        .map_err(AppError::database)?;

        if locked.is_none() {
            return Err(course_not_found());
        }

        let grades = sqlx::query("DELETE FROM grades WHERE course_id = $1")
            .bind(course_id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete course grades")
            .map_err(AppError::database)?
            .rows_affected();

        let enrollments = sqlx::query("DELETE FROM enrollments WHERE course_id = $1")
            .bind(course_id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete course enrollments")
            .map_err(AppError::database)?
            .rows_affected();

        sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(course_id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete course")
            .map_err(AppError::database)?;

        tx.commit().await.map_err(AppError::database)?;

        info!(course_id = %course_id, grades, enrollments, "Course deleted");
        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn join_course(
        db: &PgPool,
        actor_id: UserId,
        course_id: CourseId,
    ) -> Result<Enrollment, AppError> {
        let mut tx = db.begin().await.map_err(AppError::database)?;

        let actor = UserService::resolve_actor(&mut *tx, actor_id).await?;
        enforce(
            &actor,
            ActionKind::JoinCourse,
            &ResourceRef::Enrollment {
                student_id: actor.id,
            },
        )?;

        if Self::find_for_share(&mut *tx, course_id).await?.is_none() {
            return Err(course_not_found());
        }

        let enrollment = sqlx::query_as::<_, Enrollment>(
            "INSERT INTO enrollments (id, student_id, course_id) VALUES ($1, $2, $3)
             ON CONFLICT (student_id, course_id) DO NOTHING
             RETURNING id, student_id, course_id, enrolled_at",
        )
        .bind(EnrollmentId::new())
        .bind(actor.id)
        .bind(course_id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to enroll student")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::conflict(anyhow::anyhow!("Already enrolled in this course")))?;

        tx.commit().await.map_err(AppError::database)?;

        info!(student_id = %actor.id, course_id = %course_id, "Student joined course");
        Ok(enrollment)
    }

    #[instrument(skip(db))]
    pub async fn leave_course(
        db: &PgPool,
        actor_id: UserId,
        course_id: CourseId,
    ) -> Result<MessageResponse, AppError> {
        let actor = UserService::resolve_actor(db, actor_id).await?;
        enforce(
            &actor,
            ActionKind::LeaveCourse,
            &ResourceRef::Enrollment {
                student_id: actor.id,
            },
        )?;

        let removed = sqlx::query_scalar::<_, EnrollmentId>(
            "DELETE FROM enrollments WHERE student_id = $1 AND course_id = $2 RETURNING id",
        )
        .bind(actor.id)
        .bind(course_id)
        .fetch_optional(db)
        .await
        .context("Failed to unenroll student")
        .map_err(AppError::database)?;

        if removed.is_none() {
            return Err(AppError::not_found(anyhow::anyhow!(
                "Not enrolled in this course"
            )));
        }

        info!(student_id = %actor.id, course_id = %course_id, "Student left course");
        Ok(MessageResponse::new("Left course successfully"))
    }
}
