use anyhow::Context;
use sqlx::PgPool;
use tracing::{info, instrument};

use campus_auth::policy::{ActionKind, ResourceRef, enforce};
use campus_core::AppError;
use campus_models::{
    AssignGradeDto, CourseId, Grade, GradeId, Role, UpdateGradeDto, UserId,
};

use crate::modules::courses::CourseService;
use crate::modules::users::UserService;

const GRADE_COLUMNS: &str = "id, name, course_id, student_id, value, created_at, updated_at";

fn grade_not_found() -> AppError {
    AppError::not_found(anyhow::anyhow!("Grade not found"))
}

fn trimmed_label(name: Option<&str>) -> Option<String> {
    name.map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
}

pub struct GradeService;

impl GradeService {
    /// Ensures the course and the student exist and that the student really
    /// is a student. Both rows stay key-share locked for the rest of the
    /// caller's transaction.
    async fn check_course_and_student(
        conn: &mut sqlx::PgConnection,
        course_id: CourseId,
        student_id: UserId,
    ) -> Result<(), AppError> {
        if CourseService::find_for_share(&mut *conn, course_id)
            .await?
            .is_none()
        {
            return Err(AppError::not_found(anyhow::anyhow!("Course not found")));
        }

        let role =
            sqlx::query_scalar::<_, Role>("SELECT role FROM users WHERE id = $1 FOR KEY SHARE")
                .bind(student_id)
                .fetch_optional(&mut *conn)
                .await
                .context("Failed to fetch student")
                .map_err(AppError::database)?
                .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Student not found")))?;

        if role != Role::Student {
            return Err(AppError::bad_request(anyhow::anyhow!("User is not a student")));
        }

        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn list_grades(db: &PgPool, actor_id: UserId) -> Result<Vec<Grade>, AppError> {
        let actor = UserService::resolve_actor(db, actor_id).await?;
        enforce(&actor, ActionKind::ListGrades, &ResourceRef::None)?;

        let grades = sqlx::query_as::<_, Grade>(&format!(
            "SELECT {GRADE_COLUMNS} FROM grades ORDER BY created_at DESC, id"
        ))
        .fetch_all(db)
        .await
        .context("Failed to fetch grades")
        .map_err(AppError::database)?;

        Ok(grades)
    }

    #[instrument(skip(db))]
    pub async fn get_grade(
        db: &PgPool,
        actor_id: UserId,
        grade_id: GradeId,
    ) -> Result<Grade, AppError> {
        let actor = UserService::resolve_actor(db, actor_id).await?;

        let grade = sqlx::query_as::<_, Grade>(&format!(
            "SELECT {GRADE_COLUMNS} FROM grades WHERE id = $1"
        ))
        .bind(grade_id)
        .fetch_optional(db)
        .await
        .context("Failed to fetch grade")
        .map_err(AppError::database)?
        .ok_or_else(grade_not_found)?;

        enforce(
            &actor,
            ActionKind::ReadGrade,
            &ResourceRef::Grade {
                student_id: grade.student_id,
            },
        )?;

        Ok(grade)
    }

    #[instrument(skip(db))]
    pub async fn assign_grade(
        db: &PgPool,
        actor_id: UserId,
        dto: AssignGradeDto,
    ) -> Result<Grade, AppError> {
        let mut tx = db.begin().await.map_err(AppError::database)?;

        let actor = UserService::resolve_actor(&mut *tx, actor_id).await?;
        enforce(&actor, ActionKind::AssignGrade, &ResourceRef::None)?;

        Self::check_course_and_student(&mut *tx, dto.course_id, dto.student_id).await?;

        let grade = sqlx::query_as::<_, Grade>(&format!(
            "INSERT INTO grades (id, name, course_id, student_id, value)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {GRADE_COLUMNS}"
        ))
        .bind(GradeId::new())
        .bind(trimmed_label(dto.name.as_deref()))
        .bind(dto.course_id)
        .bind(dto.student_id)
        .bind(dto.value)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to assign grade")
        .map_err(AppError::database)?;

        tx.commit().await.map_err(AppError::database)?;

        info!(
            grade_id = %grade.id,
            course_id = %grade.course_id,
            student_id = %grade.student_id,
            assigned_by = %actor.id,
            "Grade assigned"
        );
        Ok(grade)
    }

    /// Replaces the value. The label is only changed when one is supplied.
    #[instrument(skip(db))]
    pub async fn update_grade(
        db: &PgPool,
        actor_id: UserId,
        grade_id: GradeId,
        dto: UpdateGradeDto,
    ) -> Result<Grade, AppError> {
        let mut tx = db.begin().await.map_err(AppError::database)?;

        let actor = UserService::resolve_actor(&mut *tx, actor_id).await?;
        enforce(&actor, ActionKind::UpdateGrade, &ResourceRef::None)?;

        let locked = sqlx::query_scalar::<_, GradeId>(
            "SELECT id FROM grades WHERE id = $1 FOR UPDATE",
        )
        .bind(grade_id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to fetch grade")
        .map_err(AppError::database)?;

        if locked.is_none() {
            return Err(grade_not_found());
        }

        let grade = sqlx::query_as::<_, Grade>(&format!(
            "UPDATE grades SET value = $2, name = COALESCE($3, name), updated_at = NOW()
             WHERE id = $1
             RETURNING {GRADE_COLUMNS}"
        ))
        .bind(grade_id)
        .bind(dto.value)
        .bind(trimmed_label(dto.name.as_deref()))
        .fetch_one(&mut *tx)
        .await
        .context("Failed to update grade")
        .map_err(AppError::database)?;

        tx.commit().await.map_err(AppError::database)?;
        Ok(grade)
    }

    #[instrument(skip(db))]
    pub async fn delete_grade(
        db: &PgPool,
        actor_id: UserId,
        grade_id: GradeId,
    ) -> Result<(), AppError> {
        let actor = UserService::resolve_actor(db, actor_id).await?;
        enforce(&actor, ActionKind::DeleteGrade, &ResourceRef::None)?;

        let result = sqlx::query("DELETE FROM grades WHERE id = $1")
            .bind(grade_id)
            .execute(db)
            .await
            .context("Failed to delete grade")
            .map_err(AppError::database)?;

        if result.rows_affected() == 0 {
            return Err(grade_not_found());
        }

        info!(grade_id = %grade_id, "Grade deleted");
        Ok(())
    }

    /// All grades one student holds in one course, oldest first.
    #[instrument(skip(db))]
    pub async fn list_student_course_grades(
        db: &PgPool,
        actor_id: UserId,
        course_id: CourseId,
        student_id: UserId,
    ) -> Result<Vec<Grade>, AppError> {
        let mut conn = db.acquire().await.map_err(AppError::database)?;

        let actor = UserService::resolve_actor(&mut *conn, actor_id).await?;
        Self::check_course_and_student(&mut *conn, course_id, student_id).await?;
        enforce(
            &actor,
            ActionKind::ListStudentGrades,
            &ResourceRef::StudentRecord { student_id },
        )?;

        let grades = sqlx::query_as::<_, Grade>(&format!(
            "SELECT {GRADE_COLUMNS} FROM grades
             WHERE course_id = $1 AND student_id = $2
             ORDER BY created_at, id"
        ))
        .bind(course_id)
        .bind(student_id)
        .fetch_all(&mut *conn)
        .await
        .context("Failed to fetch grades")
        .map_err(AppError::database)?;

        Ok(grades)
    }
}
