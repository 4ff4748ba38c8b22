mod common;

use axum::http::StatusCode;
use campus_models::Role;
use common::{create_test_course, create_test_user, enroll, send, setup_test_app};
use serde_json::json;
use sqlx::PgPool;
use std::time::Duration;

#[sqlx::test(migrations = "./migrations")]
async fn test_professor_creates_and_owns_course(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let professor = create_test_user(&mut tx, Role::Professor).await;
    let other = create_test_user(&mut tx, Role::Professor).await;
    tx.commit().await.unwrap();

    let app = setup_test_app(pool);
    let (status, body) = send(
        &app,
        "POST",
        "/api/courses",
        Some(&professor.token),
        Some(json!({ "name": "CS101", "professor_id": other.id })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "CS101");
    assert_eq!(body["professor_id"], professor.id.to_string());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_student_cannot_create_course(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let student = create_test_user(&mut tx, Role::Student).await;
    tx.commit().await.unwrap();

    let app = setup_test_app(pool);
    let (status, _) = send(
        &app,
        "POST",
        "/api/courses",
        Some(&student.token),
        Some(json!({ "name": "CS101" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "GET", "/api/courses", Some(&student.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["meta"]["total"], 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_admin_must_name_a_teaching_owner(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, Role::Administrator).await;
    let professor = create_test_user(&mut tx, Role::Professor).await;
    let student = create_test_user(&mut tx, Role::Student).await;
    tx.commit().await.unwrap();

    let app = setup_test_app(pool);

    let (status, _) = send(
        &app,
        "POST",
        "/api/courses",
        Some(&admin.token),
        Some(json!({ "name": "CS101" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/courses",
        Some(&admin.token),
        Some(json!({ "name": "CS101", "professor_id": student.id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/courses",
        Some(&admin.token),
        Some(json!({ "name": "CS101", "professor_id": uuid::Uuid::new_v4() })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        "POST",
        "/api/courses",
        Some(&admin.token),
        Some(json!({ "name": "CS101", "professor_id": professor.id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["professor_id"], professor.id.to_string());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_course_name_is_validated(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let professor = create_test_user(&mut tx, Role::Professor).await;
    tx.commit().await.unwrap();

    let app = setup_test_app(pool);
    let (status, _) = send(
        &app,
        "POST",
        "/api/courses",
        Some(&professor.token),
        Some(json!({ "name": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_any_role_reads_and_searches_courses(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let professor = create_test_user(&mut tx, Role::Professor).await;
    let student = create_test_user(&mut tx, Role::Student).await;
    let cs101 = create_test_course(&mut tx, "CS101 Intro", professor.id).await;
    create_test_course(&mut tx, "MATH200", professor.id).await;
    create_test_course(&mut tx, "100% Effort", professor.id).await;
    tx.commit().await.unwrap();

    let app = setup_test_app(pool);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/courses/{cs101}"),
        Some(&student.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "CS101 Intro");

    let (status, body) =
        send(&app, "GET", "/api/courses/search?name=cs1", Some(&student.token), None).await;
    assert_eq!(status, StatusCode::OK);
    let found = body.as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["id"], cs101.to_string());

    // `%` is matched literally
    let (status, body) =
        send(&app, "GET", "/api/courses/search?name=%25", Some(&student.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) =
        send(&app, "GET", "/api/courses?limit=2", Some(&student.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["meta"]["total"], 3);
    assert_eq!(body["meta"]["has_more"], true);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_get_unknown_course_is_not_found(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let student = create_test_user(&mut tx, Role::Student).await;
    tx.commit().await.unwrap();

    let app = setup_test_app(pool);
    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/courses/{}", uuid::Uuid::new_v4()),
        Some(&student.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_only_owner_or_admin_updates_course(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, Role::Administrator).await;
    let owner = create_test_user(&mut tx, Role::Professor).await;
    let other = create_test_user(&mut tx, Role::Professor).await;
    let course_id = create_test_course(&mut tx, "CS101", owner.id).await;
    tx.commit().await.unwrap();

    let app = setup_test_app(pool);
    let uri = format!("/api/courses/{course_id}");

    let (status, _) = send(&app, "PUT", &uri, Some(&other.token), Some(json!({ "name": "Hijack" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) =
        send(&app, "PUT", &uri, Some(&owner.token), Some(json!({ "name": "CS101 v2" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "CS101 v2");

    let (status, body) =
        send(&app, "PUT", &uri, Some(&admin.token), Some(json!({ "name": "CS101 v3" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "CS101 v3");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_update_unknown_course_is_not_found(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let professor = create_test_user(&mut tx, Role::Professor).await;
    tx.commit().await.unwrap();

    let app = setup_test_app(pool);
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/courses/{}", uuid::Uuid::new_v4()),
        Some(&professor.token),
        Some(json!({ "name": "Ghost" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_join_and_leave(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let professor = create_test_user(&mut tx, Role::Professor).await;
    let student = create_test_user(&mut tx, Role::Student).await;
    let course_id = create_test_course(&mut tx, "CS101", professor.id).await;
    tx.commit().await.unwrap();

    let app = setup_test_app(pool.clone());
    let body = json!({ "course_id": course_id });

    let (status, enrollment) =
        send(&app, "POST", "/api/courses/join", Some(&student.token), Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(enrollment["student_id"], student.id.to_string());
    assert_eq!(enrollment["course_id"], course_id.to_string());

    let (status, error) =
        send(&app, "POST", "/api/courses/join", Some(&student.token), Some(body.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error"], "Already enrolled in this course");

    let enrollments: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM enrollments WHERE student_id = $1 AND course_id = $2",
    )
    .bind(student.id)
    .bind(course_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(enrollments, 1);

    let (status, _) =
        send(&app, "POST", "/api/courses/leave", Some(&student.token), Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, error) =
        send(&app, "POST", "/api/courses/leave", Some(&student.token), Some(body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["error"], "Not enrolled in this course");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_join_unknown_course_is_not_found(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let student = create_test_user(&mut tx, Role::Student).await;
    tx.commit().await.unwrap();

    let app = setup_test_app(pool);
    let (status, _) = send(
        &app,
        "POST",
        "/api/courses/join",
        Some(&student.token),
        Some(json!({ "course_id": uuid::Uuid::new_v4() })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_join_waiting_on_course_delete_is_not_found(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let professor = create_test_user(&mut tx, Role::Professor).await;
    let student = create_test_user(&mut tx, Role::Student).await;
    let course_id = create_test_course(&mut tx, "CS101", professor.id).await;
    tx.commit().await.unwrap();

    // Hold the course the way a course delete does.
    let mut deleting = pool.begin().await.unwrap();
    sqlx::query("SELECT id FROM courses WHERE id = $1 FOR UPDATE")
        .bind(course_id)
        .execute(&mut *deleting)
        .await
        .unwrap();

    let app = setup_test_app(pool.clone());
    let token = student.token.clone();
    let join = tokio::spawn(async move {
        send(
            &app,
            "POST",
            "/api/courses/join",
            Some(&token),
            Some(json!({ "course_id": course_id })),
        )
        .await
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    sqlx::query("DELETE FROM courses WHERE id = $1")
        .bind(course_id)
        .execute(&mut *deleting)
        .await
        .unwrap();
    deleting.commit().await.unwrap();

    let (status, body) = join.await.unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Course not found");

    let enrollments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM enrollments")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(enrollments, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_only_students_join(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, Role::Administrator).await;
    let professor = create_test_user(&mut tx, Role::Professor).await;
    let course_id = create_test_course(&mut tx, "CS101", professor.id).await;
    tx.commit().await.unwrap();

    let app = setup_test_app(pool);
    for token in [&admin.token, &professor.token] {
        let (status, _) = send(
            &app,
            "POST",
            "/api/courses/join",
            Some(token),
            Some(json!({ "course_id": course_id })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn test_list_course_students(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let professor = create_test_user(&mut tx, Role::Professor).await;
    let student = create_test_user(&mut tx, Role::Student).await;
    let course_id = create_test_course(&mut tx, "CS101", professor.id).await;
    enroll(&mut tx, student.id, course_id).await;
    tx.commit().await.unwrap();

    let app = setup_test_app(pool);
    let uri = format!("/api/courses/{course_id}/students");

    let (status, body) = send(&app, "GET", &uri, Some(&professor.token), None).await;
    assert_eq!(status, StatusCode::OK);
    let students = body.as_array().unwrap();
    assert_eq!(students.len(), 1);
    assert_eq!(students[0]["email"], student.email);
    assert_eq!(students[0]["name"], student.name);

    let (status, _) = send(&app, "GET", &uri, Some(&student.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_course_removes_enrollments_and_grades(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let admin = create_test_user(&mut tx, Role::Administrator).await;
    let professor = create_test_user(&mut tx, Role::Professor).await;
    let student = create_test_user(&mut tx, Role::Student).await;
    let course_id = create_test_course(&mut tx, "CS101", professor.id).await;
    enroll(&mut tx, student.id, course_id).await;
    tx.commit().await.unwrap();

    let app = setup_test_app(pool.clone());

    let (status, grade) = send(
        &app,
        "POST",
        "/api/grades",
        Some(&professor.token),
        Some(json!({
            "course_id": course_id,
            "student_id": student.id,
            "value": 90.0,
            "name": "Midterm"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let grade_id = grade["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/courses/{course_id}"),
        Some(&professor.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/api/courses/{course_id}"),
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Course deleted successfully");

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/courses/{course_id}"),
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/grades/{grade_id}"),
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let enrollments: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM enrollments WHERE course_id = $1")
            .bind(course_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(enrollments, 0);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/courses/{course_id}"),
        Some(&admin.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
