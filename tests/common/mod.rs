#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use std::io;
use std::sync::{Arc, Mutex};
use sqlx::{PgPool, Postgres, Transaction};
use tower::ServiceExt;
use uuid::Uuid;

use campus::init_router;
use campus::state::AppState;
use campus_auth::create_access_token;
use campus_config::{CorsConfig, EncryptionConfig, JwtConfig, PasswordPolicyConfig};
use campus_core::{PiiCipher, email_lookup_key, hash_password};
use campus_models::{CourseId, Role, UserId};

pub const TEST_PASSWORD: &str = "Str0ng!pass";

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "integration-test-secret".to_string(),
        access_token_expiry: 900,
    }
}

pub fn test_encryption_config() -> EncryptionConfig {
    EncryptionConfig {
        secret: "integration-test-pii-key".to_string(),
    }
}

pub fn test_cipher() -> PiiCipher {
    PiiCipher::from_secret(&test_encryption_config().secret)
}

pub fn test_state(pool: PgPool) -> AppState {
    AppState::new(
        pool,
        test_jwt_config(),
        CorsConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        PasswordPolicyConfig::default(),
        &test_encryption_config(),
    )
}

pub fn setup_test_app(pool: PgPool) -> Router {
    init_router(test_state(pool))
}

pub struct TestUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub token: String,
}

/// Inserts a user directly, encoded exactly as the API stores it, and issues
/// a token for it.
pub async fn create_test_user(tx: &mut Transaction<'_, Postgres>, role: Role) -> TestUser {
    let cipher = test_cipher();
    let email = generate_unique_email();
    let name = format!("Test {role}");
    let hashed = hash_password(TEST_PASSWORD).unwrap();
    let id = UserId::new();

    sqlx::query(
        "INSERT INTO users (id, name_encrypted, email_encrypted, email_hash, password, role)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(id)
    .bind(cipher.encrypt(&name).unwrap())
    .bind(cipher.encrypt(&email).unwrap())
    .bind(email_lookup_key(&email))
    .bind(&hashed)
    .bind(role)
    .execute(&mut **tx)
    .await
    .unwrap();

    let token = create_access_token(id, role, &test_jwt_config()).unwrap();

    TestUser {
        id,
        name,
        email,
        password: TEST_PASSWORD.to_string(),
        role,
        token,
    }
}

pub async fn create_test_course(
    tx: &mut Transaction<'_, Postgres>,
    name: &str,
    professor_id: UserId,
) -> CourseId {
    let id = CourseId::new();
    sqlx::query("INSERT INTO courses (id, name, professor_id) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(name)
        .bind(professor_id)
        .execute(&mut **tx)
        .await
        .unwrap();
    id
}

pub async fn enroll(tx: &mut Transaction<'_, Postgres>, student_id: UserId, course_id: CourseId) {
    sqlx::query("INSERT INTO enrollments (id, student_id, course_id) VALUES ($1, $2, $3)")
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(course_id)
        .execute(&mut **tx)
        .await
        .unwrap();
}

pub fn generate_unique_email() -> String {
    format!("test-{}@campus.test", Uuid::new_v4())
}

/// Sends one request through the router and returns the status with the
/// parsed JSON body (`Value::Null` when the body is empty).
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }

    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, body)
}

/// Shared in-memory sink for captured log output.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Routes this thread's events through a JSON layer that records span
/// fields, the same shape the rolling JSON log file gets.
pub fn capture_logs() -> (tracing::subscriber::DefaultGuard, LogBuffer) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_max_level(tracing::Level::TRACE)
        .with_writer(move || writer.clone())
        .finish();
    (tracing::subscriber::set_default(subscriber), buffer)
}
