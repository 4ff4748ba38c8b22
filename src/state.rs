use anyhow::Context;
use campus_config::{
    CorsConfig, DatabaseConfig, EncryptionConfig, JwtConfig, PasswordPolicyConfig,
};
use campus_core::PiiCipher;
use campus_db::{PgPool, init_db_pool, run_migrations};

#[derive(Clone, Debug)]
pub struct AppState {
    pub db: PgPool,
    pub jwt_config: JwtConfig,
    pub cors_config: CorsConfig,
    pub password_policy: PasswordPolicyConfig,
    pub cipher: PiiCipher,
}

impl AppState {
    pub fn new(
        db: PgPool,
        jwt_config: JwtConfig,
        cors_config: CorsConfig,
        password_policy: PasswordPolicyConfig,
        encryption: &EncryptionConfig,
    ) -> Self {
        Self {
            db,
            jwt_config,
            cors_config,
            password_policy,
            cipher: PiiCipher::from_secret(&encryption.secret),
        }
    }
}

/// Builds the state from the environment, connecting to the database and
/// applying pending migrations.
pub async fn init_app_state() -> anyhow::Result<AppState> {
    let database_config = DatabaseConfig::from_env().context("DATABASE_URL must be set")?;

    let db = init_db_pool(&database_config)
        .await
        .context("Failed to connect to database")?;
    run_migrations(&db)
        .await
        .context("Failed to run database migrations")?;

    Ok(AppState::new(
        db,
        JwtConfig::from_env(),
        CorsConfig::from_env(),
        PasswordPolicyConfig::from_env(),
        &EncryptionConfig::from_env(),
    ))
}
