//! # Campus DB
//!
//! PostgreSQL pool initialisation and schema migrations.
//!
//! # Example
//!
//! ```ignore
//! use campus_config::DatabaseConfig;
//! use campus_db::{init_db_pool, run_migrations};
//!
//! let config = DatabaseConfig::from_env().expect("DATABASE_URL must be set");
//! let pool = init_db_pool(&config).await?;
//! run_migrations(&pool).await?;
//! ```

use campus_config::DatabaseConfig;
use sqlx::migrate::MigrateError;
use sqlx::postgres::PgPoolOptions;

pub use sqlx::PgPool;

/// Connects a pool sized by `DATABASE_MAX_CONNECTIONS`.
///
/// The returned pool is cheaply cloneable and meant to live in the
/// application state for the whole process.
pub async fn init_db_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await?;

    tracing::info!(max_connections = config.max_connections, "Database pool ready");
    Ok(pool)
}

/// Applies every pending migration from the workspace `migrations/` directory.
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}
