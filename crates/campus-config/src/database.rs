use std::env;

/// PostgreSQL connection settings.
///
/// `DATABASE_URL` has no default; [`DatabaseConfig::from_env`] returns `None`
/// when it is missing so the caller decides how to fail.
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn from_env() -> Option<Self> {
        let url = env::var("DATABASE_URL").ok()?;

        Some(Self {
            url,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
        })
    }
}
