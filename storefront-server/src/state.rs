//! Application state

use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;
use crate::error::AppError;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection pool
    pub pool: SqlitePool,
    /// JWT secret for store-owner authentication
    pub jwt_secret: String,
}

impl AppState {
    /// Create a new AppState: open the database and apply migrations
    pub async fn new(config: &Config) -> Result<Self, AppError> {
        let pool = db::connect(&config.database_path).await?;

        Ok(Self {
            pool,
            jwt_secret: config.jwt_secret.clone(),
        })
    }

    /// State backed by an existing pool (tests)
    pub fn with_pool(pool: SqlitePool, jwt_secret: impl Into<String>) -> Self {
        Self {
            pool,
            jwt_secret: jwt_secret.into(),
        }
    }
}
