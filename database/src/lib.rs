// PostgreSQL persistence for the abuse detection engine.
// Each repository implements one of the engine's store traits.

pub mod config;
pub mod models;
pub mod repositories;

// Re-export commonly used items
pub use sqlx;
pub use config::DatabaseConfig;
pub use repositories::{
    PgActivityEventStore, PgAdministratorDirectory, PgAlertStore, PgNotificationStore, RepositoryManager,
};

use anyhow::{Context, Result};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use std::str::FromStr;
use std::time::Duration;

/// Database connection manager
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database instance from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let connect_options = PgConnectOptions::from_str(&config.database_url)
            .context("Invalid database URL")?
            .statement_cache_capacity(config.statement_cache_capacity);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .connect_with(connect_options)
            .await
            .context("Failed to connect to database")?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn repositories(&self) -> RepositoryManager {
        RepositoryManager::new(self.pool.clone())
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run migrations")?;
        Ok(())
    }

    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
