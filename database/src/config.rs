use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub connect_timeout_seconds: u64,
    /// 0 disables server-side prepared statements (pgbouncer / Neon pooling)
    pub statement_cache_capacity: usize,
}

impl DatabaseConfig {
    /// `None` when neither `DATABASE_URL_NEON` nor `DATABASE_URL` is set.
    pub fn from_env() -> Option<Self> {
        let database_url = env::var("DATABASE_URL_NEON")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| env::var("DATABASE_URL").ok())
            .filter(|v| !v.trim().is_empty())?;

        let mut config = Self::new(database_url);
        config.max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(config.max_connections);
        config.connect_timeout_seconds = env::var("DB_CONNECT_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(config.connect_timeout_seconds);
        Some(config)
    }

    pub fn new(database_url: String) -> Self {
        Self {
            database_url,
            max_connections: 10,
            connect_timeout_seconds: 30,
            statement_cache_capacity: 0,
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }
}
