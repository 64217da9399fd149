pub mod thresholds;

pub use thresholds::{PolicyOverrides, ThresholdPolicy};

use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid threshold policy in {path}: {message}")]
    InvalidPolicy { path: String, message: String },
}

/// Tuning for the inline detection path.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionConfig {
    /// Per count-query timeout. A timed-out check counts as no violation.
    pub query_timeout: Duration,
    /// Upper bound on administrators notified at the same time.
    pub notification_concurrency: usize,
    /// Per-administrator notification write timeout.
    pub notification_timeout: Duration,
    /// Suppress repeat alerts for the same (user, abuse type, window) within
    /// this interval. `None` re-alerts on every violating action.
    pub alert_cooldown: Option<Duration>,
    /// How long a dashboard stats snapshot is served before refreshing.
    pub stats_cache_ttl: Duration,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_millis(250),
            notification_concurrency: 8,
            notification_timeout: Duration::from_secs(2),
            alert_cooldown: None,
            stats_cache_ttl: Duration::from_secs(5),
        }
    }
}

impl DetectionConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            query_timeout: env_parse::<u64>("DETECTION_QUERY_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.query_timeout),
            notification_concurrency: env_parse::<usize>("NOTIFICATION_CONCURRENCY")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.notification_concurrency),
            notification_timeout: env_parse::<u64>("NOTIFICATION_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.notification_timeout),
            alert_cooldown: env_parse::<u64>("ALERT_COOLDOWN_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            stats_cache_ttl: env_parse::<u64>("STATS_CACHE_TTL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.stats_cache_ttl),
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.alert_cooldown = Some(cooldown);
        self
    }
}

/// Settings for the security-service binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub max_db_connections: u32,
    /// Administrators used when no database directory is configured.
    pub admin_user_ids: Vec<String>,
    pub detection: DetectionConfig,
    pub policy: ThresholdPolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        // Prefer Neon URL if present, fall back to DATABASE_URL
        let database_url = env::var("DATABASE_URL_NEON")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| env::var("DATABASE_URL").ok())
            .filter(|v| !v.trim().is_empty());

        let admin_user_ids = env::var("ADMIN_USER_IDS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            port: env_parse("SECURITY_SERVICE_PORT").unwrap_or(3014),
            database_url,
            max_db_connections: env_parse("DB_MAX_CONNECTIONS").unwrap_or(10),
            admin_user_ids,
            detection: DetectionConfig::from_env(),
            policy: ThresholdPolicy::from_path(None)?,
        })
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key = key, value = %raw, "Ignoring unparsable environment variable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_defaults() {
        let config = DetectionConfig::default();
        assert_eq!(config.query_timeout, Duration::from_millis(250));
        assert_eq!(config.notification_concurrency, 8);
        assert!(config.alert_cooldown.is_none());

        let with_cooldown = config.with_cooldown(Duration::from_secs(60));
        assert_eq!(with_cooldown.alert_cooldown, Some(Duration::from_secs(60)));
    }
}
