// Store trait implementations over PgPool

pub mod activity;
pub mod administrators;
pub mod alerts;
pub mod notifications;

pub use activity::PgActivityEventStore;
pub use administrators::PgAdministratorDirectory;
pub use alerts::PgAlertStore;
pub use notifications::PgNotificationStore;

use abuseguard_engine::AbuseError;
use sqlx::PgPool;

/// Repository manager that provides access to all repositories
pub struct RepositoryManager {
    pool: PgPool,
}

impl RepositoryManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn activity(&self) -> PgActivityEventStore {
        PgActivityEventStore::new(self.pool.clone())
    }

    pub fn alerts(&self) -> PgAlertStore {
        PgAlertStore::new(self.pool.clone())
    }

    pub fn notifications(&self) -> PgNotificationStore {
        PgNotificationStore::new(self.pool.clone())
    }

    pub fn administrators(&self) -> PgAdministratorDirectory {
        PgAdministratorDirectory::new(self.pool.clone())
    }
}

pub(crate) fn db_error(context: &str, err: impl std::fmt::Display) -> AbuseError {
    tracing::error!(error = %err, "{}", context);
    AbuseError::StoreUnavailable(format!("{}: {}", context, err))
}

pub(crate) fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}
