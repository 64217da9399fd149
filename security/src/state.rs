use abuseguard_config::{AppConfig, DetectionConfig, ThresholdPolicy};
use abuseguard_database::{Database, DatabaseConfig};
use abuseguard_engine::{
    AbuseDetectionEngine, ActivityEventStore, ActivityRecorder, AdministratorDirectory, AlertStore,
    InMemoryActivityStore, InMemoryAlertStore, InMemoryNotificationStore, NotificationStore,
    StaticAdministratorDirectory,
};
use abuseguard_models::AdminIdentity;
use anyhow::Result;
use std::sync::Arc;

/// Shared handles for every request handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AbuseDetectionEngine>,
    pub recorder: ActivityRecorder,
    pub database: Option<Database>,
}

impl AppState {
    pub fn new(
        events: Arc<dyn ActivityEventStore>,
        alerts: Arc<dyn AlertStore>,
        notifications: Arc<dyn NotificationStore>,
        directory: Arc<dyn AdministratorDirectory>,
        policy: ThresholdPolicy,
        detection: DetectionConfig,
        database: Option<Database>,
    ) -> Self {
        let engine = Arc::new(AbuseDetectionEngine::new(
            events.clone(),
            alerts,
            notifications,
            directory,
            policy,
            detection,
        ));
        Self {
            recorder: ActivityRecorder::new(events, engine.clone()),
            engine,
            database,
        }
    }

    /// Process-local stores; state is lost on restart.
    pub fn in_memory(policy: ThresholdPolicy, detection: DetectionConfig, admin_user_ids: &[String]) -> Self {
        Self::new(
            Arc::new(InMemoryActivityStore::new()),
            Arc::new(InMemoryAlertStore::new()),
            Arc::new(InMemoryNotificationStore::new()),
            Arc::new(StaticAdministratorDirectory::from_ids(admin_user_ids.iter().cloned())),
            policy,
            detection,
            None,
        )
    }

    /// PostgreSQL-backed stores. Ids from `ADMIN_USER_IDS` are added to the
    /// administrators table on startup.
    pub async fn with_database(db: Database, config: &AppConfig) -> Result<Self> {
        let repos = db.repositories();
        let directory = repos.administrators();
        for user_id in &config.admin_user_ids {
            directory.upsert(&AdminIdentity::new(user_id.as_str())).await?;
        }

        Ok(Self::new(
            Arc::new(repos.activity()),
            Arc::new(repos.alerts()),
            Arc::new(repos.notifications()),
            Arc::new(directory),
            config.policy.clone(),
            config.detection.clone(),
            Some(db),
        ))
    }

    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let Some(url) = config.database_url.clone() else {
            tracing::warn!("[Security Service] No DATABASE_URL configured; using in-memory stores");
            return Ok(Self::in_memory(
                config.policy.clone(),
                config.detection.clone(),
                &config.admin_user_ids,
            ));
        };

        tracing::info!("📊 [Security Service] Connecting to database...");
        let db = Database::new(&DatabaseConfig::new(url).with_max_connections(config.max_db_connections)).await?;
        db.migrate().await?;
        tracing::info!("✅ [Security Service] Database connection established");

        Self::with_database(db, config).await
    }

    pub fn storage_label(&self) -> &'static str {
        if self.database.is_some() {
            "postgres"
        } else {
            "memory"
        }
    }
}
