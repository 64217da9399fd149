use abuseguard_config::{DetectionConfig, PolicyOverrides, ThresholdPolicy};
use abuseguard_models::{AbuseType, AdminNotification, Alert, StatsSummary, TimeWindow};
use abuseguard_observability::domain_events::{log_alert_created, log_alert_suppressed};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::errors::AbuseResult;
use crate::lifecycle::AlertLifecycleManager;
use crate::notifications::NotificationFanout;
use crate::scanner::ViolationScanner;
use crate::stats::StatsAggregator;
use crate::stores::{ActivityEventStore, AdministratorDirectory, AlertStore, NotificationStore};
use crate::SERVICE_NAME;

type CooldownKey = (String, AbuseType, TimeWindow);

/// Entry point for detection and for the administrator workflow.
pub struct AbuseDetectionEngine {
    scanner: ViolationScanner,
    alerts: Arc<dyn AlertStore>,
    notifications: Arc<dyn NotificationStore>,
    directory: Arc<dyn AdministratorDirectory>,
    lifecycle: AlertLifecycleManager,
    fanout: NotificationFanout,
    stats: StatsAggregator,
    cooldown: Option<Duration>,
    last_alerted: DashMap<CooldownKey, Instant>,
}

impl AbuseDetectionEngine {
    pub fn new(
        events: Arc<dyn ActivityEventStore>,
        alerts: Arc<dyn AlertStore>,
        notifications: Arc<dyn NotificationStore>,
        directory: Arc<dyn AdministratorDirectory>,
        policy: ThresholdPolicy,
        config: DetectionConfig,
    ) -> Self {
        Self {
            scanner: ViolationScanner::new(events, Arc::new(policy), config.query_timeout),
            lifecycle: AlertLifecycleManager::new(alerts.clone()),
            fanout: NotificationFanout::new(
                directory.clone(),
                notifications.clone(),
                config.notification_concurrency,
                config.notification_timeout,
            ),
            stats: StatsAggregator::new(alerts.clone(), config.stats_cache_ttl),
            alerts,
            notifications,
            directory,
            cooldown: config.alert_cooldown,
            last_alerted: DashMap::new(),
        }
    }

    pub fn scanner(&self) -> &ViolationScanner {
        &self.scanner
    }

    pub fn stats(&self) -> &StatsAggregator {
        &self.stats
    }

    /// Scan the user's recent activity and raise an alert for the first
    /// violation found.
    ///
    /// Never fails. Store errors are logged and reported as `None` so the
    /// user action that triggered detection always goes through.
    pub async fn check_and_create_alert(
        &self,
        user_id: &str,
        action: &str,
        user_email: Option<&str>,
        overrides: Option<&PolicyOverrides>,
    ) -> Option<Alert> {
        self.check_with_metadata(user_id, action, user_email, overrides, None).await
    }

    pub async fn check_with_metadata(
        &self,
        user_id: &str,
        action: &str,
        user_email: Option<&str>,
        overrides: Option<&PolicyOverrides>,
        metadata: Option<&serde_json::Value>,
    ) -> Option<Alert> {
        let violation = self.scanner.scan(user_id, action, overrides).await?;

        let cooldown_key = (user_id.to_string(), violation.abuse_type, violation.window);
        if self.in_cooldown(&cooldown_key) {
            log_alert_suppressed(SERVICE_NAME, user_id, violation.abuse_type.as_str(), violation.window.as_str());
            return None;
        }

        let alert = match self.alerts.create(&violation, user_id, user_email, metadata).await {
            Ok(alert) => alert,
            Err(e) => {
                tracing::error!(user_id = %user_id, action = %action, error = %e, "Failed to persist abuse alert");
                return None;
            }
        };
        // only a persisted alert starts a cooldown
        self.arm_cooldown(cooldown_key);

        log_alert_created(
            SERVICE_NAME,
            &alert.id.to_string(),
            user_id,
            alert.abuse_type.as_str(),
            alert.severity.as_str(),
        );

        // notification problems never roll back the alert
        match self.fanout.notify(&alert).await {
            Ok(report) if !report.is_complete() => {
                tracing::warn!(
                    alert_id = %alert.id,
                    failed = report.failed.len(),
                    total = report.total(),
                    "Some administrators were not notified"
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(alert_id = %alert.id, error = %e, "Administrator notification fan-out failed");
            }
        }

        Some(alert)
    }

    fn in_cooldown(&self, key: &CooldownKey) -> bool {
        let Some(cooldown) = self.cooldown else {
            return false;
        };
        self.last_alerted
            .get(key)
            .is_some_and(|last| last.elapsed() < cooldown)
    }

    /// Record the alert time for `key` and drop entries whose cooldown has
    /// lapsed.
    fn arm_cooldown(&self, key: CooldownKey) {
        let Some(cooldown) = self.cooldown else {
            return;
        };
        self.last_alerted.retain(|_, last| last.elapsed() < cooldown);
        self.last_alerted.insert(key, Instant::now());
    }

    pub async fn get_alert(&self, alert_id: Uuid) -> AbuseResult<Option<Alert>> {
        self.alerts.get(alert_id).await
    }

    pub async fn get_pending_alerts(&self, limit: usize) -> AbuseResult<Vec<Alert>> {
        self.alerts.list_pending(limit).await
    }

    pub async fn get_user_alerts(&self, user_id: &str, limit: usize) -> AbuseResult<Vec<Alert>> {
        self.alerts.list_by_user(user_id, limit).await
    }

    // Transitions drop the stats snapshot so the acting admin sees their own change.

    pub async fn review_alert(&self, alert_id: Uuid, admin_id: &str) -> AbuseResult<Alert> {
        let alert = self.lifecycle.review(alert_id, admin_id).await?;
        self.stats.invalidate().await;
        Ok(alert)
    }

    pub async fn resolve_alert(&self, alert_id: Uuid, admin_id: &str, notes: Option<String>) -> AbuseResult<Alert> {
        let alert = self.lifecycle.resolve(alert_id, admin_id, notes).await?;
        self.stats.invalidate().await;
        Ok(alert)
    }

    pub async fn dismiss_alert(&self, alert_id: Uuid, admin_id: Option<&str>) -> AbuseResult<Alert> {
        let alert = self.lifecycle.dismiss(alert_id, admin_id, None).await?;
        self.stats.invalidate().await;
        Ok(alert)
    }

    pub async fn get_alert_stats(&self) -> AbuseResult<StatsSummary> {
        self.stats.summary().await
    }

    /// Directory lookup for gating admin surfaces. Any lookup failure is
    /// treated as "not an administrator".
    pub async fn is_administrator(&self, user_id: &str) -> bool {
        match self.directory.is_administrator(user_id).await {
            Ok(is_admin) => is_admin,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Administrator lookup failed; denying");
                false
            }
        }
    }

    pub async fn admin_notifications(&self, admin_id: &str, unread_only: bool) -> AbuseResult<Vec<AdminNotification>> {
        self.notifications.list_for_admin(admin_id, unread_only, Utc::now()).await
    }

    pub async fn mark_notification_read(&self, notification_id: Uuid, admin_id: &str) -> AbuseResult<AdminNotification> {
        self.notifications.mark_read(notification_id, admin_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{
        InMemoryActivityStore, InMemoryAlertStore, InMemoryNotificationStore, StaticAdministratorDirectory,
    };
    use crate::errors::AbuseError;
    use crate::stores::AlertStore;
    use abuseguard_models::{ActivityEvent, AlertStatus, LifecycleAction};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Alert store whose inserts fail while `down` is set.
    #[derive(Default)]
    struct OutageAlertStore {
        inner: InMemoryAlertStore,
        down: AtomicBool,
    }

    #[async_trait]
    impl AlertStore for OutageAlertStore {
        async fn insert(&self, alert: &Alert) -> AbuseResult<()> {
            if self.down.load(Ordering::SeqCst) {
                return Err(AbuseError::StoreUnavailable("connection refused".into()));
            }
            self.inner.insert(alert).await
        }

        async fn get(&self, alert_id: Uuid) -> AbuseResult<Option<Alert>> {
            self.inner.get(alert_id).await
        }

        async fn apply_transition(
            &self,
            alert_id: Uuid,
            action: &LifecycleAction,
            at: DateTime<Utc>,
        ) -> AbuseResult<(AlertStatus, Alert)> {
            self.inner.apply_transition(alert_id, action, at).await
        }

        async fn list_pending(&self, limit: usize) -> AbuseResult<Vec<Alert>> {
            self.inner.list_pending(limit).await
        }

        async fn list_by_user(&self, user_id: &str, limit: usize) -> AbuseResult<Vec<Alert>> {
            self.inner.list_by_user(user_id, limit).await
        }

        async fn list_all(&self) -> AbuseResult<Vec<Alert>> {
            self.inner.list_all().await
        }

        async fn get_stats(&self) -> AbuseResult<StatsSummary> {
            self.inner.get_stats().await
        }
    }

    fn engine_with(events: Arc<InMemoryActivityStore>, config: DetectionConfig) -> AbuseDetectionEngine {
        AbuseDetectionEngine::new(
            events,
            Arc::new(InMemoryAlertStore::new()),
            Arc::new(InMemoryNotificationStore::new()),
            Arc::new(StaticAdministratorDirectory::from_ids(["admin-1"])),
            ThresholdPolicy::default(),
            config,
        )
    }

    async fn burst(events: &InMemoryActivityStore, user: &str, count: usize) {
        for _ in 0..count {
            events.append(&ActivityEvent::new(user, "ai_chat")).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_re_alerts_without_cooldown() {
        let events = Arc::new(InMemoryActivityStore::new());
        let engine = engine_with(events.clone(), DetectionConfig::default());
        burst(&events, "u1", 11).await;

        assert!(engine.check_and_create_alert("u1", "ai_chat", None, None).await.is_some());
        assert!(engine.check_and_create_alert("u1", "ai_chat", None, None).await.is_some());
        assert_eq!(engine.get_user_alerts("u1", 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cooldown_suppresses_repeats_per_user() {
        let events = Arc::new(InMemoryActivityStore::new());
        let engine = engine_with(events.clone(), DetectionConfig::default().with_cooldown(Duration::from_secs(300)));
        burst(&events, "u1", 11).await;
        burst(&events, "u2", 11).await;

        assert!(engine.check_and_create_alert("u1", "ai_chat", None, None).await.is_some());
        assert!(engine.check_and_create_alert("u1", "ai_chat", None, None).await.is_none());
        assert!(engine.check_and_create_alert("u2", "ai_chat", None, None).await.is_some());
        assert_eq!(engine.get_pending_alerts(10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_admin_check_and_notifications() {
        let events = Arc::new(InMemoryActivityStore::new());
        let engine = engine_with(events.clone(), DetectionConfig::default());
        burst(&events, "u1", 11).await;

        assert!(engine.is_administrator("admin-1").await);
        assert!(!engine.is_administrator("u1").await);

        let alert = engine.check_and_create_alert("u1", "ai_chat", Some("u1@example.com"), None).await.unwrap();
        let inbox = engine.admin_notifications("admin-1", true).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].alert_id, alert.id);

        engine.mark_notification_read(inbox[0].id, "admin-1").await.unwrap();
        assert!(engine.admin_notifications("admin-1", true).await.unwrap().is_empty());
        assert_eq!(engine.admin_notifications("admin-1", false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_insert_does_not_start_cooldown() {
        let events = Arc::new(InMemoryActivityStore::new());
        let alerts = Arc::new(OutageAlertStore::default());
        let engine = AbuseDetectionEngine::new(
            events.clone(),
            alerts.clone(),
            Arc::new(InMemoryNotificationStore::new()),
            Arc::new(StaticAdministratorDirectory::from_ids(["admin-1"])),
            ThresholdPolicy::default(),
            DetectionConfig::default().with_cooldown(Duration::from_secs(300)),
        );
        burst(&events, "u1", 11).await;

        alerts.down.store(true, Ordering::SeqCst);
        assert!(engine.check_and_create_alert("u1", "ai_chat", None, None).await.is_none());
        assert!(engine.last_alerted.is_empty());

        alerts.down.store(false, Ordering::SeqCst);
        let alert = engine.check_and_create_alert("u1", "ai_chat", None, None).await;
        assert!(alert.is_some());
        assert_eq!(engine.get_user_alerts("u1", 10).await.unwrap().len(), 1);

        // the persisted alert does start one
        assert!(engine.check_and_create_alert("u1", "ai_chat", None, None).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lapsed_cooldowns_are_pruned() {
        let events = Arc::new(InMemoryActivityStore::new());
        let engine = engine_with(events.clone(), DetectionConfig::default().with_cooldown(Duration::from_secs(300)));
        for user in ["u1", "u2", "u3"] {
            burst(&events, user, 11).await;
        }

        assert!(engine.check_and_create_alert("u1", "ai_chat", None, None).await.is_some());
        assert!(engine.check_and_create_alert("u2", "ai_chat", None, None).await.is_some());
        assert_eq!(engine.last_alerted.len(), 2);

        tokio::time::advance(Duration::from_secs(301)).await;

        assert!(engine.check_and_create_alert("u3", "ai_chat", None, None).await.is_some());
        assert_eq!(engine.last_alerted.len(), 1);
        assert!(engine.check_and_create_alert("u1", "ai_chat", None, None).await.is_some());
    }
}
