//! In-process store implementations, used when no database is configured
//! and throughout the test suites.

use abuseguard_models::{
    ActionFilter, ActivityEvent, AdminIdentity, AdminNotification, Alert, AlertStatus, LifecycleAction, StatsSummary,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::{AbuseError, AbuseResult};
use crate::stores::{ActivityEventStore, AdministratorDirectory, AlertStore, NotificationStore};

#[derive(Default)]
pub struct InMemoryActivityStore {
    events: RwLock<HashMap<String, Vec<ActivityEvent>>>,
}

impl InMemoryActivityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl ActivityEventStore for InMemoryActivityStore {
    async fn count_events(&self, user_id: &str, filter: &ActionFilter, since: DateTime<Utc>) -> AbuseResult<u64> {
        let events = self.events.read().await;
        let count = events
            .get(user_id)
            .map(|list| {
                list.iter()
                    .filter(|e| e.timestamp >= since && filter.matches(&e.action))
                    .count()
            })
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn append(&self, event: &ActivityEvent) -> AbuseResult<()> {
        self.events
            .write()
            .await
            .entry(event.user_id.clone())
            .or_default()
            .push(event.clone());
        Ok(())
    }
}

#[derive(Default)]
struct AlertState {
    // insertion order
    alerts: Vec<Alert>,
    index: HashMap<Uuid, usize>,
    stats: StatsSummary,
}

impl AlertState {
    fn newest_first<'a>(&'a self, keep: impl Fn(&Alert) -> bool, limit: usize) -> Vec<Alert> {
        let mut matching: Vec<&'a Alert> = self.alerts.iter().rev().filter(|a| keep(a)).collect();
        // stable, so equal timestamps stay newest-inserted first
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.into_iter().take(limit).cloned().collect()
    }
}

/// Alerts behind a single lock, so every transition is one
/// read-check-write and the counters never drift from the records.
#[derive(Default)]
pub struct InMemoryAlertStore {
    state: RwLock<AlertState>,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlertStore for InMemoryAlertStore {
    async fn insert(&self, alert: &Alert) -> AbuseResult<()> {
        let mut state = self.state.write().await;
        if state.index.contains_key(&alert.id) {
            return Err(AbuseError::Validation(format!("Alert {} already exists", alert.id)));
        }
        let position = state.alerts.len();
        state.index.insert(alert.id, position);
        state.alerts.push(alert.clone());
        state.stats.record_created(alert.abuse_type, alert.severity);
        if alert.status != AlertStatus::Pending {
            state.stats.record_transition(AlertStatus::Pending, alert.status);
        }
        Ok(())
    }

    async fn get(&self, alert_id: Uuid) -> AbuseResult<Option<Alert>> {
        let state = self.state.read().await;
        Ok(state.index.get(&alert_id).map(|i| state.alerts[*i].clone()))
    }

    async fn apply_transition(
        &self,
        alert_id: Uuid,
        action: &LifecycleAction,
        at: DateTime<Utc>,
    ) -> AbuseResult<(AlertStatus, Alert)> {
        let mut state = self.state.write().await;
        let position = *state.index.get(&alert_id).ok_or(AbuseError::NotFound(alert_id))?;

        let alert = &mut state.alerts[position];
        let previous = alert.apply(action, at).map_err(|from| AbuseError::InvalidTransition {
            from,
            action: action.name().to_string(),
        })?;
        let updated = alert.clone();

        state.stats.record_transition(previous, updated.status);
        Ok((previous, updated))
    }

    async fn list_pending(&self, limit: usize) -> AbuseResult<Vec<Alert>> {
        Ok(self.state.read().await.newest_first(Alert::is_pending, limit))
    }

    async fn list_by_user(&self, user_id: &str, limit: usize) -> AbuseResult<Vec<Alert>> {
        Ok(self.state.read().await.newest_first(|a| a.user_id == user_id, limit))
    }

    async fn list_all(&self) -> AbuseResult<Vec<Alert>> {
        Ok(self.state.read().await.alerts.clone())
    }

    async fn get_stats(&self) -> AbuseResult<StatsSummary> {
        Ok(self.state.read().await.stats.clone())
    }
}

#[derive(Default)]
pub struct InMemoryNotificationStore {
    notifications: RwLock<Vec<AdminNotification>>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn for_alert(&self, alert_id: Uuid) -> Vec<AdminNotification> {
        self.notifications
            .read()
            .await
            .iter()
            .filter(|n| n.alert_id == alert_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn create(&self, notification: &AdminNotification) -> AbuseResult<()> {
        self.notifications.write().await.push(notification.clone());
        Ok(())
    }

    async fn list_for_admin(
        &self,
        admin_id: &str,
        unread_only: bool,
        now: DateTime<Utc>,
    ) -> AbuseResult<Vec<AdminNotification>> {
        let notifications = self.notifications.read().await;
        let mut listed: Vec<AdminNotification> = notifications
            .iter()
            .rev()
            .filter(|n| n.admin_user_id == admin_id && !n.is_expired(now) && (!unread_only || !n.read))
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listed)
    }

    async fn mark_read(&self, notification_id: Uuid, admin_id: &str) -> AbuseResult<AdminNotification> {
        let mut notifications = self.notifications.write().await;
        let notification = notifications
            .iter_mut()
            .find(|n| n.id == notification_id && n.admin_user_id == admin_id)
            .ok_or(AbuseError::NotFound(notification_id))?;
        notification.read = true;
        Ok(notification.clone())
    }
}

/// Administrator list fixed at startup, e.g. from `ADMIN_USER_IDS`.
#[derive(Debug, Clone, Default)]
pub struct StaticAdministratorDirectory {
    admins: Vec<AdminIdentity>,
}

impl StaticAdministratorDirectory {
    pub fn new(admins: Vec<AdminIdentity>) -> Self {
        Self { admins }
    }

    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(ids.into_iter().map(AdminIdentity::new).collect())
    }
}

#[async_trait]
impl AdministratorDirectory for StaticAdministratorDirectory {
    async fn list_admins(&self) -> AbuseResult<Vec<AdminIdentity>> {
        Ok(self.admins.clone())
    }

    async fn is_administrator(&self, user_id: &str) -> AbuseResult<bool> {
        Ok(self.admins.iter().any(|a| a.user_id == user_id))
    }
}
