//! Persistence seams consumed by the engine. The in-memory implementations
//! live in [`crate::memory`]; PostgreSQL ones in `abuseguard-database`.

use abuseguard_models::{
    ActionFilter, ActivityEvent, AdminIdentity, AdminNotification, Alert, AlertStatus, LifecycleAction, StatsSummary,
    ViolationRecord,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::AbuseResult;

/// Append-only log of user actions.
#[async_trait]
pub trait ActivityEventStore: Send + Sync {
    /// Events for `user_id` matching `filter` with `timestamp >= since`.
    async fn count_events(&self, user_id: &str, filter: &ActionFilter, since: DateTime<Utc>) -> AbuseResult<u64>;

    async fn append(&self, event: &ActivityEvent) -> AbuseResult<()>;
}

#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn insert(&self, alert: &Alert) -> AbuseResult<()>;

    async fn create(
        &self,
        violation: &ViolationRecord,
        user_id: &str,
        user_email: Option<&str>,
        metadata: Option<&serde_json::Value>,
    ) -> AbuseResult<Alert> {
        let alert = Alert::from_violation(violation, user_id, user_email, metadata, Utc::now());
        self.insert(&alert).await?;
        Ok(alert)
    }

    async fn get(&self, alert_id: Uuid) -> AbuseResult<Option<Alert>>;

    /// Atomically check the alert's current state and apply `action`.
    ///
    /// Fails with `NotFound` for unknown ids and `InvalidTransition` when the
    /// current state does not permit the action; nothing is written then.
    /// Returns the status the alert left along with the updated alert.
    async fn apply_transition(
        &self,
        alert_id: Uuid,
        action: &LifecycleAction,
        at: DateTime<Utc>,
    ) -> AbuseResult<(AlertStatus, Alert)>;

    /// Pending alerts, newest first.
    async fn list_pending(&self, limit: usize) -> AbuseResult<Vec<Alert>>;

    /// Alerts for one user in any state, newest first.
    async fn list_by_user(&self, user_id: &str, limit: usize) -> AbuseResult<Vec<Alert>>;

    /// Every alert; used for full-scan reconciliation only.
    async fn list_all(&self) -> AbuseResult<Vec<Alert>>;

    /// Summary served from counters maintained on insert and transition.
    async fn get_stats(&self) -> AbuseResult<StatsSummary>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create(&self, notification: &AdminNotification) -> AbuseResult<()>;

    /// Unexpired notifications for one administrator, newest first.
    async fn list_for_admin(&self, admin_id: &str, unread_only: bool, now: DateTime<Utc>)
        -> AbuseResult<Vec<AdminNotification>>;

    /// Mark read. A notification belonging to another administrator is
    /// reported as `NotFound`.
    async fn mark_read(&self, notification_id: Uuid, admin_id: &str) -> AbuseResult<AdminNotification>;
}

#[async_trait]
pub trait AdministratorDirectory: Send + Sync {
    async fn list_admins(&self) -> AbuseResult<Vec<AdminIdentity>>;

    async fn is_administrator(&self, user_id: &str) -> AbuseResult<bool>;
}
