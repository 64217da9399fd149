use abuseguard_models::{Alert, LifecycleAction};
use abuseguard_observability::domain_events::log_alert_transition;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::{AbuseError, AbuseResult};
use crate::stores::AlertStore;
use crate::SERVICE_NAME;

/// Drives alerts through pending → reviewed → resolved / dismissed.
///
/// The permitted-transition check and the write happen inside the store as
/// one atomic step, so two administrators racing on the same alert cannot
/// both succeed.
pub struct AlertLifecycleManager {
    alerts: Arc<dyn AlertStore>,
}

impl AlertLifecycleManager {
    pub fn new(alerts: Arc<dyn AlertStore>) -> Self {
        Self { alerts }
    }

    pub async fn review(&self, alert_id: Uuid, reviewer_id: &str) -> AbuseResult<Alert> {
        let reviewer_id = require_actor(reviewer_id, "reviewer_id")?;
        self.transition(alert_id, LifecycleAction::Review { reviewer_id }).await
    }

    pub async fn resolve(&self, alert_id: Uuid, resolver_id: &str, notes: Option<String>) -> AbuseResult<Alert> {
        let resolver_id = require_actor(resolver_id, "resolver_id")?;
        self.transition(alert_id, LifecycleAction::Resolve { resolver_id, notes }).await
    }

    pub async fn dismiss(&self, alert_id: Uuid, dismissed_by: Option<&str>, notes: Option<String>) -> AbuseResult<Alert> {
        let dismissed_by = dismissed_by.map(str::trim).filter(|id| !id.is_empty()).map(str::to_string);
        self.transition(alert_id, LifecycleAction::Dismiss { dismissed_by, notes }).await
    }

    pub async fn transition(&self, alert_id: Uuid, action: LifecycleAction) -> AbuseResult<Alert> {
        let (from, updated) = self.alerts.apply_transition(alert_id, &action, Utc::now()).await?;

        log_alert_transition(
            SERVICE_NAME,
            &alert_id.to_string(),
            action.actor(),
            from.as_str(),
            updated.status.as_str(),
        );
        Ok(updated)
    }
}

fn require_actor(id: &str, field: &str) -> AbuseResult<String> {
    let id = id.trim();
    if id.is_empty() {
        return Err(AbuseError::Validation(format!("{} must not be empty", field)));
    }
    Ok(id.to_string())
}
