use abuseguard_models::{AdminIdentity, AdminNotification, Alert};
use abuseguard_observability::domain_events::log_notification_fanout;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::errors::{AbuseError, AbuseResult};
use crate::stores::{AdministratorDirectory, NotificationStore};
use crate::SERVICE_NAME;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FailedDelivery {
    pub admin_user_id: String,
    pub error: String,
}

/// Outcome of notifying every administrator about one alert.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct FanoutReport {
    pub delivered: Vec<String>,
    pub failed: Vec<FailedDelivery>,
}

impl FanoutReport {
    pub fn total(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// `PartialNotificationFailure` when any administrator was missed.
    pub fn into_result(self) -> AbuseResult<FanoutReport> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(AbuseError::PartialNotificationFailure {
                failed: self.failed.len(),
                total: self.total(),
            })
        }
    }
}

/// Writes one notification per administrator for each new alert.
///
/// Deliveries run with bounded concurrency and each one is independent: a
/// failing or slow administrator is recorded in the report and never affects
/// the others or the alert itself.
pub struct NotificationFanout {
    directory: Arc<dyn AdministratorDirectory>,
    notifications: Arc<dyn NotificationStore>,
    concurrency: usize,
    timeout: Duration,
}

impl NotificationFanout {
    pub fn new(
        directory: Arc<dyn AdministratorDirectory>,
        notifications: Arc<dyn NotificationStore>,
        concurrency: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            directory,
            notifications,
            concurrency: concurrency.max(1),
            timeout,
        }
    }

    pub async fn notify(&self, alert: &Alert) -> AbuseResult<FanoutReport> {
        let started = Instant::now();
        let admins = self.directory.list_admins().await?;
        let now = Utc::now();

        let outcomes: Vec<(AdminIdentity, AbuseResult<()>)> = stream::iter(admins)
            .map(|admin| async move {
                let notification = AdminNotification::for_alert(&admin, alert, now);
                let outcome = match tokio::time::timeout(self.timeout, self.notifications.create(&notification)).await {
                    Ok(result) => result,
                    Err(_) => Err(AbuseError::Timeout(self.timeout)),
                };
                (admin, outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = FanoutReport::default();
        for (admin, outcome) in outcomes {
            match outcome {
                Ok(()) => report.delivered.push(admin.user_id),
                Err(e) => {
                    tracing::warn!(
                        alert_id = %alert.id,
                        admin_user_id = %admin.user_id,
                        error = %e,
                        "Failed to notify administrator"
                    );
                    report.failed.push(FailedDelivery {
                        admin_user_id: admin.user_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        log_notification_fanout(
            SERVICE_NAME,
            &alert.id.to_string(),
            report.delivered.len(),
            report.failed.len(),
            started.elapsed().as_millis() as u64,
        );
        Ok(report)
    }
}
