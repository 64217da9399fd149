use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::alert::{Alert, Severity};

/// Notifications stop being listed this many days after creation.
pub const NOTIFICATION_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminIdentity {
    pub user_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl AdminIdentity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
            display_name: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdminNotification {
    pub id: Uuid,
    pub admin_user_id: String,
    pub alert_id: Uuid,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AdminNotification {
    pub fn for_alert(admin: &AdminIdentity, alert: &Alert, now: DateTime<Utc>) -> Self {
        let subject = alert.user_email.as_deref().unwrap_or(&alert.user_id);
        Self {
            id: Uuid::new_v4(),
            admin_user_id: admin.user_id.clone(),
            alert_id: alert.id,
            title: format!("{} severity abuse alert: {}", capitalize(alert.severity.as_str()), alert.abuse_type),
            message: format!("User {} flagged: {}", subject, alert.reason),
            severity: alert.severity,
            read: false,
            created_at: now,
            expires_at: now + Duration::days(NOTIFICATION_TTL_DAYS),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::violation::{CheckKind, TimeWindow, ViolationFlags, ViolationRecord};
    use crate::alert::AbuseType;

    #[test]
    fn test_notification_for_alert() {
        let violation = ViolationRecord {
            check: CheckKind::DailyAction,
            action: "booking_create".to_string(),
            limit: 20,
            observed_count: 21,
            window: TimeWindow::Day,
            severity: Severity::Medium,
            abuse_type: AbuseType::RateLimitExceeded,
            reason: "Daily limit exceeded".to_string(),
            flags: ViolationFlags::default(),
        };
        let now = Utc::now();
        let alert = Alert::from_violation(&violation, "user-9", Some("nine@example.com"), None, now);
        let notification = AdminNotification::for_alert(&AdminIdentity::new("admin-1"), &alert, now);

        assert_eq!(notification.alert_id, alert.id);
        assert_eq!(notification.title, "Medium severity abuse alert: rate_limit_exceeded");
        assert!(notification.message.contains("nine@example.com"));
        assert!(!notification.read);
        assert!(!notification.is_expired(now + Duration::days(6)));
        assert!(notification.is_expired(now + Duration::days(NOTIFICATION_TTL_DAYS)));
    }
}
