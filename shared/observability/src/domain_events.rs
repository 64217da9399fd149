//! Structured domain events for detection and alerting outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum OperationResult {
    Success,
    Failure,
    Partial,
    Skipped,
}

impl std::fmt::Display for OperationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::Partial => write!(f, "partial"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Activity,
    Detection,
    Alert,
    Lifecycle,
    Notification,
    Api,
    System,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Activity => write!(f, "activity"),
            Self::Detection => write!(f, "detection"),
            Self::Alert => write!(f, "alert"),
            Self::Lifecycle => write!(f, "lifecycle"),
            Self::Notification => write!(f, "notification"),
            Self::Api => write!(f, "api"),
            Self::System => write!(f, "system"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub timestamp: DateTime<Utc>,
    pub category: EventCategory,
    /// e.g. "alert_created", "alert_resolved"
    pub event_type: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub result: OperationResult,
    pub duration_ms: Option<u64>,
    pub error: Option<String>,
    pub trace_id: Option<String>,
    /// Subject user of the event (the acting user or the flagged user)
    pub user_id: Option<String>,
    pub service: String,
    pub metadata: Option<serde_json::Value>,
}

impl DomainEvent {
    pub fn new(service: impl Into<String>, category: EventCategory, event_type: impl Into<String>) -> DomainEventBuilder {
        DomainEventBuilder {
            event: DomainEvent {
                timestamp: Utc::now(),
                category,
                event_type: event_type.into(),
                entity_type: None,
                entity_id: None,
                result: OperationResult::Success,
                duration_ms: None,
                error: None,
                trace_id: None,
                user_id: None,
                service: service.into(),
                metadata: None,
            },
        }
    }
}

pub struct DomainEventBuilder {
    event: DomainEvent,
}

impl DomainEventBuilder {
    pub fn entity(mut self, entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        self.event.entity_type = Some(entity_type.into());
        self.event.entity_id = Some(entity_id.into());
        self
    }

    pub fn result(mut self, result: OperationResult) -> Self {
        self.event.result = result;
        self
    }

    pub fn failure(mut self, error: impl Into<String>) -> Self {
        self.event.result = OperationResult::Failure;
        self.event.error = Some(error.into());
        self
    }

    pub fn duration_ms(mut self, ms: u64) -> Self {
        self.event.duration_ms = Some(ms);
        self
    }

    pub fn trace(mut self, trace_id: impl Into<String>) -> Self {
        self.event.trace_id = Some(trace_id.into());
        self
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.event.user_id = Some(user_id.into());
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.event.metadata = Some(metadata);
        self
    }

    pub fn build(self) -> DomainEvent {
        self.event
    }

    /// Build and log the event at a level matching its result.
    pub fn emit(self) {
        let event = self.build();
        let json = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());

        match event.result {
            OperationResult::Success => tracing::info!(
                target: "domain_event",
                category = %event.category,
                event_type = %event.event_type,
                result = "success",
                "DomainEvent: {}", json
            ),
            OperationResult::Failure => tracing::error!(
                target: "domain_event",
                category = %event.category,
                event_type = %event.event_type,
                result = "failure",
                error = ?event.error,
                "DomainEvent: {}", json
            ),
            OperationResult::Partial => tracing::warn!(
                target: "domain_event",
                category = %event.category,
                event_type = %event.event_type,
                result = "partial",
                "DomainEvent: {}", json
            ),
            OperationResult::Skipped => tracing::debug!(
                target: "domain_event",
                category = %event.category,
                event_type = %event.event_type,
                result = "skipped",
                "DomainEvent: {}", json
            ),
        }
    }
}

// ============================================================================
// Convenience functions for the alerting pipeline
// ============================================================================

pub fn log_alert_created(service: &str, alert_id: &str, user_id: &str, abuse_type: &str, severity: &str) {
    DomainEvent::new(service, EventCategory::Alert, "alert_created")
        .entity("alert", alert_id)
        .user(user_id)
        .metadata(serde_json::json!({ "abuse_type": abuse_type, "severity": severity }))
        .emit();
}

pub fn log_alert_suppressed(service: &str, user_id: &str, abuse_type: &str, window: &str) {
    DomainEvent::new(service, EventCategory::Alert, "alert_suppressed")
        .user(user_id)
        .result(OperationResult::Skipped)
        .metadata(serde_json::json!({ "abuse_type": abuse_type, "window": window }))
        .emit();
}

pub fn log_alert_transition(service: &str, alert_id: &str, actor: Option<&str>, from: &str, to: &str) {
    let mut builder = DomainEvent::new(service, EventCategory::Lifecycle, format!("alert_{}", to))
        .entity("alert", alert_id)
        .metadata(serde_json::json!({ "from": from, "to": to }));

    if let Some(actor) = actor {
        builder = builder.user(actor);
    }

    builder.emit();
}

pub fn log_check_failed(service: &str, user_id: &str, check: &str, error: &str) {
    DomainEvent::new(service, EventCategory::Detection, "check_failed_open")
        .entity("check", check)
        .user(user_id)
        .failure(error)
        .emit();
}

pub fn log_notification_fanout(service: &str, alert_id: &str, delivered: usize, failed: usize, duration_ms: u64) {
    let result = match (delivered, failed) {
        (_, 0) => OperationResult::Success,
        (0, _) => OperationResult::Failure,
        _ => OperationResult::Partial,
    };

    DomainEvent::new(service, EventCategory::Notification, "fanout_completed")
        .entity("alert", alert_id)
        .result(result)
        .duration_ms(duration_ms)
        .metadata(serde_json::json!({ "delivered": delivered, "failed": failed }))
        .emit();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_event_builder() {
        let event = DomainEvent::new("abuse-engine", EventCategory::Alert, "alert_created")
            .entity("alert", "123")
            .user("user-1")
            .duration_ms(12)
            .build();

        assert_eq!(event.service, "abuse-engine");
        assert_eq!(event.event_type, "alert_created");
        assert_eq!(event.entity_id, Some("123".to_string()));
        assert_eq!(event.user_id, Some("user-1".to_string()));
        assert_eq!(event.result, OperationResult::Success);
    }

    #[test]
    fn test_failure_records_error() {
        let event = DomainEvent::new("abuse-engine", EventCategory::Detection, "check_failed_open")
            .failure("connection refused")
            .build();

        assert_eq!(event.result, OperationResult::Failure);
        assert_eq!(event.error.as_deref(), Some("connection refused"));
    }
}
