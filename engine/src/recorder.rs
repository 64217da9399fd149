use abuseguard_models::{ActivityEvent, Alert};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::engine::AbuseDetectionEngine;
use crate::errors::{AbuseError, AbuseResult};
use crate::stores::ActivityEventStore;

/// The one path by which user actions enter the activity log. Every
/// recorded action is followed by a detection pass for that user.
#[derive(Clone)]
pub struct ActivityRecorder {
    events: Arc<dyn ActivityEventStore>,
    engine: Arc<AbuseDetectionEngine>,
}

impl ActivityRecorder {
    pub fn new(events: Arc<dyn ActivityEventStore>, engine: Arc<AbuseDetectionEngine>) -> Self {
        Self { events, engine }
    }

    /// Append the action and run detection inline.
    ///
    /// Only the append can fail; detection problems are logged by the engine
    /// and surface as `Ok(None)`.
    pub async fn record(
        &self,
        user_id: &str,
        action: &str,
        user_email: Option<&str>,
        metadata: Option<serde_json::Value>,
    ) -> AbuseResult<Option<Alert>> {
        let event = self.append(user_id, action, metadata).await?;
        Ok(self
            .engine
            .check_with_metadata(&event.user_id, &event.action, user_email, None, event.metadata.as_ref())
            .await)
    }

    /// Append the action, then run detection on a spawned task so the caller
    /// does not wait for it.
    pub async fn record_detached(
        &self,
        user_id: &str,
        action: &str,
        user_email: Option<String>,
        metadata: Option<serde_json::Value>,
    ) -> AbuseResult<JoinHandle<Option<Alert>>> {
        let event = self.append(user_id, action, metadata).await?;
        let engine = Arc::clone(&self.engine);

        Ok(tokio::spawn(async move {
            engine
                .check_with_metadata(&event.user_id, &event.action, user_email.as_deref(), None, event.metadata.as_ref())
                .await
        }))
    }

    async fn append(&self, user_id: &str, action: &str, metadata: Option<serde_json::Value>) -> AbuseResult<ActivityEvent> {
        let user_id = user_id.trim();
        let action = action.trim();
        if user_id.is_empty() || action.is_empty() {
            return Err(AbuseError::Validation("user_id and action are required".to_string()));
        }

        let mut event = ActivityEvent::new(user_id, action);
        if let Some(metadata) = metadata {
            event = event.with_metadata(metadata);
        }
        self.events.append(&event).await?;
        tracing::debug!(user_id = %user_id, action = %action, "Recorded user activity");
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{
        InMemoryActivityStore, InMemoryAlertStore, InMemoryNotificationStore, StaticAdministratorDirectory,
    };
    use abuseguard_config::{DetectionConfig, ThresholdPolicy};
    use abuseguard_models::{AbuseType, Severity};

    fn recorder() -> (ActivityRecorder, Arc<InMemoryActivityStore>) {
        let events = Arc::new(InMemoryActivityStore::new());
        let engine = Arc::new(AbuseDetectionEngine::new(
            events.clone(),
            Arc::new(InMemoryAlertStore::new()),
            Arc::new(InMemoryNotificationStore::new()),
            Arc::new(StaticAdministratorDirectory::from_ids(["admin-1"])),
            ThresholdPolicy::default(),
            DetectionConfig::default(),
        ));
        (ActivityRecorder::new(events.clone(), engine), events)
    }

    #[tokio::test]
    async fn test_record_appends_then_detects() {
        let (recorder, events) = recorder();

        for _ in 0..5 {
            assert!(recorder.record("u1", "booking_create", None, None).await.unwrap().is_none());
        }
        let alert = recorder
            .record("u1", "booking_create", Some("u1@example.com"), Some(serde_json::json!({ "ip": "10.1.1.1" })))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(events.len().await, 6);
        assert_eq!(alert.abuse_type, AbuseType::RateLimitExceeded);
        assert_eq!(alert.severity, Severity::Medium);
        assert_eq!(alert.details.limit, 5);
        assert_eq!(alert.details.metadata["ip"], "10.1.1.1");
    }

    #[tokio::test]
    async fn test_record_detached() {
        let (recorder, _events) = recorder();
        for _ in 0..10 {
            recorder.record("u1", "ai_chat", None, None).await.unwrap();
        }

        let handle = recorder.record_detached("u1", "ai_chat", None, None).await.unwrap();
        let alert = handle.await.unwrap().unwrap();
        assert_eq!(alert.severity, Severity::Critical);
    }

    #[tokio::test]
    async fn test_rejects_blank_input() {
        let (recorder, events) = recorder();
        assert!(matches!(recorder.record(" ", "ai_chat", None, None).await, Err(AbuseError::Validation(_))));
        assert_eq!(events.len().await, 0);
    }
}
