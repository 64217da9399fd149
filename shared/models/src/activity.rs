use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of the append-only user activity log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityEvent {
    pub user_id: String,
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: Option<serde_json::Value>,
}

impl ActivityEvent {
    pub fn new(user_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            action: action.into(),
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Which actions an event count should include.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "actions", rename_all = "snake_case")]
pub enum ActionFilter {
    Exact(String),
    AnyOf(Vec<String>),
    All,
}

impl ActionFilter {
    pub fn matches(&self, action: &str) -> bool {
        match self {
            ActionFilter::Exact(expected) => expected == action,
            ActionFilter::AnyOf(actions) => actions.iter().any(|a| a == action),
            ActionFilter::All => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_matching() {
        assert!(ActionFilter::Exact("ai_chat".into()).matches("ai_chat"));
        assert!(!ActionFilter::Exact("ai_chat".into()).matches("booking_create"));
        assert!(ActionFilter::AnyOf(vec!["a".into(), "b".into()]).matches("b"));
        assert!(!ActionFilter::AnyOf(vec![]).matches("b"));
        assert!(ActionFilter::All.matches("anything"));
    }
}
