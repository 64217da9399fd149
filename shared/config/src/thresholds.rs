use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::ConfigError;

/// Per-action and per-window limits the violation scanner compares against.
///
/// Loaded once at startup and never mutated. Callers that need different
/// limits for a single check pass a [`PolicyOverrides`] and get a merged copy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ThresholdPolicy {
    /// Daily limit for individual actions.
    pub daily_limits: BTreeMap<String, u64>,
    /// Hourly limit for individual actions.
    pub hourly_limits: BTreeMap<String, u64>,
    /// Daily limit across every action in `ai_actions`.
    pub daily_ai_requests: u64,
    /// Any actions within the trailing minute.
    pub burst_per_minute: u64,
    /// AI-class actions within the trailing minute.
    pub ai_burst_per_minute: u64,
    /// Actions that count toward the AI aggregate and AI burst checks.
    pub ai_actions: BTreeSet<String>,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        let daily_limits = [
            ("booking_create", 20),
            ("message_send", 500),
            ("profile_update", 50),
            ("review_post", 10),
            ("specialist_search", 300),
        ];
        let hourly_limits = [
            ("booking_create", 5),
            ("message_send", 120),
            ("ai_chat", 40),
            ("ai_analysis", 15),
            ("ai_image_generation", 10),
        ];
        let ai_actions = ["ai_chat", "ai_analysis", "ai_image_generation", "ai_recommendation"];

        Self {
            daily_limits: daily_limits.iter().map(|(a, l)| (a.to_string(), *l)).collect(),
            hourly_limits: hourly_limits.iter().map(|(a, l)| (a.to_string(), *l)).collect(),
            daily_ai_requests: 100,
            burst_per_minute: 60,
            ai_burst_per_minute: 10,
            ai_actions: ai_actions.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl ThresholdPolicy {
    pub fn daily_limit(&self, action: &str) -> Option<u64> {
        self.daily_limits.get(action).copied()
    }

    pub fn hourly_limit(&self, action: &str) -> Option<u64> {
        self.hourly_limits.get(action).copied()
    }

    pub fn is_ai_action(&self, action: &str) -> bool {
        self.ai_actions.contains(action)
    }

    /// A copy of this policy with every field set in `overrides` replaced.
    pub fn with_overrides(&self, overrides: &PolicyOverrides) -> ThresholdPolicy {
        let mut merged = self.clone();
        merged
            .daily_limits
            .extend(overrides.daily_limits.iter().map(|(a, l)| (a.clone(), *l)));
        merged
            .hourly_limits
            .extend(overrides.hourly_limits.iter().map(|(a, l)| (a.clone(), *l)));
        if let Some(limit) = overrides.daily_ai_requests {
            merged.daily_ai_requests = limit;
        }
        if let Some(limit) = overrides.burst_per_minute {
            merged.burst_per_minute = limit;
        }
        if let Some(limit) = overrides.ai_burst_per_minute {
            merged.ai_burst_per_minute = limit;
        }
        merged.ai_actions.extend(overrides.additional_ai_actions.iter().cloned());
        merged
    }

    /// Load the policy from a JSON file.
    ///
    /// The path comes from the argument, then `THRESHOLD_POLICY_PATH`, then
    /// `./threshold-policy.json`. A missing file yields the built-in defaults;
    /// a file that exists but does not parse is an error.
    pub fn from_path(path: Option<String>) -> Result<Self, ConfigError> {
        let default_path = std::env::var("THRESHOLD_POLICY_PATH")
            .unwrap_or_else(|_| "threshold-policy.json".to_string());
        let path = path.unwrap_or(default_path);

        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let policy: ThresholdPolicy = serde_json::from_str(&content).map_err(|e| ConfigError::InvalidPolicy {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
                tracing::info!(path = %path, "Loaded threshold policy");
                Ok(policy)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path, "Threshold policy file not found; using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(ConfigError::Io { path, source: e }),
        }
    }
}

/// Per-call replacements for individual policy fields. Unset fields keep the
/// injected policy's value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PolicyOverrides {
    pub daily_limits: BTreeMap<String, u64>,
    pub hourly_limits: BTreeMap<String, u64>,
    pub daily_ai_requests: Option<u64>,
    pub burst_per_minute: Option<u64>,
    pub ai_burst_per_minute: Option<u64>,
    pub additional_ai_actions: BTreeSet<String>,
}

impl PolicyOverrides {
    pub fn is_empty(&self) -> bool {
        self == &PolicyOverrides::default()
    }

    pub fn daily_limit(mut self, action: impl Into<String>, limit: u64) -> Self {
        self.daily_limits.insert(action.into(), limit);
        self
    }

    pub fn hourly_limit(mut self, action: impl Into<String>, limit: u64) -> Self {
        self.hourly_limits.insert(action.into(), limit);
        self
    }

    pub fn daily_ai_requests(mut self, limit: u64) -> Self {
        self.daily_ai_requests = Some(limit);
        self
    }

    pub fn burst_per_minute(mut self, limit: u64) -> Self {
        self.burst_per_minute = Some(limit);
        self
    }

    pub fn ai_burst_per_minute(mut self, limit: u64) -> Self {
        self.ai_burst_per_minute = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_overrides_replace_only_set_fields() {
        let base = ThresholdPolicy::default();
        let overrides = PolicyOverrides::default()
            .daily_limit("booking_create", 3)
            .daily_limit("export_data", 2)
            .ai_burst_per_minute(4);

        let merged = base.with_overrides(&overrides);

        assert_eq!(merged.daily_limit("booking_create"), Some(3));
        assert_eq!(merged.daily_limit("export_data"), Some(2));
        assert_eq!(merged.daily_limit("message_send"), base.daily_limit("message_send"));
        assert_eq!(merged.ai_burst_per_minute, 4);
        assert_eq!(merged.burst_per_minute, base.burst_per_minute);
        // the injected policy is untouched
        assert_eq!(base.daily_limit("booking_create"), Some(20));
        assert_eq!(base.daily_limit("export_data"), None);
    }

    #[test]
    fn test_empty_overrides() {
        assert!(PolicyOverrides::default().is_empty());
        assert!(!PolicyOverrides::default().burst_per_minute(1).is_empty());
    }

    #[test]
    fn test_from_path_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "daily_ai_requests": 250, "ai_actions": ["ai_chat"] }}"#).unwrap();

        let policy = ThresholdPolicy::from_path(Some(file.path().to_string_lossy().to_string())).unwrap();

        assert_eq!(policy.daily_ai_requests, 250);
        assert!(policy.is_ai_action("ai_chat"));
        assert!(!policy.is_ai_action("ai_analysis"));
        assert_eq!(policy.burst_per_minute, ThresholdPolicy::default().burst_per_minute);
    }

    #[test]
    fn test_from_path_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let policy = ThresholdPolicy::from_path(Some(missing.to_string_lossy().to_string())).unwrap();
        assert_eq!(policy, ThresholdPolicy::default());
    }

    #[test]
    fn test_from_path_rejects_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let result = ThresholdPolicy::from_path(Some(file.path().to_string_lossy().to_string()));
        assert!(matches!(result, Err(ConfigError::InvalidPolicy { .. })));
    }
}
