use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::violation::{TimeWindow, ViolationRecord};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [Severity::Low, Severity::Medium, Severity::High, Severity::Critical];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AbuseType {
    RateLimitExceeded,
    SuspiciousActivity,
    ResourceAbuse,
    ApiAbuse,
    ContentViolation,
}

impl AbuseType {
    pub const ALL: [AbuseType; 5] = [
        AbuseType::RateLimitExceeded,
        AbuseType::SuspiciousActivity,
        AbuseType::ResourceAbuse,
        AbuseType::ApiAbuse,
        AbuseType::ContentViolation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AbuseType::RateLimitExceeded => "rate_limit_exceeded",
            AbuseType::SuspiciousActivity => "suspicious_activity",
            AbuseType::ResourceAbuse => "resource_abuse",
            AbuseType::ApiAbuse => "api_abuse",
            AbuseType::ContentViolation => "content_violation",
        }
    }
}

impl fmt::Display for AbuseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AbuseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rate_limit_exceeded" => Ok(AbuseType::RateLimitExceeded),
            "suspicious_activity" => Ok(AbuseType::SuspiciousActivity),
            "resource_abuse" => Ok(AbuseType::ResourceAbuse),
            "api_abuse" => Ok(AbuseType::ApiAbuse),
            "content_violation" => Ok(AbuseType::ContentViolation),
            _ => Err(format!("Unknown abuse type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Pending,
    Reviewed,
    Resolved,
    Dismissed,
}

impl AlertStatus {
    pub const ALL: [AlertStatus; 4] = [
        AlertStatus::Pending,
        AlertStatus::Reviewed,
        AlertStatus::Resolved,
        AlertStatus::Dismissed,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, AlertStatus::Resolved | AlertStatus::Dismissed)
    }

    /// Status reached by applying `action`, or `None` if the transition is not allowed.
    pub fn next(self, action: &LifecycleAction) -> Option<AlertStatus> {
        if action.allowed_from().contains(&self) {
            Some(action.target())
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlertStatus::Pending => "pending",
            AlertStatus::Reviewed => "reviewed",
            AlertStatus::Resolved => "resolved",
            AlertStatus::Dismissed => "dismissed",
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AlertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(AlertStatus::Pending),
            "reviewed" => Ok(AlertStatus::Reviewed),
            "resolved" => Ok(AlertStatus::Resolved),
            "dismissed" => Ok(AlertStatus::Dismissed),
            _ => Err(format!("Unknown alert status: {}", s)),
        }
    }
}

/// An administrator-driven change to an alert's status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum LifecycleAction {
    Review {
        reviewer_id: String,
    },
    Resolve {
        resolver_id: String,
        notes: Option<String>,
    },
    Dismiss {
        dismissed_by: Option<String>,
        notes: Option<String>,
    },
}

impl LifecycleAction {
    pub fn target(&self) -> AlertStatus {
        match self {
            LifecycleAction::Review { .. } => AlertStatus::Reviewed,
            LifecycleAction::Resolve { .. } => AlertStatus::Resolved,
            LifecycleAction::Dismiss { .. } => AlertStatus::Dismissed,
        }
    }

    pub fn allowed_from(&self) -> &'static [AlertStatus] {
        match self {
            LifecycleAction::Review { .. } => &[AlertStatus::Pending],
            LifecycleAction::Resolve { .. } | LifecycleAction::Dismiss { .. } => {
                &[AlertStatus::Pending, AlertStatus::Reviewed]
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LifecycleAction::Review { .. } => "review",
            LifecycleAction::Resolve { .. } => "resolve",
            LifecycleAction::Dismiss { .. } => "dismiss",
        }
    }

    /// Administrator recorded on the alert as having closed it.
    pub fn actor(&self) -> Option<&str> {
        match self {
            LifecycleAction::Review { reviewer_id } => Some(reviewer_id),
            LifecycleAction::Resolve { resolver_id, .. } => Some(resolver_id),
            LifecycleAction::Dismiss { dismissed_by, .. } => dismissed_by.as_deref(),
        }
    }

    pub fn notes(&self) -> Option<&str> {
        match self {
            LifecycleAction::Review { .. } => None,
            LifecycleAction::Resolve { notes, .. } | LifecycleAction::Dismiss { notes, .. } => notes.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertDetails {
    pub action: String,
    pub limit: u64,
    pub observed_count: u64,
    pub window: TimeWindow,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub id: Uuid,
    pub user_id: String,
    pub user_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reason: String,
    pub abuse_type: AbuseType,
    pub severity: Severity,
    pub details: AlertDetails,
    pub status: AlertStatus,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
    pub notes: Option<String>,
}

impl Alert {
    /// Build a pending alert from a scanner violation. Caller metadata is
    /// merged under the violation's own keys, which win on conflict.
    pub fn from_violation(
        violation: &ViolationRecord,
        user_id: &str,
        user_email: Option<&str>,
        metadata: Option<&serde_json::Value>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let mut merged = match metadata {
            Some(serde_json::Value::Object(map)) => map.clone(),
            Some(other) => {
                let mut map = serde_json::Map::new();
                map.insert("context".to_string(), other.clone());
                map
            }
            None => serde_json::Map::new(),
        };
        merged.extend(violation.metadata());

        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            user_email: user_email.map(str::to_string),
            created_at,
            reason: violation.reason.clone(),
            abuse_type: violation.abuse_type,
            severity: violation.severity,
            details: AlertDetails {
                action: violation.action.clone(),
                limit: violation.limit,
                observed_count: violation.observed_count,
                window: violation.window,
                metadata: serde_json::Value::Object(merged),
            },
            status: AlertStatus::Pending,
            resolved_at: None,
            resolved_by: None,
            notes: None,
        }
    }

    /// Apply a lifecycle action in place. Returns the previous status, or the
    /// current status unchanged if the transition is not permitted.
    pub fn apply(&mut self, action: &LifecycleAction, at: DateTime<Utc>) -> Result<AlertStatus, AlertStatus> {
        let previous = self.status;
        let next = previous.next(action).ok_or(previous)?;

        self.status = next;
        if next.is_terminal() {
            self.resolved_at = Some(at);
            self.resolved_by = action.actor().map(str::to_string);
        }
        if let Some(notes) = action.notes() {
            self.notes = Some(notes.to_string());
        }
        Ok(previous)
    }

    pub fn is_pending(&self) -> bool {
        self.status == AlertStatus::Pending
    }
}
