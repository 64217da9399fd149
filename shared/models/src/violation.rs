use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::alert::{AbuseType, Severity};

/// Trailing interval bounding an event count, ending at evaluation time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    Minute,
    Hour,
    Day,
}

impl TimeWindow {
    pub fn duration(self) -> Duration {
        match self {
            TimeWindow::Minute => Duration::minutes(1),
            TimeWindow::Hour => Duration::hours(1),
            TimeWindow::Day => Duration::days(1),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeWindow::Minute => "minute",
            TimeWindow::Hour => "hour",
            TimeWindow::Day => "day",
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TimeWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "minute" => Ok(TimeWindow::Minute),
            "hour" => Ok(TimeWindow::Hour),
            "day" => Ok(TimeWindow::Day),
            _ => Err(format!("Unknown time window: {}", s)),
        }
    }
}

/// The window checks run by the scanner, listed in priority order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    DailyAction,
    DailyAiAggregate,
    HourlyAction,
    MinuteBurst,
    MinuteAiBurst,
}

impl CheckKind {
    pub const PRIORITY: [CheckKind; 5] = [
        CheckKind::DailyAction,
        CheckKind::DailyAiAggregate,
        CheckKind::HourlyAction,
        CheckKind::MinuteBurst,
        CheckKind::MinuteAiBurst,
    ];

    pub fn window(self) -> TimeWindow {
        match self {
            CheckKind::DailyAction | CheckKind::DailyAiAggregate => TimeWindow::Day,
            CheckKind::HourlyAction => TimeWindow::Hour,
            CheckKind::MinuteBurst | CheckKind::MinuteAiBurst => TimeWindow::Minute,
        }
    }

    pub fn abuse_type(self) -> AbuseType {
        match self {
            CheckKind::DailyAction | CheckKind::HourlyAction => AbuseType::RateLimitExceeded,
            CheckKind::DailyAiAggregate | CheckKind::MinuteAiBurst => AbuseType::ApiAbuse,
            CheckKind::MinuteBurst => AbuseType::SuspiciousActivity,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CheckKind::DailyAction => "daily_action",
            CheckKind::DailyAiAggregate => "daily_ai_aggregate",
            CheckKind::HourlyAction => "hourly_action",
            CheckKind::MinuteBurst => "minute_burst",
            CheckKind::MinuteAiBurst => "minute_ai_burst",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViolationFlags {
    pub possible_bot: bool,
    pub possible_attack: bool,
}

/// A threshold breach found by the scanner. Never persisted on its own;
/// it becomes the `details` of an [`crate::Alert`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViolationRecord {
    pub check: CheckKind,
    /// The triggering action, or the action group label for aggregate checks.
    pub action: String,
    pub limit: u64,
    pub observed_count: u64,
    pub window: TimeWindow,
    pub severity: Severity,
    pub abuse_type: AbuseType,
    pub reason: String,
    pub flags: ViolationFlags,
}

impl ViolationRecord {
    /// Metadata attached to the alert: check identity plus any raised flags.
    pub fn metadata(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut map = serde_json::Map::new();
        map.insert("check".to_string(), self.check.as_str().into());
        if self.flags.possible_bot {
            map.insert("possible_bot".to_string(), true.into());
        }
        if self.flags.possible_attack {
            map.insert("possible_attack".to_string(), true.into());
        }
        map
    }
}
