use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::alert::{AbuseType, Alert, AlertStatus, Severity};

/// Dashboard summary of all alerts ever created.
///
/// Every abuse type and severity is always present in the maps, zero-filled,
/// so the shape does not depend on which alerts exist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatsSummary {
    pub total_alerts: u64,
    pub pending_alerts: u64,
    pub reviewed_alerts: u64,
    pub resolved_alerts: u64,
    pub dismissed_alerts: u64,
    pub critical_alerts: u64,
    pub alerts_by_type: BTreeMap<AbuseType, u64>,
    pub alerts_by_severity: BTreeMap<Severity, u64>,
}

impl Default for StatsSummary {
    fn default() -> Self {
        Self {
            total_alerts: 0,
            pending_alerts: 0,
            reviewed_alerts: 0,
            resolved_alerts: 0,
            dismissed_alerts: 0,
            critical_alerts: 0,
            alerts_by_type: AbuseType::ALL.iter().map(|t| (*t, 0)).collect(),
            alerts_by_severity: Severity::ALL.iter().map(|s| (*s, 0)).collect(),
        }
    }
}

impl StatsSummary {
    /// Full-scan aggregation.
    pub fn from_alerts<'a>(alerts: impl IntoIterator<Item = &'a Alert>) -> Self {
        let mut summary = Self::default();
        for alert in alerts {
            summary.record_created(alert.abuse_type, alert.severity);
            if alert.status != AlertStatus::Pending {
                summary.record_transition(AlertStatus::Pending, alert.status);
            }
        }
        summary
    }

    /// Count a newly created (pending) alert.
    pub fn record_created(&mut self, abuse_type: AbuseType, severity: Severity) {
        self.total_alerts += 1;
        self.pending_alerts += 1;
        if severity == Severity::Critical {
            self.critical_alerts += 1;
        }
        *self.alerts_by_type.entry(abuse_type).or_insert(0) += 1;
        *self.alerts_by_severity.entry(severity).or_insert(0) += 1;
    }

    pub fn record_transition(&mut self, from: AlertStatus, to: AlertStatus) {
        let slot = self.status_slot(from);
        *slot = slot.saturating_sub(1);
        *self.status_slot(to) += 1;
    }

    pub fn count_for(&self, status: AlertStatus) -> u64 {
        match status {
            AlertStatus::Pending => self.pending_alerts,
            AlertStatus::Reviewed => self.reviewed_alerts,
            AlertStatus::Resolved => self.resolved_alerts,
            AlertStatus::Dismissed => self.dismissed_alerts,
        }
    }

    /// `total == pending + reviewed + resolved + dismissed`
    pub fn is_consistent(&self) -> bool {
        let by_status: u64 = AlertStatus::ALL.iter().map(|s| self.count_for(*s)).sum();
        self.total_alerts == by_status
    }

    fn status_slot(&mut self, status: AlertStatus) -> &mut u64 {
        match status {
            AlertStatus::Pending => &mut self.pending_alerts,
            AlertStatus::Reviewed => &mut self.reviewed_alerts,
            AlertStatus::Resolved => &mut self.resolved_alerts,
            AlertStatus::Dismissed => &mut self.dismissed_alerts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_track_transitions() {
        let mut stats = StatsSummary::default();
        stats.record_created(AbuseType::ApiAbuse, Severity::Critical);
        stats.record_created(AbuseType::RateLimitExceeded, Severity::Medium);
        stats.record_transition(AlertStatus::Pending, AlertStatus::Reviewed);
        stats.record_transition(AlertStatus::Reviewed, AlertStatus::Resolved);

        assert_eq!(stats.total_alerts, 2);
        assert_eq!(stats.pending_alerts, 1);
        assert_eq!(stats.reviewed_alerts, 0);
        assert_eq!(stats.resolved_alerts, 1);
        assert_eq!(stats.critical_alerts, 1);
        assert_eq!(stats.alerts_by_type[&AbuseType::ApiAbuse], 1);
        assert_eq!(stats.alerts_by_type[&AbuseType::ContentViolation], 0);
        assert!(stats.is_consistent());
    }

    #[test]
    fn test_serializes_with_string_keys() {
        let json = serde_json::to_value(StatsSummary::default()).unwrap();
        assert_eq!(json["alerts_by_type"]["api_abuse"], 0);
        assert_eq!(json["alerts_by_severity"]["critical"], 0);
    }
}
