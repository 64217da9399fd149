//! Multi-window threshold checks for a single user action.
//!
//! All checks are issued together and reduced in [`CheckKind::PRIORITY`]
//! order, so the reported violation never depends on which count query
//! happens to return first.

use abuseguard_config::{PolicyOverrides, ThresholdPolicy};
use abuseguard_models::{ActionFilter, CheckKind, Severity, ViolationFlags, ViolationRecord};
use abuseguard_observability::domain_events::log_check_failed;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{AbuseError, AbuseResult};
use crate::severity::classify;
use crate::stores::ActivityEventStore;
use crate::SERVICE_NAME;

/// Label recorded as the action of aggregate AI checks.
pub const AI_GROUP_LABEL: &str = "ai_requests";
/// Label recorded as the action of the all-actions burst check.
pub const ALL_ACTIONS_LABEL: &str = "all_actions";

#[derive(Debug, Clone, PartialEq)]
struct WindowCheck {
    kind: CheckKind,
    action: String,
    filter: ActionFilter,
    limit: u64,
}

impl WindowCheck {
    fn evaluate(&self, observed: u64) -> Option<ViolationRecord> {
        let (severity, flags) = match self.kind {
            CheckKind::DailyAction | CheckKind::DailyAiAggregate | CheckKind::HourlyAction => {
                (classify(observed, self.limit)?, ViolationFlags::default())
            }
            CheckKind::MinuteBurst => {
                if observed <= self.limit {
                    return None;
                }
                let flags = ViolationFlags {
                    possible_bot: observed > self.limit.saturating_mul(2),
                    possible_attack: false,
                };
                (Severity::High, flags)
            }
            CheckKind::MinuteAiBurst => {
                if observed <= self.limit {
                    return None;
                }
                let flags = ViolationFlags {
                    possible_bot: false,
                    possible_attack: true,
                };
                (Severity::Critical, flags)
            }
        };

        Some(ViolationRecord {
            check: self.kind,
            action: self.action.clone(),
            limit: self.limit,
            observed_count: observed,
            window: self.kind.window(),
            severity,
            abuse_type: self.kind.abuse_type(),
            reason: self.reason(observed),
            flags,
        })
    }

    fn reason(&self, observed: u64) -> String {
        match self.kind {
            CheckKind::DailyAction => format!("Daily limit exceeded for {}: {}/{}", self.action, observed, self.limit),
            CheckKind::DailyAiAggregate => format!("Daily AI request limit exceeded: {}/{}", observed, self.limit),
            CheckKind::HourlyAction => format!("Hourly limit exceeded for {}: {}/{}", self.action, observed, self.limit),
            CheckKind::MinuteBurst => format!("Burst activity detected: {} actions in one minute (limit {})", observed, self.limit),
            CheckKind::MinuteAiBurst => format!("AI request burst detected: {} requests in one minute (limit {})", observed, self.limit),
        }
    }
}

pub struct ViolationScanner {
    events: Arc<dyn ActivityEventStore>,
    policy: Arc<ThresholdPolicy>,
    query_timeout: Duration,
}

impl ViolationScanner {
    pub fn new(events: Arc<dyn ActivityEventStore>, policy: Arc<ThresholdPolicy>, query_timeout: Duration) -> Self {
        Self {
            events,
            policy,
            query_timeout,
        }
    }

    pub fn policy(&self) -> &ThresholdPolicy {
        &self.policy
    }

    /// First violation in priority order for `action` by `user_id`, if any.
    ///
    /// Never fails: a count query that errors or exceeds the query timeout
    /// is logged and treated as no violation for its check only.
    pub async fn scan(&self, user_id: &str, action: &str, overrides: Option<&PolicyOverrides>) -> Option<ViolationRecord> {
        self.scan_at(user_id, action, overrides, Utc::now()).await
    }

    pub async fn scan_at(
        &self,
        user_id: &str,
        action: &str,
        overrides: Option<&PolicyOverrides>,
        now: DateTime<Utc>,
    ) -> Option<ViolationRecord> {
        let policy = match overrides {
            Some(o) if !o.is_empty() => Cow::Owned(self.policy.with_overrides(o)),
            _ => Cow::Borrowed(self.policy.as_ref()),
        };
        let checks = plan_checks(&policy, action);

        let outcomes = join_all(checks.iter().map(|check| self.run_check(user_id, check, now))).await;

        let (violation, failures) = settle(&checks, outcomes);
        for (kind, e) in &failures {
            log_check_failed(SERVICE_NAME, user_id, kind.as_str(), &e.to_string());
        }
        violation
    }

    async fn run_check(&self, user_id: &str, check: &WindowCheck, now: DateTime<Utc>) -> AbuseResult<u64> {
        let since = now - check.kind.window().duration();
        match tokio::time::timeout(self.query_timeout, self.events.count_events(user_id, &check.filter, since)).await {
            Ok(result) => result,
            Err(_) => Err(AbuseError::Timeout(self.query_timeout)),
        }
    }
}

/// Reduce check outcomes to the first violation in priority order, along
/// with every failed check, including those ranked after the violation.
fn settle(checks: &[WindowCheck], outcomes: Vec<AbuseResult<u64>>) -> (Option<ViolationRecord>, Vec<(CheckKind, AbuseError)>) {
    let mut violation = None;
    let mut failures = Vec::new();
    for (check, outcome) in checks.iter().zip(outcomes) {
        match outcome {
            Ok(observed) => {
                if violation.is_none() {
                    violation = check.evaluate(observed);
                }
            }
            Err(e) => failures.push((check.kind, e)),
        }
    }
    (violation, failures)
}

/// Checks that apply to `action`, in priority order. The per-action checks
/// only run when the policy has a limit for the action; the aggregate and
/// burst checks always run.
fn plan_checks(policy: &ThresholdPolicy, action: &str) -> Vec<WindowCheck> {
    let ai_filter = ActionFilter::AnyOf(policy.ai_actions.iter().cloned().collect());

    CheckKind::PRIORITY
        .iter()
        .filter_map(|kind| {
            let (action, filter, limit) = match kind {
                CheckKind::DailyAction => (
                    action.to_string(),
                    ActionFilter::Exact(action.to_string()),
                    policy.daily_limit(action)?,
                ),
                CheckKind::DailyAiAggregate => {
                    (AI_GROUP_LABEL.to_string(), ai_filter.clone(), policy.daily_ai_requests)
                }
                CheckKind::HourlyAction => (
                    action.to_string(),
                    ActionFilter::Exact(action.to_string()),
                    policy.hourly_limit(action)?,
                ),
                CheckKind::MinuteBurst => (ALL_ACTIONS_LABEL.to_string(), ActionFilter::All, policy.burst_per_minute),
                CheckKind::MinuteAiBurst => {
                    (AI_GROUP_LABEL.to_string(), ai_filter.clone(), policy.ai_burst_per_minute)
                }
            };
            Some(WindowCheck {
                kind: *kind,
                action,
                filter,
                limit,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryActivityStore;
    use abuseguard_models::{AbuseType, ActivityEvent};
    use std::collections::{BTreeMap, BTreeSet};

    fn policy() -> ThresholdPolicy {
        ThresholdPolicy {
            daily_limits: BTreeMap::from([("booking_create".to_string(), 20)]),
            hourly_limits: BTreeMap::from([("ai_chat".to_string(), 40)]),
            daily_ai_requests: 100,
            burst_per_minute: 60,
            ai_burst_per_minute: 10,
            ai_actions: BTreeSet::from(["ai_chat".to_string(), "ai_analysis".to_string()]),
        }
    }

    async fn seed(store: &InMemoryActivityStore, user: &str, action: &str, count: usize, at: DateTime<Utc>) {
        for _ in 0..count {
            store.append(&ActivityEvent::new(user, action).at(at)).await.unwrap();
        }
    }

    #[test]
    fn test_plan_skips_unconfigured_action_checks() {
        let kinds: Vec<CheckKind> = plan_checks(&policy(), "message_send").iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![CheckKind::DailyAiAggregate, CheckKind::MinuteBurst, CheckKind::MinuteAiBurst]
        );

        let kinds: Vec<CheckKind> = plan_checks(&policy(), "booking_create").iter().map(|c| c.kind).collect();
        assert_eq!(kinds[0], CheckKind::DailyAction);
        assert!(!kinds.contains(&CheckKind::HourlyAction));
    }

    #[test]
    fn test_equality_is_not_a_violation() {
        for check in plan_checks(&policy(), "ai_chat") {
            assert!(check.evaluate(check.limit).is_none(), "{} fired at its limit", check.kind);
            assert!(check.evaluate(check.limit + 1).is_some());
        }
    }

    #[test]
    fn test_burst_flags() {
        let burst = WindowCheck {
            kind: CheckKind::MinuteBurst,
            action: ALL_ACTIONS_LABEL.to_string(),
            filter: ActionFilter::All,
            limit: 60,
        };
        let moderate = burst.evaluate(100).unwrap();
        assert_eq!(moderate.severity, Severity::High);
        assert!(!moderate.flags.possible_bot);

        let heavy = burst.evaluate(121).unwrap();
        assert_eq!(heavy.severity, Severity::High);
        assert!(heavy.flags.possible_bot);
        assert_eq!(heavy.abuse_type, AbuseType::SuspiciousActivity);
    }

    #[test]
    fn test_failures_after_violation_are_reported() {
        let checks = plan_checks(&policy(), "ai_chat");
        let kinds: Vec<CheckKind> = checks.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![CheckKind::DailyAiAggregate, CheckKind::HourlyAction, CheckKind::MinuteBurst, CheckKind::MinuteAiBurst]
        );

        let outcomes = vec![
            Ok(5),
            Ok(41),
            Err(AbuseError::Timeout(Duration::from_millis(250))),
            Err(AbuseError::StoreUnavailable("connection reset".to_string())),
        ];
        let (violation, failures) = settle(&checks, outcomes);

        assert_eq!(violation.unwrap().check, CheckKind::HourlyAction);
        let failed: Vec<CheckKind> = failures.iter().map(|(kind, _)| *kind).collect();
        assert_eq!(failed, vec![CheckKind::MinuteBurst, CheckKind::MinuteAiBurst]);
    }

    #[tokio::test]
    async fn test_daily_limit_plus_one() {
        let store = Arc::new(InMemoryActivityStore::new());
        let now = Utc::now();
        seed(&store, "u1", "booking_create", 21, now - chrono::Duration::hours(3)).await;

        let scanner = ViolationScanner::new(store, Arc::new(policy()), Duration::from_millis(250));
        let violation = scanner.scan_at("u1", "booking_create", None, now).await.unwrap();

        assert_eq!(violation.check, CheckKind::DailyAction);
        assert_eq!(violation.severity, Severity::Medium);
        assert_eq!(violation.abuse_type, AbuseType::RateLimitExceeded);
        assert_eq!(violation.observed_count, 21);
        assert_eq!(violation.limit, 20);
    }

    #[tokio::test]
    async fn test_priority_beats_severity() {
        let store = Arc::new(InMemoryActivityStore::new());
        let now = Utc::now();
        // 21 bookings in the last minute: daily (medium) and burst-free, plus a
        // critical AI burst; the daily check still wins on priority
        seed(&store, "u1", "booking_create", 21, now).await;
        seed(&store, "u1", "ai_chat", 11, now).await;

        let scanner = ViolationScanner::new(store, Arc::new(policy()), Duration::from_millis(250));
        let violation = scanner.scan_at("u1", "booking_create", None, now).await.unwrap();
        assert_eq!(violation.check, CheckKind::DailyAction);

        let violation = scanner.scan_at("u1", "ai_chat", None, now).await.unwrap();
        assert_eq!(violation.check, CheckKind::MinuteAiBurst);
        assert!(violation.flags.possible_attack);
    }

    #[tokio::test]
    async fn test_overrides_apply_to_single_call() {
        let store = Arc::new(InMemoryActivityStore::new());
        let now = Utc::now();
        seed(&store, "u1", "booking_create", 3, now - chrono::Duration::hours(2)).await;

        let scanner = ViolationScanner::new(store, Arc::new(policy()), Duration::from_millis(250));
        let strict = PolicyOverrides::default().daily_limit("booking_create", 1);

        let violation = scanner.scan_at("u1", "booking_create", Some(&strict), now).await.unwrap();
        assert_eq!(violation.severity, Severity::High);
        assert_eq!(violation.limit, 1);

        assert!(scanner.scan_at("u1", "booking_create", None, now).await.is_none());
        assert_eq!(scanner.policy().daily_limit("booking_create"), Some(20));
    }

    #[tokio::test]
    async fn test_old_events_fall_out_of_window() {
        let store = Arc::new(InMemoryActivityStore::new());
        let now = Utc::now();
        seed(&store, "u1", "ai_chat", 50, now - chrono::Duration::days(2)).await;

        let scanner = ViolationScanner::new(store, Arc::new(policy()), Duration::from_millis(250));
        assert!(scanner.scan_at("u1", "ai_chat", None, now).await.is_none());
    }
}
