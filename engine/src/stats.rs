use abuseguard_models::{Alert, StatsSummary};
use abuseguard_observability::log_timed;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::errors::AbuseResult;
use crate::stores::AlertStore;

struct CachedSummary {
    summary: StatsSummary,
    fetched_at: Instant,
}

/// Dashboard counts, served from a short-lived snapshot of the store's
/// incremental counters. Reads within `ttl` of the last refresh may lag
/// behind the latest transitions.
pub struct StatsAggregator {
    alerts: Arc<dyn AlertStore>,
    ttl: Duration,
    cache: RwLock<Option<CachedSummary>>,
}

impl StatsAggregator {
    pub fn new(alerts: Arc<dyn AlertStore>, ttl: Duration) -> Self {
        Self {
            alerts,
            ttl,
            cache: RwLock::new(None),
        }
    }

    pub async fn summary(&self) -> AbuseResult<StatsSummary> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                return Ok(cached.summary.clone());
            }
        }
        self.refresh().await
    }

    /// Bypass the snapshot and read the counters now.
    pub async fn refresh(&self) -> AbuseResult<StatsSummary> {
        let summary = self.alerts.get_stats().await?;
        *self.cache.write().await = Some(CachedSummary {
            summary: summary.clone(),
            fetched_at: Instant::now(),
        });
        Ok(summary)
    }

    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    /// Recompute the summary from every alert and compare it with the
    /// incremental counters. Returns the recomputed summary and whether the
    /// counters agreed.
    pub async fn reconcile(&self) -> AbuseResult<(StatsSummary, bool)> {
        let alerts = self.alerts.list_all().await?;
        let recomputed = log_timed!("stats_full_scan", Self::compute(&alerts));
        let counters = self.alerts.get_stats().await?;

        let consistent = recomputed == counters;
        if !consistent {
            tracing::warn!(
                counted_total = counters.total_alerts,
                scanned_total = recomputed.total_alerts,
                "Alert stat counters disagree with a full scan"
            );
        }
        Ok((recomputed, consistent))
    }

    pub fn compute(alerts: &[Alert]) -> StatsSummary {
        StatsSummary::from_alerts(alerts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryAlertStore;
    use abuseguard_models::{
        AbuseType, AlertStatus, CheckKind, LifecycleAction, Severity, TimeWindow, ViolationFlags, ViolationRecord,
    };
    use chrono::Utc;

    fn violation(abuse_type: AbuseType, severity: Severity) -> ViolationRecord {
        ViolationRecord {
            check: CheckKind::MinuteBurst,
            action: "all_actions".to_string(),
            limit: 60,
            observed_count: 61,
            window: TimeWindow::Minute,
            severity,
            abuse_type,
            reason: "burst".to_string(),
            flags: ViolationFlags::default(),
        }
    }

    #[tokio::test]
    async fn test_snapshot_is_cached_until_refresh() {
        let store = Arc::new(InMemoryAlertStore::new());
        let aggregator = StatsAggregator::new(store.clone(), Duration::from_secs(60));

        store.create(&violation(AbuseType::ApiAbuse, Severity::Critical), "u1", None, None).await.unwrap();
        assert_eq!(aggregator.summary().await.unwrap().total_alerts, 1);

        store.create(&violation(AbuseType::ApiAbuse, Severity::High), "u1", None, None).await.unwrap();
        assert_eq!(aggregator.summary().await.unwrap().total_alerts, 1);
        assert_eq!(aggregator.refresh().await.unwrap().total_alerts, 2);

        store.create(&violation(AbuseType::ApiAbuse, Severity::High), "u2", None, None).await.unwrap();
        aggregator.invalidate().await;
        assert_eq!(aggregator.summary().await.unwrap().total_alerts, 3);
    }

    #[tokio::test]
    async fn test_zero_ttl_always_reads_through() {
        let store = Arc::new(InMemoryAlertStore::new());
        let aggregator = StatsAggregator::new(store.clone(), Duration::ZERO);

        aggregator.summary().await.unwrap();
        store.create(&violation(AbuseType::SuspiciousActivity, Severity::High), "u1", None, None).await.unwrap();
        assert_eq!(aggregator.summary().await.unwrap().total_alerts, 1);
    }

    #[tokio::test]
    async fn test_reconcile_matches_counters() {
        let store = Arc::new(InMemoryAlertStore::new());
        let aggregator = StatsAggregator::new(store.clone(), Duration::from_secs(5));

        let a = store.create(&violation(AbuseType::ApiAbuse, Severity::Critical), "u1", None, None).await.unwrap();
        let b = store.create(&violation(AbuseType::RateLimitExceeded, Severity::Medium), "u2", None, None).await.unwrap();
        store.create(&violation(AbuseType::SuspiciousActivity, Severity::High), "u3", None, None).await.unwrap();

        store
            .apply_transition(a.id, &LifecycleAction::Review { reviewer_id: "admin".into() }, Utc::now())
            .await
            .unwrap();
        store
            .apply_transition(b.id, &LifecycleAction::Dismiss { dismissed_by: None, notes: None }, Utc::now())
            .await
            .unwrap();

        let (summary, consistent) = aggregator.reconcile().await.unwrap();
        assert!(consistent);
        assert!(summary.is_consistent());
        assert_eq!(summary.count_for(AlertStatus::Pending), 1);
        assert_eq!(summary.count_for(AlertStatus::Reviewed), 1);
        assert_eq!(summary.count_for(AlertStatus::Dismissed), 1);
        assert_eq!(summary.critical_alerts, 1);
    }
}
