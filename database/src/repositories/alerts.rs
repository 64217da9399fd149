use abuseguard_engine::{AbuseError, AbuseResult, AlertStore};
use abuseguard_models::{AbuseType, Alert, AlertStatus, LifecycleAction, Severity, StatsSummary};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{db_error, sql_limit};
use crate::models::{counters, AlertRow, ALERT_COLUMNS};

/// Alerts and their summary counters. Every write touches the alert row and
/// the counters in one transaction.
pub struct PgAlertStore {
    pool: PgPool,
}

impl PgAlertStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_alerts(&self, sql: &str, bind_user: Option<&str>, limit: Option<usize>) -> AbuseResult<Vec<Alert>> {
        let mut query = sqlx::query_as::<_, AlertRow>(sql);
        if let Some(user_id) = bind_user {
            query = query.bind(user_id);
        }
        if let Some(limit) = limit {
            query = query.bind(sql_limit(limit));
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list abuse alerts", e))?;

        rows.into_iter()
            .map(|row| Alert::try_from(row).map_err(AbuseError::store))
            .collect()
    }
}

async fn bump_counter(tx: &mut Transaction<'_, Postgres>, counter: &str, delta: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO alert_stat_counters (counter, value)
        VALUES ($1, $2)
        ON CONFLICT (counter) DO UPDATE SET value = alert_stat_counters.value + EXCLUDED.value
        "#,
    )
    .bind(counter)
    .bind(delta)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl AlertStore for PgAlertStore {
    async fn insert(&self, alert: &Alert) -> AbuseResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        sqlx::query(
            r#"
            INSERT INTO abuse_alerts (
                id, user_id, user_email, created_at, reason, abuse_type, severity,
                details, status, resolved_at, resolved_by, notes
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(alert.id)
        .bind(&alert.user_id)
        .bind(&alert.user_email)
        .bind(alert.created_at)
        .bind(&alert.reason)
        .bind(alert.abuse_type.as_str())
        .bind(alert.severity.as_str())
        .bind(Json(&alert.details))
        .bind(alert.status.as_str())
        .bind(alert.resolved_at)
        .bind(&alert.resolved_by)
        .bind(&alert.notes)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to insert abuse alert", e))?;

        let keys = [
            counters::TOTAL.to_string(),
            counters::status(alert.status),
            counters::abuse_type(alert.abuse_type),
            counters::severity(alert.severity),
        ];
        for key in &keys {
            bump_counter(&mut tx, key, 1)
                .await
                .map_err(|e| db_error("Failed to update alert counters", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit abuse alert", e))?;
        Ok(())
    }

    async fn get(&self, alert_id: Uuid) -> AbuseResult<Option<Alert>> {
        let row = sqlx::query_as::<_, AlertRow>(&format!("SELECT {} FROM abuse_alerts WHERE id = $1", ALERT_COLUMNS))
            .bind(alert_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to get abuse alert", e))?;

        row.map(Alert::try_from).transpose().map_err(AbuseError::store)
    }

    async fn apply_transition(
        &self,
        alert_id: Uuid,
        action: &LifecycleAction,
        at: DateTime<Utc>,
    ) -> AbuseResult<(AlertStatus, Alert)> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        // Row lock serialises concurrent transitions on the same alert
        let row = sqlx::query_as::<_, AlertRow>(&format!(
            "SELECT {} FROM abuse_alerts WHERE id = $1 FOR UPDATE",
            ALERT_COLUMNS
        ))
        .bind(alert_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to lock abuse alert", e))?
        .ok_or(AbuseError::NotFound(alert_id))?;

        let mut alert = Alert::try_from(row).map_err(AbuseError::store)?;
        let previous = alert.apply(action, at).map_err(|from| AbuseError::InvalidTransition {
            from,
            action: action.name().to_string(),
        })?;

        sqlx::query(
            r#"
            UPDATE abuse_alerts
            SET status = $2, resolved_at = $3, resolved_by = $4, notes = $5
            WHERE id = $1
            "#,
        )
        .bind(alert.id)
        .bind(alert.status.as_str())
        .bind(alert.resolved_at)
        .bind(&alert.resolved_by)
        .bind(&alert.notes)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to update abuse alert", e))?;

        bump_counter(&mut tx, &counters::status(previous), -1)
            .await
            .map_err(|e| db_error("Failed to update alert counters", e))?;
        bump_counter(&mut tx, &counters::status(alert.status), 1)
            .await
            .map_err(|e| db_error("Failed to update alert counters", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit alert transition", e))?;

        Ok((previous, alert))
    }

    async fn list_pending(&self, limit: usize) -> AbuseResult<Vec<Alert>> {
        let sql = format!(
            "SELECT {} FROM abuse_alerts WHERE status = 'pending' ORDER BY created_at DESC LIMIT $1",
            ALERT_COLUMNS
        );
        self.fetch_alerts(&sql, None, Some(limit)).await
    }

    async fn list_by_user(&self, user_id: &str, limit: usize) -> AbuseResult<Vec<Alert>> {
        let sql = format!(
            "SELECT {} FROM abuse_alerts WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
            ALERT_COLUMNS
        );
        self.fetch_alerts(&sql, Some(user_id), Some(limit)).await
    }

    async fn list_all(&self) -> AbuseResult<Vec<Alert>> {
        let sql = format!("SELECT {} FROM abuse_alerts ORDER BY created_at", ALERT_COLUMNS);
        self.fetch_alerts(&sql, None, None).await
    }

    async fn get_stats(&self) -> AbuseResult<StatsSummary> {
        let rows: Vec<(String, i64)> = sqlx::query_as("SELECT counter, value FROM alert_stat_counters")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to read alert counters", e))?;

        Ok(summary_from_counters(rows))
    }
}

fn summary_from_counters(rows: impl IntoIterator<Item = (String, i64)>) -> StatsSummary {
    let mut summary = StatsSummary::default();
    for (counter, value) in rows {
        let value = value.max(0) as u64;
        if counter == counters::TOTAL {
            summary.total_alerts = value;
            continue;
        }
        let Some((kind, name)) = counter.split_once(':') else {
            continue;
        };
        match kind {
            "status" => match name.parse::<AlertStatus>() {
                Ok(AlertStatus::Pending) => summary.pending_alerts = value,
                Ok(AlertStatus::Reviewed) => summary.reviewed_alerts = value,
                Ok(AlertStatus::Resolved) => summary.resolved_alerts = value,
                Ok(AlertStatus::Dismissed) => summary.dismissed_alerts = value,
                Err(_) => {}
            },
            "type" => {
                if let Ok(abuse_type) = name.parse::<AbuseType>() {
                    summary.alerts_by_type.insert(abuse_type, value);
                }
            }
            "severity" => {
                if let Ok(severity) = name.parse::<Severity>() {
                    summary.alerts_by_severity.insert(severity, value);
                    if severity == Severity::Critical {
                        summary.critical_alerts = value;
                    }
                }
            }
            _ => tracing::debug!(counter = %counter, "Ignoring unknown alert counter"),
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_from_counters() {
        let rows = vec![
            ("total".to_string(), 5),
            ("status:pending".to_string(), 2),
            ("status:resolved".to_string(), 2),
            ("status:dismissed".to_string(), 1),
            ("type:api_abuse".to_string(), 3),
            ("severity:critical".to_string(), 3),
            ("severity:medium".to_string(), 2),
            ("legacy:thing".to_string(), 9),
        ];
        let summary = summary_from_counters(rows);

        assert_eq!(summary.total_alerts, 5);
        assert_eq!(summary.pending_alerts, 2);
        assert_eq!(summary.reviewed_alerts, 0);
        assert_eq!(summary.critical_alerts, 3);
        assert_eq!(summary.alerts_by_type[&AbuseType::ApiAbuse], 3);
        assert_eq!(summary.alerts_by_type[&AbuseType::ContentViolation], 0);
        assert!(summary.is_consistent());
    }

    #[test]
    fn test_empty_counters_are_zeroed() {
        let summary = summary_from_counters(Vec::new());
        assert_eq!(summary, StatsSummary::default());
    }
}
