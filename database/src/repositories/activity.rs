use abuseguard_engine::{AbuseResult, ActivityEventStore};
use abuseguard_models::{ActionFilter, ActivityEvent};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::db_error;

pub struct PgActivityEventStore {
    pool: PgPool,
}

impl PgActivityEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityEventStore for PgActivityEventStore {
    async fn count_events(&self, user_id: &str, filter: &ActionFilter, since: DateTime<Utc>) -> AbuseResult<u64> {
        let count: i64 = match filter {
            ActionFilter::Exact(action) => {
                sqlx::query_scalar::<_, i64>(
                    r#"
                    SELECT COUNT(*)
                    FROM activity_events
                    WHERE user_id = $1
                      AND action = $2
                      AND occurred_at >= $3
                    "#,
                )
                .bind(user_id)
                .bind(action)
                .bind(since)
                .fetch_one(&self.pool)
                .await
            }
            ActionFilter::AnyOf(actions) => {
                sqlx::query_scalar::<_, i64>(
                    r#"
                    SELECT COUNT(*)
                    FROM activity_events
                    WHERE user_id = $1
                      AND action = ANY($2)
                      AND occurred_at >= $3
                    "#,
                )
                .bind(user_id)
                .bind(actions.as_slice())
                .bind(since)
                .fetch_one(&self.pool)
                .await
            }
            ActionFilter::All => {
                sqlx::query_scalar::<_, i64>(
                    r#"
                    SELECT COUNT(*)
                    FROM activity_events
                    WHERE user_id = $1
                      AND occurred_at >= $2
                    "#,
                )
                .bind(user_id)
                .bind(since)
                .fetch_one(&self.pool)
                .await
            }
        }
        .map_err(|e| db_error("Failed to count activity events", e))?;

        Ok(count.max(0) as u64)
    }

    async fn append(&self, event: &ActivityEvent) -> AbuseResult<()> {
        sqlx::query(
            r#"
            INSERT INTO activity_events (user_id, action, occurred_at, metadata)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&event.user_id)
        .bind(&event.action)
        .bind(event.timestamp)
        .bind(&event.metadata)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to record activity event", e))?;
        Ok(())
    }
}
