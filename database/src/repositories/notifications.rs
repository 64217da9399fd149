use abuseguard_engine::{AbuseError, AbuseResult, NotificationStore};
use abuseguard_models::AdminNotification;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::db_error;
use crate::models::NotificationRow;

const NOTIFICATION_COLUMNS: &str = "id, admin_user_id, alert_id, title, message, severity, read, created_at, expires_at";

/// Expired rows are kept; listing filters them out.
pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn create(&self, notification: &AdminNotification) -> AbuseResult<()> {
        sqlx::query(
            r#"
            INSERT INTO admin_notifications (
                id, admin_user_id, alert_id, title, message, severity, read, created_at, expires_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(notification.id)
        .bind(&notification.admin_user_id)
        .bind(notification.alert_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.severity.as_str())
        .bind(notification.read)
        .bind(notification.created_at)
        .bind(notification.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create admin notification", e))?;
        Ok(())
    }

    async fn list_for_admin(
        &self,
        admin_id: &str,
        unread_only: bool,
        now: DateTime<Utc>,
    ) -> AbuseResult<Vec<AdminNotification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            SELECT {}
            FROM admin_notifications
            WHERE admin_user_id = $1
              AND expires_at > $2
              AND (NOT $3 OR read = FALSE)
            ORDER BY created_at DESC
            "#,
            NOTIFICATION_COLUMNS
        ))
        .bind(admin_id)
        .bind(now)
        .bind(unread_only)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list admin notifications", e))?;

        rows.into_iter()
            .map(|row| AdminNotification::try_from(row).map_err(AbuseError::store))
            .collect()
    }

    async fn mark_read(&self, notification_id: Uuid, admin_id: &str) -> AbuseResult<AdminNotification> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            UPDATE admin_notifications
            SET read = TRUE
            WHERE id = $1 AND admin_user_id = $2
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        ))
        .bind(notification_id)
        .bind(admin_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to mark notification read", e))?
        .ok_or(AbuseError::NotFound(notification_id))?;

        AdminNotification::try_from(row).map_err(AbuseError::store)
    }
}
