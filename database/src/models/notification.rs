use abuseguard_models::{AdminIdentity, AdminNotification, Severity};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::{parse_column, DecodeError};

#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    pub id: Uuid,
    pub admin_user_id: String,
    pub alert_id: Uuid,
    pub title: String,
    pub message: String,
    pub severity: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for AdminNotification {
    type Error = DecodeError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(AdminNotification {
            id: row.id,
            admin_user_id: row.admin_user_id,
            alert_id: row.alert_id,
            title: row.title,
            message: row.message,
            severity: parse_column::<Severity>("severity", row.severity)?,
            read: row.read,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AdministratorRow {
    pub user_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl From<AdministratorRow> for AdminIdentity {
    fn from(row: AdministratorRow) -> Self {
        AdminIdentity {
            user_id: row.user_id,
            email: row.email,
            display_name: row.display_name,
        }
    }
}
