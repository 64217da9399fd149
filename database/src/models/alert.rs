use abuseguard_models::{AbuseType, Alert, AlertDetails, AlertStatus, Severity};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::{parse_column, DecodeError};

pub const ALERT_COLUMNS: &str =
    "id, user_id, user_email, created_at, reason, abuse_type, severity, details, status, resolved_at, resolved_by, notes";

#[derive(Debug, Clone, FromRow)]
pub struct AlertRow {
    pub id: Uuid,
    pub user_id: String,
    pub user_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reason: String,
    pub abuse_type: String,
    pub severity: String,
    pub details: Json<AlertDetails>,
    pub status: String,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
    pub notes: Option<String>,
}

impl TryFrom<AlertRow> for Alert {
    type Error = DecodeError;

    fn try_from(row: AlertRow) -> Result<Self, Self::Error> {
        Ok(Alert {
            id: row.id,
            user_id: row.user_id,
            user_email: row.user_email,
            created_at: row.created_at,
            reason: row.reason,
            abuse_type: parse_column::<AbuseType>("abuse_type", row.abuse_type)?,
            severity: parse_column::<Severity>("severity", row.severity)?,
            details: row.details.0,
            status: parse_column::<AlertStatus>("status", row.status)?,
            resolved_at: row.resolved_at,
            resolved_by: row.resolved_by,
            notes: row.notes,
        })
    }
}

/// Keys of the `alert_stat_counters` rows.
pub mod counters {
    use abuseguard_models::{AbuseType, AlertStatus, Severity};

    pub const TOTAL: &str = "total";

    pub fn status(status: AlertStatus) -> String {
        format!("status:{}", status)
    }

    pub fn abuse_type(abuse_type: AbuseType) -> String {
        format!("type:{}", abuse_type)
    }

    pub fn severity(severity: Severity) -> String {
        format!("severity:{}", severity)
    }
}
