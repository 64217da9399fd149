use abuseguard_engine::{AbuseResult, AdministratorDirectory};
use abuseguard_models::AdminIdentity;
use async_trait::async_trait;
use sqlx::PgPool;

use super::db_error;
use crate::models::AdministratorRow;

/// Administrators stored server side. Role claims in tokens are never
/// consulted; this table is the only source of admin status.
pub struct PgAdministratorDirectory {
    pool: PgPool,
}

impl PgAdministratorDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or reactivate an administrator.
    pub async fn upsert(&self, admin: &AdminIdentity) -> AbuseResult<()> {
        sqlx::query(
            r#"
            INSERT INTO administrators (user_id, email, display_name, active)
            VALUES ($1, $2, $3, TRUE)
            ON CONFLICT (user_id) DO UPDATE
            SET email = COALESCE(EXCLUDED.email, administrators.email),
                display_name = COALESCE(EXCLUDED.display_name, administrators.display_name),
                active = TRUE
            "#,
        )
        .bind(&admin.user_id)
        .bind(&admin.email)
        .bind(&admin.display_name)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to upsert administrator", e))?;
        Ok(())
    }
}

#[async_trait]
impl AdministratorDirectory for PgAdministratorDirectory {
    async fn list_admins(&self) -> AbuseResult<Vec<AdminIdentity>> {
        let rows = sqlx::query_as::<_, AdministratorRow>(
            "SELECT user_id, email, display_name FROM administrators WHERE active ORDER BY user_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list administrators", e))?;

        Ok(rows.into_iter().map(AdminIdentity::from).collect())
    }

    async fn is_administrator(&self, user_id: &str) -> AbuseResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM administrators WHERE user_id = $1 AND active)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to check administrator status", e))
    }
}
