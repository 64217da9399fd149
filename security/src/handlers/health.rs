use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use super::{require_admin, ApiResponse};
use crate::errors::ServiceError;
use crate::state::AppState;

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let db_status = match &state.database {
        Some(db) => {
            if db.ping().await {
                "connected"
            } else {
                tracing::error!("[Security Service] Database health check failed");
                "disconnected"
            }
        }
        None => "disabled",
    };

    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "security-service",
        "storage": state.storage_label(),
        "database": db_status,
        "timestamp": chrono::Utc::now()
    }))
}

/// Identity of the calling administrator.
pub async fn whoami(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, ServiceError> {
    let admin = require_admin(&req, &state).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        "Administrator",
        json!({
            "user_id": admin.user_id(),
            "email": admin.email,
            "is_admin": true
        }),
    )))
}
