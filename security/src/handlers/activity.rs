use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use super::{require_claims, ApiResponse};
use crate::errors::ServiceError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RecordActivityRequest {
    pub action: String,
    pub metadata: Option<serde_json::Value>,
}

/// Record an action for the authenticated caller. Detection runs inline but
/// its outcome is never exposed to the user being checked.
pub async fn record_activity(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<RecordActivityRequest>,
) -> Result<HttpResponse, ServiceError> {
    let claims = require_claims(&req)?;
    let RecordActivityRequest { action, metadata } = body.into_inner();

    state
        .recorder
        .record(claims.user_id(), &action, claims.email.as_deref(), metadata)
        .await?;

    Ok(HttpResponse::Accepted().json(ApiResponse::ok("Activity recorded", json!({ "action": action.trim() }))))
}
