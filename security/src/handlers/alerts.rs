use abuseguard_models::StatsSummary;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{require_admin, ApiResponse, LimitQuery};
use crate::errors::ServiceError;
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct ResolveRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReconcileReport {
    pub summary: StatsSummary,
    pub consistent: bool,
}

pub async fn list_pending(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<LimitQuery>,
) -> Result<HttpResponse, ServiceError> {
    require_admin(&req, &state).await?;

    let alerts = state.engine.get_pending_alerts(query.resolved()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(format!("{} pending alerts", alerts.len()), alerts)))
}

pub async fn get_stats(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, ServiceError> {
    require_admin(&req, &state).await?;

    let stats = state.engine.get_alert_stats().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Alert statistics", stats)))
}

/// Recount from the full alert list and compare with the live counters.
pub async fn reconcile_stats(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, ServiceError> {
    require_admin(&req, &state).await?;

    let (summary, consistent) = state.engine.stats().reconcile().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        "Alert statistics reconciled",
        ReconcileReport { summary, consistent },
    )))
}

pub async fn list_for_user(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<LimitQuery>,
) -> Result<HttpResponse, ServiceError> {
    require_admin(&req, &state).await?;

    let user_id = path.into_inner();
    let alerts = state.engine.get_user_alerts(&user_id, query.resolved()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(format!("{} alerts for user {}", alerts.len(), user_id), alerts)))
}

pub async fn get_alert(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    require_admin(&req, &state).await?;

    let alert_id = path.into_inner();
    let alert = state
        .engine
        .get_alert(alert_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Alert {}", alert_id)))?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Alert found", alert)))
}

pub async fn review_alert(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    let admin = require_admin(&req, &state).await?;

    let alert = state.engine.review_alert(path.into_inner(), admin.user_id()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Alert marked as reviewed", alert)))
}

pub async fn resolve_alert(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: Option<web::Json<ResolveRequest>>,
) -> Result<HttpResponse, ServiceError> {
    let admin = require_admin(&req, &state).await?;

    let notes = body
        .map(|b| b.into_inner())
        .unwrap_or_default()
        .notes
        .filter(|n| !n.trim().is_empty());
    let alert = state.engine.resolve_alert(path.into_inner(), admin.user_id(), notes).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Alert resolved", alert)))
}

pub async fn dismiss_alert(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    let admin = require_admin(&req, &state).await?;

    let alert = state.engine.dismiss_alert(path.into_inner(), Some(admin.user_id())).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Alert dismissed", alert)))
}
