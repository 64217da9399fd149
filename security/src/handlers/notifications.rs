use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use super::{require_admin, ApiResponse};
use crate::errors::ServiceError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InboxQuery {
    #[serde(default)]
    pub unread_only: bool,
}

pub async fn list_notifications(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<InboxQuery>,
) -> Result<HttpResponse, ServiceError> {
    let admin = require_admin(&req, &state).await?;

    let notifications = state.engine.admin_notifications(admin.user_id(), query.unread_only).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        format!("{} notifications", notifications.len()),
        notifications,
    )))
}

pub async fn mark_read(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ServiceError> {
    let admin = require_admin(&req, &state).await?;

    let notification = state.engine.mark_notification_read(path.into_inner(), admin.user_id()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok("Notification marked as read", notification)))
}
