//! Administrator HTTP surface for abuse detection: activity intake, alert
//! review and the notification inbox.

pub mod errors;
pub mod handlers;
pub mod state;

pub use errors::ServiceError;
pub use state::AppState;

use actix_web::web;

use handlers::{activity, alerts, health, notifications};

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::health_check))
        .route("/api/activity", web::post().to(activity::record_activity))
        .service(
            web::scope("/api/admin")
                .route("/me", web::get().to(health::whoami))
                .route("/alerts/pending", web::get().to(alerts::list_pending))
                .route("/alerts/stats", web::get().to(alerts::get_stats))
                .route("/alerts/stats/reconcile", web::post().to(alerts::reconcile_stats))
                .route("/alerts/users/{user_id}", web::get().to(alerts::list_for_user))
                .route("/alerts/{id}", web::get().to(alerts::get_alert))
                .route("/alerts/{id}/review", web::post().to(alerts::review_alert))
                .route("/alerts/{id}/resolve", web::post().to(alerts::resolve_alert))
                .route("/alerts/{id}/dismiss", web::post().to(alerts::dismiss_alert))
                .route("/notifications", web::get().to(notifications::list_notifications))
                .route("/notifications/{id}/read", web::post().to(notifications::mark_read)),
        );
}
