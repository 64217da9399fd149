pub mod activity;
pub mod alerts;
pub mod health;
pub mod notifications;

use abuseguard_middleware::auth::extract_claims_from_request;
use abuseguard_models::auth::Claims;
use abuseguard_observability::log_security;
use actix_web::HttpRequest;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::state::AppState;

pub const DEFAULT_LIST_LIMIT: usize = 50;
pub const MAX_LIST_LIMIT: usize = 500;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

impl LimitQuery {
    pub fn resolved(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
    }
}

pub(crate) fn require_claims(req: &HttpRequest) -> Result<Claims, ServiceError> {
    extract_claims_from_request(req).ok_or(ServiceError::Unauthorized)
}

/// Authenticated caller who is also listed in the administrator directory.
pub(crate) async fn require_admin(req: &HttpRequest, state: &AppState) -> Result<Claims, ServiceError> {
    let claims = require_claims(req)?;
    if !state.engine.is_administrator(claims.user_id()).await {
        log_security!("admin_access_denied", user_id = claims.user_id(), path = req.path());
        return Err(ServiceError::Forbidden);
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_defaults_and_clamps() {
        assert_eq!(LimitQuery { limit: None }.resolved(), DEFAULT_LIST_LIMIT);
        assert_eq!(LimitQuery { limit: Some(0) }.resolved(), 1);
        assert_eq!(LimitQuery { limit: Some(10_000) }.resolved(), MAX_LIST_LIMIT);
        assert_eq!(LimitQuery { limit: Some(20) }.resolved(), 20);
    }
}
