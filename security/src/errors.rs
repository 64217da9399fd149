use abuseguard_engine::AbuseError;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Administrator access required")]
    Forbidden,

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ServiceError {
    fn label(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => "Not found",
            ServiceError::Conflict(_) => "Invalid state transition",
            ServiceError::Validation(_) => "Validation error",
            ServiceError::Unauthorized => "Unauthorized",
            ServiceError::Forbidden => "Forbidden",
            ServiceError::Unavailable(_) => "Service unavailable",
            ServiceError::Internal(_) => "Internal server error",
        }
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden => StatusCode::FORBIDDEN,
            ServiceError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "success": false,
            "error": self.label(),
            "message": self.to_string()
        }))
    }
}

impl From<AbuseError> for ServiceError {
    fn from(err: AbuseError) -> Self {
        match err {
            AbuseError::NotFound(id) => ServiceError::NotFound(id.to_string()),
            AbuseError::InvalidTransition { .. } => ServiceError::Conflict(err.to_string()),
            AbuseError::Validation(msg) => ServiceError::Validation(msg),
            AbuseError::StoreUnavailable(_) | AbuseError::Timeout(_) => ServiceError::Unavailable(err.to_string()),
            AbuseError::PartialNotificationFailure { .. } => ServiceError::Internal(err.to_string()),
        }
    }
}
