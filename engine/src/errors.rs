use abuseguard_models::AlertStatus;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

pub type AbuseResult<T> = Result<T, AbuseError>;

#[derive(Error, Debug)]
pub enum AbuseError {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Resource not found: {0}")]
    NotFound(Uuid),

    #[error("Cannot {action} an alert in state {from}")]
    InvalidTransition { from: AlertStatus, action: String },

    #[error("Failed to notify {failed} of {total} administrators")]
    PartialNotificationFailure { failed: usize, total: usize },

    #[error("Validation error: {0}")]
    Validation(String),
}

impl AbuseError {
    pub fn store(err: impl std::fmt::Display) -> Self {
        AbuseError::StoreUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AbuseError::InvalidTransition {
            from: AlertStatus::Resolved,
            action: "dismiss".to_string(),
        };
        assert_eq!(err.to_string(), "Cannot dismiss an alert in state resolved");
        assert_eq!(
            AbuseError::Timeout(Duration::from_millis(250)).to_string(),
            "Operation timed out after 250ms"
        );
    }
}
