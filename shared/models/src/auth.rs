use serde::{Deserialize, Serialize};

/// Bearer token claims. Role claims are deliberately absent: administrator
/// status is always looked up in the administrator directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
    pub aud: String,
}

impl Claims {
    pub fn user_id(&self) -> &str {
        &self.sub
    }
}

/// Claims injected when authentication is disabled for local development.
pub fn default_dev_claims() -> Claims {
    let now = chrono::Utc::now().timestamp() as usize;
    Claims {
        sub: std::env::var("DEV_USER_ID").unwrap_or_else(|_| "dev-user".to_string()),
        email: Some("dev@localhost".to_string()),
        exp: now + 24 * 3600,
        iat: now,
        iss: "abuseguard".to_string(),
        aud: "abuseguard-users".to_string(),
    }
}
