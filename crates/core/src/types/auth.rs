//! Authentication request and response bodies.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/auth/login`.
///
/// Fields default to empty so a partial body is reported as missing input
/// rather than as a deserialization failure.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl LoginRequest {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Body of `POST /api/auth/register` and `/api/auth/register-admin`.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Successful login response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Signed token to present as a bearer credential.
    pub token: String,
    /// When the token stops being accepted.
    pub expiration: DateTime<Utc>,
}

/// Status envelope returned by the registration endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub status: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl StatusMessage {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "Success".to_owned(),
            message: message.into(),
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            status: "Error".to_owned(),
            message: message.into(),
            errors,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_debug_redacts_password() {
        let req = LoginRequest::new("alice", "hunter2");
        let debug = format!("{req:?}");
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let req: LoginRequest = serde_json::from_str(r#"{"username":"bob"}"#).unwrap();
        assert_eq!(req.username, "bob");
        assert!(req.password.is_empty());
    }

    #[test]
    fn test_status_message_omits_empty_errors() {
        let json = serde_json::to_string(&StatusMessage::success("ok")).unwrap();
        assert_eq!(json, r#"{"status":"Success","message":"ok"}"#);
    }
}
