//! The bearer credential attached to outgoing requests.

use std::sync::{PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};

/// Token presented as `Authorization: Bearer <token>`.
///
/// Shared between the session holder, which sets and clears it, and the API
/// client, which reads it for every request.
#[derive(Default)]
pub struct BearerCredential {
    token: RwLock<Option<SecretString>>,
}

impl BearerCredential {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `token` to subsequent requests.
    pub fn set(&self, token: &str) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) =
            Some(SecretString::from(token.to_owned()));
    }

    /// Stop attaching a token.
    pub fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// The `Authorization` header value, if a token is attached.
    #[must_use]
    pub fn header_value(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|token| format!("Bearer {}", token.expose_secret()))
    }
}

impl std::fmt::Debug for BearerCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerCredential")
            .field("token", &self.is_set().then_some("[REDACTED]"))
            .finish()
    }
}
