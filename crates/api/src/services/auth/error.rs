//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::token::TokenError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Required login or registration fields are missing.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Unknown username or wrong password. Deliberately indistinguishable.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Registration for a username that is already taken.
    #[error("user already exists")]
    DuplicateUser,

    /// Registration input failed validation (email format, password rules).
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Token signing failed.
    #[error("token error: {0}")]
    Token(#[from] TokenError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
