//! CLI command implementations.

pub mod migrate;
pub mod seed;
pub mod user;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use velvet_api::db::{self, RepositoryError};
use velvet_api::services::auth::AuthError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Repository operation failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: admin, guest")]
    InvalidRole(String),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Password does not meet the account rules.
    #[error("Weak password: {}", .0.join(" "))]
    WeakPassword(Vec<String>),

    /// User already exists.
    #[error("User already exists: {0}")]
    UserExists(String),

    /// User does not exist.
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Password hashing failed.
    #[error("Password hashing failed")]
    PasswordHash,
}

impl From<AuthError> for CommandError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(problems) => Self::WeakPassword(problems),
            AuthError::Repository(e) => Self::Repository(e),
            _ => Self::PasswordHash,
        }
    }
}

/// Read a required environment variable, treating empty as missing.
fn required_env(key: &'static str) -> Result<String, CommandError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(CommandError::MissingEnvVar(key))
}

/// Connect to the API database (`VELVET_DATABASE_URL`, falling back to `DATABASE_URL`).
async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = required_env("VELVET_DATABASE_URL")
        .or_else(|_| required_env("DATABASE_URL"))
        .map_err(|_| CommandError::MissingEnvVar("VELVET_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(db::create_pool(&SecretString::from(database_url)).await?)
}
