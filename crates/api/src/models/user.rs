//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};

use velvet_core::{Email, Role, UserId};

/// A registered account (domain type).
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login name, unique across accounts.
    pub username: String,
    /// Contact address given at registration.
    pub email: Email,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Validated input for creating an account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Email,
    /// Argon2id PHC string, never the plaintext password.
    pub password_hash: String,
    /// Role granted at creation.
    pub role: Role,
}
