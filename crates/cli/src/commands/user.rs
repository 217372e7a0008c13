//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! VELVET_USER_PASSWORD=... velvet-cli user create -u alice -e alice@example.com -r admin
//! velvet-cli user grant -u alice -r guest
//! ```
//!
//! # Environment Variables
//!
//! - `VELVET_DATABASE_URL` - `PostgreSQL` connection string (or `DATABASE_URL`)
//! - `VELVET_USER_PASSWORD` - Password for the new account

use sqlx::PgPool;

use velvet_api::db::UserRepository;
use velvet_api::models::{NewUser, User};
use velvet_api::services::auth::{hash_password, validate_password};
use velvet_core::{Email, Role};

use super::{CommandError, connect, required_env};

/// Create a new user.
///
/// # Returns
///
/// The ID of the created user.
pub async fn create(username: &str, email: &str, role: &str) -> Result<i32, CommandError> {
    let role = parse_role(role)?;
    let email = Email::parse(email).map_err(|_| CommandError::InvalidEmail(email.to_owned()))?;
    let password = required_env("VELVET_USER_PASSWORD")?;

    let pool = connect().await?;
    let user = create_with_password(&pool, username, email, &password, role).await?;

    tracing::info!(user_id = %user.id, %role, "Created user {}", user.username);
    Ok(user.id.as_i32())
}

/// Grant a role to an existing user.
pub async fn grant(username: &str, role: &str) -> Result<(), CommandError> {
    let role = parse_role(role)?;

    let pool = connect().await?;
    let users = UserRepository::new(&pool);
    let user = users
        .get_by_username(username)
        .await?
        .ok_or_else(|| CommandError::UserNotFound(username.to_owned()))?;

    users.add_role(user.id, role).await?;
    tracing::info!(user_id = %user.id, %role, "Granted role to {username}");
    Ok(())
}

/// Validate, hash and insert an account.
pub(super) async fn create_with_password(
    pool: &PgPool,
    username: &str,
    email: Email,
    password: &str,
    role: Role,
) -> Result<User, CommandError> {
    validate_password(password)?;

    let users = UserRepository::new(pool);
    if users.get_by_username(username).await?.is_some() {
        return Err(CommandError::UserExists(username.to_owned()));
    }

    let new_user = NewUser {
        username: username.to_owned(),
        email,
        password_hash: hash_password(password)?,
        role,
    };

    Ok(users.create(&new_user).await?)
}

fn parse_role(role: &str) -> Result<Role, CommandError> {
    role.parse()
        .map_err(|_| CommandError::InvalidRole(role.to_owned()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role("admin").unwrap(), Role::Admin);
        assert_eq!(parse_role("Guest").unwrap(), Role::Guest);
        assert!(matches!(
            parse_role("owner"),
            Err(CommandError::InvalidRole(r)) if r == "owner"
        ));
    }
}
