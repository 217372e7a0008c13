//! User repository for database operations.
//!
//! Accounts live in `users`; role grants live in `user_role`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use velvet_core::{Email, Role, UserId};

use super::RepositoryError;
use crate::models::{NewUser, User};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for user queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    username: String,
    email: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            username: row.username,
            email,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Internal row type for the login lookup.
#[derive(Debug, sqlx::FromRow)]
struct UserWithHashRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their username.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, username, email, created_at, updated_at
            FROM users
            WHERE username = $1
            ",
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a user and their password hash by username.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithHashRow>(
            r"
            SELECT id, username, email, created_at, updated_at, password_hash
            FROM users
            WHERE username = $1
            ",
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some((row.user.try_into()?, row.password_hash)))
    }

    /// Get the roles granted to a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if a stored role is unknown.
    pub async fn get_roles(&self, user_id: UserId) -> Result<Vec<Role>, RepositoryError> {
        let names: Vec<String> = sqlx::query_scalar(
            r"
            SELECT role FROM user_role
            WHERE user_id = $1
            ORDER BY role
            ",
        )
        .bind(user_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        names
            .iter()
            .map(|name| {
                name.parse::<Role>()
                    .map_err(|e| RepositoryError::DataCorruption(e.to_string()))
            })
            .collect()
    }

    /// Create a user together with their initial role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the username is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new_user: &NewUser) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, created_at, updated_at
            ",
        )
        .bind(&new_user.username)
        .bind(new_user.email.as_str())
        .bind(&new_user.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "username"))?;

        sqlx::query("INSERT INTO user_role (user_id, role) VALUES ($1, $2)")
            .bind(row.id)
            .bind(new_user.role.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        row.try_into()
    }

    /// Grant an additional role to an existing user. Granting twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the statement fails.
    pub async fn add_role(&self, user_id: UserId, role: Role) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO user_role (user_id, role)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(user_id.as_i32())
        .bind(role.as_str())
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
