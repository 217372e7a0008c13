//! Authentication service.
//!
//! Verifies username/password credentials, issues tokens, and registers
//! accounts. Storage is reached through [`IdentityStore`] so the service can
//! run against `PostgreSQL` in production and an in-memory store in tests.

mod error;

pub use error::AuthError;

use std::future::Future;
use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use velvet_core::{Email, LoginRequest, RegisterRequest, Role, UserId};

use crate::db::{RepositoryError, UserRepository};
use crate::models::{NewUser, User};
use crate::services::token::{IssuedToken, TokenIssuer};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Hash checked against when the username is unknown, so both failed-login
/// paths pay the same Argon2 cost.
static UNKNOWN_USER_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("velvet-unknown-user").ok());

/// Account storage needed by [`AuthService`].
pub trait IdentityStore {
    /// Look up a user and their password hash.
    fn find_credentials(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<(User, String)>, RepositoryError>> + Send;

    /// Look up a user without the hash.
    fn find_user(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Roles granted to a user.
    fn roles(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<Role>, RepositoryError>> + Send;

    /// Persist a new user with their initial role.
    fn create_user(
        &self,
        new_user: &NewUser,
    ) -> impl Future<Output = Result<User, RepositoryError>> + Send;
}

impl IdentityStore for UserRepository<'_> {
    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        self.get_password_hash(username).await
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        self.get_by_username(username).await
    }

    async fn roles(&self, user_id: UserId) -> Result<Vec<Role>, RepositoryError> {
        self.get_roles(user_id).await
    }

    async fn create_user(&self, new_user: &NewUser) -> Result<User, RepositoryError> {
        self.create(new_user).await
    }
}

/// Authentication service.
pub struct AuthService<'a, S> {
    users: S,
    tokens: &'a TokenIssuer,
}

impl<'a, S: IdentityStore> AuthService<'a, S> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: S, tokens: &'a TokenIssuer) -> Self {
        Self { users, tokens }
    }

    /// Verify credentials and issue a token carrying the user's roles.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidInput` if either field is empty; no lookup
    /// happens in that case.
    /// Returns `AuthError::InvalidCredentials` if the user is unknown or the
    /// password does not verify.
    pub async fn login(&self, request: &LoginRequest) -> Result<IssuedToken, AuthError> {
        let username = request.username.trim();
        if username.is_empty() || request.password.is_empty() {
            return Err(AuthError::InvalidInput(
                "Username and password are required.".to_owned(),
            ));
        }

        let Some((user, password_hash)) = self.users.find_credentials(username).await? else {
            if let Some(hash) = UNKNOWN_USER_HASH.as_deref() {
                // Result ignored; the user does not exist either way.
                let _ = verify_password(&request.password, hash);
            }
            return Err(AuthError::InvalidCredentials);
        };

        verify_password(&request.password, &password_hash)?;

        let roles = self.users.roles(user.id).await?;
        let issued = self.tokens.issue(&user.username, &roles)?;

        tracing::info!(user_id = %user.id, roles = roles.len(), "Issued access token");
        Ok(issued)
    }

    /// Register a new account with `role`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidInput` if a field is missing.
    /// Returns `AuthError::DuplicateUser` if the username is taken; the store
    /// is not modified.
    /// Returns `AuthError::Validation` listing every email/password problem.
    pub async fn register(&self, request: &RegisterRequest, role: Role) -> Result<User, AuthError> {
        let username = request.username.trim();
        if username.is_empty() || request.email.trim().is_empty() || request.password.is_empty() {
            return Err(AuthError::InvalidInput(
                "Username, email and password are required.".to_owned(),
            ));
        }

        if self.users.find_user(username).await?.is_some() {
            return Err(AuthError::DuplicateUser);
        }

        let mut problems = password_problems(&request.password);
        let email = match Email::parse(&request.email) {
            Ok(email) => Some(email),
            Err(e) => {
                problems.insert(0, format!("Email '{}' is invalid: {e}.", request.email.trim()));
                None
            }
        };
        let Some(email) = email.filter(|_| problems.is_empty()) else {
            return Err(AuthError::Validation(problems));
        };

        let new_user = NewUser {
            username: username.to_owned(),
            email,
            password_hash: hash_password(&request.password)?,
            role,
        };

        let user = self
            .users
            .create_user(&new_user)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::DuplicateUser,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, %role, "Registered user");
        Ok(user)
    }
}

/// Check a password against the account rules.
///
/// # Errors
///
/// Returns `AuthError::Validation` listing every rule the password breaks.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    let problems = password_problems(password);
    if problems.is_empty() {
        Ok(())
    } else {
        Err(AuthError::Validation(problems))
    }
}

/// Collect every rule the password breaks.
fn password_problems(password: &str) -> Vec<String> {
    let mut problems = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        problems.push(format!(
            "Passwords must be at least {MIN_PASSWORD_LENGTH} characters."
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        problems.push("Passwords must have at least one digit ('0'-'9').".to_owned());
    }
    if !password.chars().any(char::is_lowercase) {
        problems.push("Passwords must have at least one lowercase ('a'-'z').".to_owned());
    }
    if !password.chars().any(char::is_uppercase) {
        problems.push("Passwords must have at least one uppercase ('A'-'Z').".to_owned());
    }
    if password.chars().all(char::is_alphanumeric) {
        problems.push("Passwords must have at least one non alphanumeric character.".to_owned());
    }
    problems
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
