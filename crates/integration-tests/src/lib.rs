//! Integration tests for Velvet.
//!
//! The tests drive the client library against an in-process HTTP server
//! assembled from the real auth service, token issuer, error mapping and
//! bearer extractors. Accounts live in memory, so no database is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p velvet-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::{FromRef, Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use rust_decimal::Decimal;
use secrecy::SecretString;

use velvet_api::db::RepositoryError;
use velvet_api::error::AppError;
use velvet_api::middleware::RequireAdmin;
use velvet_api::models::{NewUser, User};
use velvet_api::services::auth::{AuthService, IdentityStore, hash_password};
use velvet_api::services::token::TokenIssuer;
use velvet_core::{
    AuthResponse, Email, LoginRequest, Product, ProductId, RegisterRequest, Role, StatusMessage,
    UserId,
};

/// Signing key shared by the stub server and tests that mint their own tokens.
pub const TEST_KEY: &str = "Tq3Ny8Kc1Wp6Zr4Hv9Lm2Jx7Bd5Fs0Ga!";

/// Build a token issuer with the test key.
///
/// # Panics
///
/// Never; the test key is long enough.
#[must_use]
#[allow(clippy::expect_used)]
pub fn test_issuer() -> TokenIssuer {
    TokenIssuer::from_parts(&SecretString::from(TEST_KEY), "velvet-api", "velvet-users")
        .expect("test key is valid")
}

/// Accounts held in memory.
#[derive(Default)]
pub struct MemoryIdentityStore {
    users: Mutex<Vec<(User, String, Vec<Role>)>>,
}

impl MemoryIdentityStore {
    /// Add an account with a hashed password.
    ///
    /// # Panics
    ///
    /// Panics if hashing fails or `username` does not form a valid email.
    #[allow(clippy::expect_used)]
    pub fn insert(&self, username: &str, password: &str, roles: &[Role]) {
        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        let id = UserId::new(i32::try_from(users.len()).unwrap_or(i32::MAX) + 1);
        let user = User {
            id,
            username: username.to_owned(),
            email: Email::parse(&format!("{username}@velvet.test")).expect("valid email"),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        users.push((
            user,
            hash_password(password).expect("hashing works"),
            roles.to_vec(),
        ));
    }

    /// Number of accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether there are no accounts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn find<T>(
        &self,
        pred: impl Fn(&User) -> bool,
        map: impl Fn(&(User, String, Vec<Role>)) -> T,
    ) -> Option<T> {
        self.users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|entry| pred(&entry.0))
            .map(map)
    }
}

impl IdentityStore for &MemoryIdentityStore {
    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        Ok(self.find(|u| u.username == username, |(u, h, _)| (u.clone(), h.clone())))
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.find(|u| u.username == username, |(u, _, _)| u.clone()))
    }

    async fn roles(&self, user_id: UserId) -> Result<Vec<Role>, RepositoryError> {
        Ok(self
            .find(|u| u.id == user_id, |(_, _, r)| r.clone())
            .unwrap_or_default())
    }

    async fn create_user(&self, new_user: &NewUser) -> Result<User, RepositoryError> {
        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        let user = User {
            id: UserId::new(i32::try_from(users.len()).unwrap_or(i32::MAX) + 1),
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        users.push((user.clone(), new_user.password_hash.clone(), vec![new_user.role]));
        Ok(user)
    }
}

/// State of the stub server.
#[derive(Clone)]
pub struct StubState {
    pub tokens: Arc<TokenIssuer>,
    pub users: Arc<MemoryIdentityStore>,
    /// `Authorization` header of every catalog request, in order.
    pub seen_authorization: Arc<Mutex<Vec<Option<String>>>>,
}

impl FromRef<StubState> for Arc<TokenIssuer> {
    fn from_ref(state: &StubState) -> Self {
        Arc::clone(&state.tokens)
    }
}

impl StubState {
    /// Headers recorded so far.
    #[must_use]
    pub fn authorization_headers(&self) -> Vec<Option<String>> {
        self.seen_authorization
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// The catalog the stub serves.
#[must_use]
pub fn stub_catalog() -> Vec<Product> {
    vec![
        Product {
            id: ProductId::new(1),
            name: "Massage Oil".to_owned(),
            description: "Relaxing lavender scent.".to_owned(),
            price: Decimal::new(1999, 2),
            category: "Essentials".to_owned(),
            image_url: "https://placehold.co/300x400?text=Massage+Oil".to_owned(),
        },
        Product {
            id: ProductId::new(2),
            name: "Blindfold".to_owned(),
            description: "Soft satin blindfold for sensory play.".to_owned(),
            price: Decimal::new(700, 2),
            category: "Essentials".to_owned(),
            image_url: "https://placehold.co/300x400?text=Blindfold".to_owned(),
        },
    ]
}

async fn login(
    State(state): State<StubState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let issued = AuthService::new(state.users.as_ref(), &state.tokens)
        .login(&request)
        .await?;
    Ok(Json(AuthResponse {
        token: issued.token,
        expiration: issued.expires_at,
    }))
}

async fn register(
    State(state): State<StubState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<StatusMessage>, AppError> {
    AuthService::new(state.users.as_ref(), &state.tokens)
        .register(&request, Role::Guest)
        .await?;
    Ok(Json(StatusMessage::success("User created successfully!")))
}

fn record(state: &StubState, headers: &HeaderMap) {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    state
        .seen_authorization
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(value);
}

async fn list_products(State(state): State<StubState>, headers: HeaderMap) -> Json<Vec<Product>> {
    record(&state, &headers);
    Json(stub_catalog())
}

async fn show_product(
    State(state): State<StubState>,
    headers: HeaderMap,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, StatusCode> {
    record(&state, &headers);
    stub_catalog()
        .into_iter()
        .find(|p| p.id == id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn delete_product(RequireAdmin(_admin): RequireAdmin) -> StatusCode {
    StatusCode::NO_CONTENT
}

/// A running stub server.
pub struct StubServer {
    pub addr: SocketAddr,
    pub state: StubState,
}

impl StubServer {
    /// Start a server on an ephemeral loopback port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    #[allow(clippy::expect_used)]
    pub async fn start(users: MemoryIdentityStore) -> Self {
        let state = StubState {
            tokens: Arc::new(test_issuer()),
            users: Arc::new(users),
            seen_authorization: Arc::new(Mutex::new(Vec::new())),
        };

        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/register", post(register))
            .route("/api/products", get(list_products))
            .route("/api/products/{id}", get(show_product).delete(delete_product))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Stub server stopped");
            }
        });

        Self { addr, state }
    }

    /// Base URL of the server.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}
