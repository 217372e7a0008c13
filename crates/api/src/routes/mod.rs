//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! # Auth
//! POST   /api/auth/login           - Exchange credentials for a token
//! POST   /api/auth/register        - Create a Guest account
//! POST   /api/auth/register-admin  - Create an Admin account
//!
//! # Products
//! GET    /api/products             - List the catalog
//! GET    /api/products/{id}        - One product
//! POST   /api/products             - Create (Admin)
//! PUT    /api/products/{id}        - Replace (Admin)
//! DELETE /api/products/{id}        - Delete (Admin)
//! ```

pub mod auth;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/register-admin", post(auth::register_admin))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
}

/// Create all routes for the API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/auth", auth_routes())
        .nest("/api/products", product_routes())
}
