//! Velvet catalog API library.
//!
//! Issues signed tokens for username/password credentials and serves the
//! product catalog. The binary in `main.rs` wires this up behind Sentry and
//! graceful shutdown; tests build the same router via [`app`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the application router with health checks, API routes and the
/// CORS and tracing layers.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::{ApiConfig, JwtConfig};

    /// State whose pool never connects; enough for routes that reject early.
    fn offline_state() -> AppState {
        let config = ApiConfig {
            database_url: SecretString::from("postgres://velvet@127.0.0.1:1/velvet"),
            host: "127.0.0.1".parse().unwrap(),
            port: 5000,
            jwt: JwtConfig {
                key: SecretString::from("Pz6Wn3Xk9Qb2Lr7Tc4Vm8Hd1Jf5Gs0Ky!"),
                issuer: "velvet-api".to_string(),
                audience: "velvet-users".to_string(),
            },
            sentry_dsn: None,
            sentry_environment: None,
        };
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://velvet@127.0.0.1:1/velvet")
            .unwrap();
        AppState::new(config, pool).unwrap()
    }

    async fn send(request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app(offline_state()).oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"ok");
    }

    #[tokio::test]
    async fn test_readiness_without_database() {
        let (status, _) = send(Request::get("/health/ready").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_login_with_missing_fields_is_rejected_before_lookup() {
        let request = Request::post("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"username":"alice"}"#))
            .unwrap();

        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Username and password are required.");
    }

    #[tokio::test]
    async fn test_product_writes_require_token() {
        let request = Request::delete("/api/products/1")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_product_writes_require_admin_role() {
        let state = offline_state();
        let token = state
            .tokens()
            .issue("bob", &[velvet_core::Role::Guest])
            .unwrap()
            .token;

        let request = Request::delete("/api/products/1")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let response = app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_cors_preflight_is_allowed() {
        let request = Request::options("/api/products")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap();
        let response = app(offline_state()).oneshot(request).await.unwrap();
        assert!(response.status().is_success());
        assert!(
            response
                .headers()
                .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        );
    }
}
