//! Authentication route handlers.

use axum::{Json, extract::State};
use tracing::instrument;

use velvet_core::{AuthResponse, LoginRequest, RegisterRequest, Role, StatusMessage};

use crate::db::UserRepository;
use crate::error::Result;
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Exchange a username and password for a signed token.
#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let service = AuthService::new(UserRepository::new(state.pool()), state.tokens());
    let issued = service.login(&request).await?;

    Ok(Json(AuthResponse {
        token: issued.token,
        expiration: issued.expires_at,
    }))
}

/// Register a Guest account.
#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<StatusMessage>> {
    register_with_role(&state, &request, Role::Guest).await
}

/// Register an Admin account.
#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn register_admin(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<StatusMessage>> {
    register_with_role(&state, &request, Role::Admin).await
}

async fn register_with_role(
    state: &AppState,
    request: &RegisterRequest,
    role: Role,
) -> Result<Json<StatusMessage>> {
    let service = AuthService::new(UserRepository::new(state.pool()), state.tokens());
    service.register(request, role).await?;

    Ok(Json(StatusMessage::success("User created successfully!")))
}
