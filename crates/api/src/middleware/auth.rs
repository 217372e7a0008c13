//! Bearer token extractors.
//!
//! Handlers that take [`RequireAuth`] need a valid token; handlers that take
//! [`RequireAdmin`] additionally need the `Admin` role. Both work with any
//! router state that can hand out the shared [`TokenIssuer`].
//!
//! # Example
//!
//! ```rust,ignore
//! async fn delete_product(
//!     RequireAdmin(claims): RequireAdmin,
//!     Path(id): Path<ProductId>,
//! ) -> impl IntoResponse {
//!     format!("{} removes {id}", claims.name)
//! }
//! ```

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};

use velvet_core::Role;

use crate::services::token::{TokenClaims, TokenError, TokenIssuer};

/// Extractor that requires a valid bearer token.
pub struct RequireAuth(pub TokenClaims);

/// Extractor that requires a valid bearer token carrying the `Admin` role.
pub struct RequireAdmin(pub TokenClaims);

/// Why a request was refused.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthRejection {
    /// No `Authorization: Bearer` header.
    MissingToken,
    /// Token failed verification or has expired.
    InvalidToken,
    /// Token is valid but lacks the required role.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::MissingToken | Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Bearer")],
            )
                .into_response(),
            Self::Forbidden => StatusCode::FORBIDDEN.into_response(),
        }
    }
}

/// Pull the token out of `Authorization: Bearer <token>`.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl<S> FromRequestParts<S> for RequireAuth
where
    Arc<TokenIssuer>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthRejection::MissingToken)?;
        let tokens = Arc::<TokenIssuer>::from_ref(state);

        let claims = tokens.verify(token).map_err(|e| {
            match e {
                TokenError::Expired => tracing::debug!("Rejected expired token"),
                other => tracing::debug!(error = %other, "Rejected invalid token"),
            }
            AuthRejection::InvalidToken
        })?;

        Ok(Self(claims))
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    Arc<TokenIssuer>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAuth(claims) = RequireAuth::from_request_parts(parts, state).await?;

        if !claims.has_role(Role::Admin) {
            tracing::debug!(user = %claims.name, "Admin role required");
            return Err(AuthRejection::Forbidden);
        }

        Ok(Self(claims))
    }
}
