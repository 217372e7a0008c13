//! Product catalog route handlers.
//!
//! Reads are public. Writes require the `Admin` role.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use velvet_core::{NewProduct, Product, ProductId};

use crate::db::{ProductRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// List every product.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    let products = ProductRepository::new(state.pool()).list().await?;
    Ok(Json(products))
}

/// Get one product.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    ProductRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
}

/// Create a product.
#[instrument(skip(admin, state, product), fields(admin = %admin.name))]
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(product): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>)> {
    product
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let created = ProductRepository::new(state.pool()).create(&product).await?;
    tracing::info!(product_id = %created.id, "Created product");

    Ok((StatusCode::CREATED, Json(created)))
}

/// Replace a product.
#[instrument(skip(admin, state, product), fields(admin = %admin.name))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(product): Json<Product>,
) -> Result<StatusCode> {
    if product.id != id {
        return Err(AppError::BadRequest(
            "Product id does not match the request path.".to_string(),
        ));
    }
    NewProduct::from(product.clone())
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    match ProductRepository::new(state.pool()).update(&product).await {
        Ok(()) => {
            tracing::info!(product_id = %id, "Updated product");
            Ok(StatusCode::NO_CONTENT)
        }
        Err(RepositoryError::NotFound) => Err(AppError::NotFound("Product".to_string())),
        Err(e) => Err(e.into()),
    }
}

/// Delete a product.
#[instrument(skip(admin, state), fields(admin = %admin.name))]
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    if !ProductRepository::new(state.pool()).delete(id).await? {
        return Err(AppError::NotFound("Product".to_string()));
    }

    tracing::info!(product_id = %id, "Deleted product");
    Ok(StatusCode::NO_CONTENT)
}
