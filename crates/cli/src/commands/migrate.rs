//! Database migration command.
//!
//! Applies the migrations embedded from `crates/api/migrations/`.
//!
//! # Environment Variables
//!
//! - `VELVET_DATABASE_URL` - `PostgreSQL` connection string (or `DATABASE_URL`)

use super::{CommandError, connect};

/// Run all pending migrations.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    velvet_api::db::run_migrations(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
