//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! fl-cli migrate
//! ```
//!
//! Migrations live in `crates/dashboard/migrations/` and are embedded at
//! build time.

use thiserror::Error;

use super::CommandError;

/// Errors while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Apply pending migrations.
pub async fn run() -> Result<(), MigrationError> {
    let pool = super::connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../dashboard/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
