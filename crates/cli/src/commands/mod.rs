//! Subcommand implementations.

pub mod export;
pub mod migrate;
pub mod seed;
pub mod settings;

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use thiserror::Error;

use flipledger_dashboard::config::{ConfigError, DashboardConfig};
use flipledger_dashboard::db::{self, PgStore};
use flipledger_dashboard::services::{ServiceError, SettingsCache, SettingsService};
use flipledger_dashboard::models::AppSettings;

/// Errors shared by the commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Connect to `DATABASE_URL`.
pub async fn connect() -> Result<PgPool, CommandError> {
    let config = DashboardConfig::from_env()?;
    tracing::info!("Connecting to database...");
    Ok(db::create_pool(config.database_url()?).await?)
}

/// A store over `DATABASE_URL` together with the settings in force.
pub async fn open_store() -> Result<(Arc<PgStore>, SettingsCache, Arc<AppSettings>), CommandError> {
    let store = Arc::new(PgStore::new(connect().await?));
    let cache = SettingsCache::new(Duration::from_secs(60));
    let settings = SettingsService::new(store.as_ref(), &cache).current().await?;
    Ok((store, cache, settings))
}
