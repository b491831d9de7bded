//! Settings service.
//!
//! Every request needs the typed settings, so they are cached with `moka`
//! and dropped from the cache whenever an update is written.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, info, instrument};

use super::ServiceError;
use crate::db::Store;
use crate::models::{AppSettings, Setting, SettingsUpdate};

const CACHE_KEY: &str = "settings";

/// Cached typed settings.
#[derive(Clone)]
pub struct SettingsCache {
    cache: Cache<&'static str, Arc<AppSettings>>,
}

impl SettingsCache {
    /// Cache entries expire after `ttl` even without updates, so rows changed
    /// by the CLI are picked up.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(1).time_to_live(ttl).build();
        Self { cache }
    }

    async fn invalidate(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

/// Settings operations.
pub struct SettingsService<'a> {
    store: &'a dyn Store,
    cache: &'a SettingsCache,
}

impl<'a> SettingsService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store, cache: &'a SettingsCache) -> Self {
        Self { store, cache }
    }

    /// Typed settings, from the cache when possible.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings rows cannot be loaded.
    pub async fn current(&self) -> Result<Arc<AppSettings>, ServiceError> {
        if let Some(settings) = self.cache.cache.get(CACHE_KEY).await {
            return Ok(settings);
        }

        let rows = self.store.list_settings().await?;
        let settings = Arc::new(AppSettings::from_rows(&rows));
        self.cache.cache.insert(CACHE_KEY, Arc::clone(&settings)).await;
        debug!(rows = rows.len(), "Loaded settings");
        Ok(settings)
    }

    /// Stored rows, by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn rows(&self) -> Result<Vec<Setting>, ServiceError> {
        Ok(self.store.list_settings().await?)
    }

    /// Write validated changes and return the settings now in force.
    ///
    /// # Errors
    ///
    /// Returns an error if a write fails. Changes written before the failure
    /// are kept.
    #[instrument(skip(self, update), fields(changes = update.changes.len()))]
    pub async fn update(&self, update: &SettingsUpdate) -> Result<Arc<AppSettings>, ServiceError> {
        for (key, value) in &update.changes {
            if let Err(error) = self.store.upsert_setting(key, value).await {
                self.cache.invalidate().await;
                return Err(error.into());
            }
            info!(key = %key, value = %value, "Updated setting");
        }
        self.cache.invalidate().await;
        self.current().await
    }
}
