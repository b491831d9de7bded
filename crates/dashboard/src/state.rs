//! Application state shared across handlers.

use std::sync::Arc;

use chrono::{Local, NaiveDate};

use crate::config::DashboardConfig;
use crate::db::Store;
use crate::models::AppSettings;
use crate::services::{ServiceContext, ServiceError, SettingsCache, SettingsService};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: DashboardConfig,
    store: Arc<dyn Store>,
    settings: SettingsCache,
    /// Pinned date for tests; `None` uses the local clock.
    today: Option<NaiveDate>,
}

impl AppState {
    #[must_use]
    pub fn new(config: DashboardConfig, store: Arc<dyn Store>) -> Self {
        Self::build(config, store, None)
    }

    /// State whose "today" never changes.
    #[must_use]
    pub fn with_fixed_date(config: DashboardConfig, store: Arc<dyn Store>, today: NaiveDate) -> Self {
        Self::build(config, store, Some(today))
    }

    fn build(config: DashboardConfig, store: Arc<dyn Store>, today: Option<NaiveDate>) -> Self {
        let settings = SettingsCache::new(config.settings_ttl);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                settings,
                today,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &DashboardConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    /// Settings operations over the shared cache.
    #[must_use]
    pub fn settings_service(&self) -> SettingsService<'_> {
        SettingsService::new(self.store(), &self.inner.settings)
    }

    /// Typed settings in force for this request.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings cannot be loaded.
    pub async fn settings(&self) -> Result<Arc<AppSettings>, ServiceError> {
        self.settings_service().current().await
    }

    /// Services bound to this store, `settings` and today's date.
    #[must_use]
    pub fn context<'a>(&'a self, settings: &'a AppSettings) -> ServiceContext<'a> {
        ServiceContext::new(self.store(), settings, self.today())
    }

    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.inner
            .today
            .unwrap_or_else(|| Local::now().date_naive())
    }
}
