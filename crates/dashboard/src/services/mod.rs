//! Record services.
//!
//! # Services
//!
//! - `inventory` - items: create, edit, delete, list, brands
//! - `sales` - sales: fee defaults, net profit, inventory linking
//! - `shipments` - parcels: dispatch deadlines, sale sync on dispatch
//! - `returns` - return cases: sale linking by order id
//! - `tasks` - to-do items
//! - `settings` - typed settings with a cache, validated updates
//! - `dashboard` - headline numbers and recent activity
//! - `export` - CSV downloads
//!
//! Every service borrows a [`ServiceContext`]: the store, the current typed
//! settings and today's date.

pub mod dashboard;
pub mod error;
pub mod export;
pub mod inventory;
pub mod returns;
pub mod sales;
pub mod settings;
pub mod shipments;
pub mod tasks;

use chrono::NaiveDate;
use tracing::warn;

use flipledger_core::lifecycle::check_transition;
use flipledger_core::{Lifecycle, Transition, ValidationError};

use crate::db::Store;
use crate::models::AppSettings;

pub use dashboard::{DashboardOverview, DashboardService};
pub use error::ServiceError;
pub use export::{ExportError, ExportService};
pub use inventory::InventoryService;
pub use returns::ReturnService;
pub use sales::SaleService;
pub use settings::{SettingsCache, SettingsService};
pub use shipments::ShipmentService;
pub use tasks::TaskService;

/// What every service operation needs.
#[derive(Clone, Copy)]
pub struct ServiceContext<'a> {
    pub store: &'a dyn Store,
    pub settings: &'a AppSettings,
    pub today: NaiveDate,
}

impl<'a> ServiceContext<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store, settings: &'a AppSettings, today: NaiveDate) -> Self {
        Self {
            store,
            settings,
            today,
        }
    }

    #[must_use]
    pub const fn inventory(self) -> InventoryService<'a> {
        InventoryService::new(self)
    }

    #[must_use]
    pub const fn sales(self) -> SaleService<'a> {
        SaleService::new(self)
    }

    #[must_use]
    pub const fn shipments(self) -> ShipmentService<'a> {
        ShipmentService::new(self)
    }

    #[must_use]
    pub const fn returns(self) -> ReturnService<'a> {
        ReturnService::new(self)
    }

    #[must_use]
    pub const fn tasks(self) -> TaskService<'a> {
        TaskService::new(self)
    }

    #[must_use]
    pub const fn dashboard(self) -> DashboardService<'a> {
        DashboardService::new(self)
    }

    #[must_use]
    pub const fn export(self) -> ExportService<'a> {
        ExportService::new(self)
    }

    /// Check a status change under the configured policy, logging tolerated
    /// off-graph moves.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] on `field` when the policy is strict and
    /// the move is not an edge of the graph.
    pub fn check_status<S: Lifecycle>(
        &self,
        field: &str,
        from: S,
        to: S,
    ) -> Result<Transition, ValidationError> {
        let transition = check_transition(self.settings.transition_policy, field, from, to)?;
        if transition == Transition::Tolerated {
            warn!(
                entity = S::ENTITY,
                from = %from,
                to = %to,
                "Accepted status change outside the lifecycle"
            );
        }
        Ok(transition)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_support {
    use chrono::NaiveDate;

    use flipledger_core::TransitionPolicy;

    use crate::db::MemoryStore;
    use crate::models::AppSettings;

    /// 2024-06-15.
    pub fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    pub fn strict() -> AppSettings {
        AppSettings {
            transition_policy: TransitionPolicy::Strict,
            ..AppSettings::default()
        }
    }

    pub fn store() -> MemoryStore {
        MemoryStore::new()
    }
}
