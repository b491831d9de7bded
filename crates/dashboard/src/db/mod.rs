//! Persistence for FlipLedger records.
//!
//! # Tables
//!
//! - `inventory` - items bought for resale
//! - `sales` - completed sales, optionally linked to an inventory item
//! - `shipments` - parcels, owned by a sale
//! - `returns` - return requests and disputes, optionally linked to a sale
//! - `tasks` - to-do items, optionally linked to an inventory item
//! - `settings` - key/value configuration
//!
//! Every backend implements [`Store`]. [`PgStore`] is the production
//! backend; [`MemoryStore`] keeps everything in process and backs the test
//! suites and `--in-memory` runs.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/dashboard/migrations/` and run via:
//! ```bash
//! cargo run -p flipledger-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use flipledger_core::{DeleteReport, InventoryItemId, ReturnCaseId, SaleId, ShipmentId, TaskId};

use crate::models::{
    DashboardStats, InventoryFilter, InventoryItem, Page, ReturnCase, ReturnFilter, Sale,
    SaleFilter, Setting, Shipment, ShipmentFilter, ShipmentListing, Task, TaskFilter,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Unique constraint violation; carries the offending field name.
    #[error("{0} already exists")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Record storage.
///
/// `update_*` and `delete_*` return [`RepositoryError::NotFound`] when the
/// row does not exist. Deletes apply the declared relations to dependent
/// rows atomically and report what they touched.
#[async_trait]
pub trait Store: Send + Sync {
    /// Check the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    // Inventory

    async fn insert_inventory(&self, item: &InventoryItem) -> Result<(), RepositoryError>;
    async fn get_inventory(&self, id: InventoryItemId)
    -> Result<Option<InventoryItem>, RepositoryError>;
    async fn get_inventory_by_sku(&self, sku: &str)
    -> Result<Option<InventoryItem>, RepositoryError>;
    async fn update_inventory(&self, item: &InventoryItem) -> Result<(), RepositoryError>;
    async fn delete_inventory(&self, id: InventoryItemId) -> Result<DeleteReport, RepositoryError>;
    /// Newest first.
    async fn list_inventory(
        &self,
        filter: &InventoryFilter,
        page: Page,
    ) -> Result<Vec<InventoryItem>, RepositoryError>;
    /// Distinct non-empty brands, sorted.
    async fn inventory_brands(&self) -> Result<Vec<String>, RepositoryError>;

    // Sales

    async fn insert_sale(&self, sale: &Sale) -> Result<(), RepositoryError>;
    async fn get_sale(&self, id: SaleId) -> Result<Option<Sale>, RepositoryError>;
    async fn get_sale_by_order_id(&self, order_id: &str) -> Result<Option<Sale>, RepositoryError>;
    async fn update_sale(&self, sale: &Sale) -> Result<(), RepositoryError>;
    async fn delete_sale(&self, id: SaleId) -> Result<DeleteReport, RepositoryError>;
    /// Newest sale date first.
    async fn list_sales(&self, filter: &SaleFilter, page: Page)
    -> Result<Vec<Sale>, RepositoryError>;

    // Shipments

    async fn insert_shipment(&self, shipment: &Shipment) -> Result<(), RepositoryError>;
    async fn get_shipment(&self, id: ShipmentId) -> Result<Option<Shipment>, RepositoryError>;
    async fn update_shipment(&self, shipment: &Shipment) -> Result<(), RepositoryError>;
    async fn delete_shipment(&self, id: ShipmentId) -> Result<DeleteReport, RepositoryError>;
    /// Newest first; by deadline when only awaiting dispatch.
    async fn list_shipments(
        &self,
        filter: &ShipmentFilter,
        page: Page,
    ) -> Result<Vec<ShipmentListing>, RepositoryError>;

    // Returns

    async fn insert_return(&self, case: &ReturnCase) -> Result<(), RepositoryError>;
    async fn get_return(&self, id: ReturnCaseId) -> Result<Option<ReturnCase>, RepositoryError>;
    async fn update_return(&self, case: &ReturnCase) -> Result<(), RepositoryError>;
    async fn delete_return(&self, id: ReturnCaseId) -> Result<DeleteReport, RepositoryError>;
    /// Newest opened first.
    async fn list_returns(
        &self,
        filter: &ReturnFilter,
        page: Page,
    ) -> Result<Vec<ReturnCase>, RepositoryError>;

    // Tasks

    async fn insert_task(&self, task: &Task) -> Result<(), RepositoryError>;
    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, RepositoryError>;
    async fn update_task(&self, task: &Task) -> Result<(), RepositoryError>;
    async fn delete_task(&self, id: TaskId) -> Result<DeleteReport, RepositoryError>;
    /// Ordered by [`TaskFilter::ordering`].
    async fn list_tasks(&self, filter: &TaskFilter, page: Page)
    -> Result<Vec<Task>, RepositoryError>;

    // Settings

    async fn list_settings(&self) -> Result<Vec<Setting>, RepositoryError>;
    /// Insert or replace, refreshing `updated_at`.
    async fn upsert_setting(&self, key: &str, value: &str) -> Result<(), RepositoryError>;

    // Aggregates

    /// Dashboard numbers, with the sales window starting at `since` (inclusive).
    async fn dashboard_stats(&self, since: NaiveDate) -> Result<DashboardStats, RepositoryError>;
}
