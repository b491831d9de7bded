//! `PostgreSQL` [`Store`].
//!
//! Queries are checked at runtime (`query_as::<_, Row>`) so the crate builds
//! without a database. Enumerations are stored as their labels in TEXT
//! columns and parsed back through `FromStr`; a label the code does not know
//! surfaces as [`RepositoryError::DataCorruption`].

mod inventory;
mod returns;
mod sales;
mod settings;
mod shipments;
mod stats;
mod tasks;

use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use flipledger_core::relations::dependents_of;
use flipledger_core::{
    DeleteReport, EntityKind, InventoryItemId, RelationKind, ReturnCaseId, SaleId, ShipmentId,
    TaskId,
};

use super::{RepositoryError, Store};
use crate::models::{
    DashboardStats, InventoryFilter, InventoryItem, Page, ReturnCase, ReturnFilter, Sale,
    SaleFilter, Setting, Shipment, ShipmentFilter, ShipmentListing, Task, TaskFilter,
};

/// Store backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Parse a stored enumeration label.
fn parse_column<T>(column: &str, raw: &str) -> Result<T, RepositoryError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid {column} in database: {e}")))
}

/// Map a unique-constraint violation to a conflict on `field`.
fn unique_conflict(error: sqlx::Error, field: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = error
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(field.to_owned());
    }
    RepositoryError::Database(error)
}

/// `LIMIT`/`OFFSET` bind values.
fn page_bounds(page: Page) -> (i64, i64) {
    (i64::from(page.limit), i64::from(page.offset))
}

/// Fail with `NotFound` when a statement touched no row.
const fn expect_row(rows_affected: u64) -> Result<(), RepositoryError> {
    if rows_affected == 0 {
        Err(RepositoryError::NotFound)
    } else {
        Ok(())
    }
}

/// Delete a parent row after applying every relation that points at it,
/// all in one transaction.
#[instrument(skip(pool), fields(table = parent.table()))]
async fn delete_with_relations(
    pool: &PgPool,
    parent: EntityKind,
    id: Uuid,
) -> Result<DeleteReport, RepositoryError> {
    let mut tx = pool.begin().await?;
    let mut report = DeleteReport::default();

    for relation in dependents_of(parent) {
        let table = relation.child.table();
        let column = relation.column;
        let sql = match relation.kind {
            RelationKind::Weak => {
                format!("UPDATE {table} SET {column} = NULL, updated_at = NOW() WHERE {column} = $1")
            }
            RelationKind::Owning => format!("DELETE FROM {table} WHERE {column} = $1"),
        };
        let rows = sqlx::query(&sql)
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        report.record(relation.kind, rows);
    }

    let sql = format!("DELETE FROM {} WHERE id = $1", parent.table());
    let deleted = sqlx::query(&sql).bind(id).execute(&mut *tx).await?;
    expect_row(deleted.rows_affected())?;

    tx.commit().await?;
    debug!(
        detached = report.detached,
        cascaded = report.cascaded,
        "Deleted row"
    );
    Ok(report)
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_inventory(&self, item: &InventoryItem) -> Result<(), RepositoryError> {
        inventory::insert(&self.pool, item).await
    }

    async fn get_inventory(
        &self,
        id: InventoryItemId,
    ) -> Result<Option<InventoryItem>, RepositoryError> {
        inventory::get(&self.pool, id).await
    }

    async fn get_inventory_by_sku(
        &self,
        sku: &str,
    ) -> Result<Option<InventoryItem>, RepositoryError> {
        inventory::get_by_sku(&self.pool, sku).await
    }

    async fn update_inventory(&self, item: &InventoryItem) -> Result<(), RepositoryError> {
        inventory::update(&self.pool, item).await
    }

    async fn delete_inventory(&self, id: InventoryItemId) -> Result<DeleteReport, RepositoryError> {
        delete_with_relations(&self.pool, EntityKind::Inventory, id.into()).await
    }

    async fn list_inventory(
        &self,
        filter: &InventoryFilter,
        page: Page,
    ) -> Result<Vec<InventoryItem>, RepositoryError> {
        inventory::list(&self.pool, filter, page).await
    }

    async fn inventory_brands(&self) -> Result<Vec<String>, RepositoryError> {
        inventory::brands(&self.pool).await
    }

    async fn insert_sale(&self, sale: &Sale) -> Result<(), RepositoryError> {
        sales::insert(&self.pool, sale).await
    }

    async fn get_sale(&self, id: SaleId) -> Result<Option<Sale>, RepositoryError> {
        sales::get(&self.pool, id).await
    }

    async fn get_sale_by_order_id(&self, order_id: &str) -> Result<Option<Sale>, RepositoryError> {
        sales::get_by_order_id(&self.pool, order_id).await
    }

    async fn update_sale(&self, sale: &Sale) -> Result<(), RepositoryError> {
        sales::update(&self.pool, sale).await
    }

    async fn delete_sale(&self, id: SaleId) -> Result<DeleteReport, RepositoryError> {
        delete_with_relations(&self.pool, EntityKind::Sale, id.into()).await
    }

    async fn list_sales(&self, filter: &SaleFilter, page: Page) -> Result<Vec<Sale>, RepositoryError> {
        sales::list(&self.pool, filter, page).await
    }

    async fn insert_shipment(&self, shipment: &Shipment) -> Result<(), RepositoryError> {
        shipments::insert(&self.pool, shipment).await
    }

    async fn get_shipment(&self, id: ShipmentId) -> Result<Option<Shipment>, RepositoryError> {
        shipments::get(&self.pool, id).await
    }

    async fn update_shipment(&self, shipment: &Shipment) -> Result<(), RepositoryError> {
        shipments::update(&self.pool, shipment).await
    }

    async fn delete_shipment(&self, id: ShipmentId) -> Result<DeleteReport, RepositoryError> {
        delete_with_relations(&self.pool, EntityKind::Shipment, id.into()).await
    }

    async fn list_shipments(
        &self,
        filter: &ShipmentFilter,
        page: Page,
    ) -> Result<Vec<ShipmentListing>, RepositoryError> {
        shipments::list(&self.pool, filter, page).await
    }

    async fn insert_return(&self, case: &ReturnCase) -> Result<(), RepositoryError> {
        returns::insert(&self.pool, case).await
    }

    async fn get_return(&self, id: ReturnCaseId) -> Result<Option<ReturnCase>, RepositoryError> {
        returns::get(&self.pool, id).await
    }

    async fn update_return(&self, case: &ReturnCase) -> Result<(), RepositoryError> {
        returns::update(&self.pool, case).await
    }

    async fn delete_return(&self, id: ReturnCaseId) -> Result<DeleteReport, RepositoryError> {
        delete_with_relations(&self.pool, EntityKind::ReturnCase, id.into()).await
    }

    async fn list_returns(
        &self,
        filter: &ReturnFilter,
        page: Page,
    ) -> Result<Vec<ReturnCase>, RepositoryError> {
        returns::list(&self.pool, filter, page).await
    }

    async fn insert_task(&self, task: &Task) -> Result<(), RepositoryError> {
        tasks::insert(&self.pool, task).await
    }

    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, RepositoryError> {
        tasks::get(&self.pool, id).await
    }

    async fn update_task(&self, task: &Task) -> Result<(), RepositoryError> {
        tasks::update(&self.pool, task).await
    }

    async fn delete_task(&self, id: TaskId) -> Result<DeleteReport, RepositoryError> {
        delete_with_relations(&self.pool, EntityKind::Task, id.into()).await
    }

    async fn list_tasks(&self, filter: &TaskFilter, page: Page) -> Result<Vec<Task>, RepositoryError> {
        tasks::list(&self.pool, filter, page).await
    }

    async fn list_settings(&self) -> Result<Vec<Setting>, RepositoryError> {
        settings::list(&self.pool).await
    }

    async fn upsert_setting(&self, key: &str, value: &str) -> Result<(), RepositoryError> {
        settings::upsert(&self.pool, key, value).await
    }

    async fn dashboard_stats(&self, since: NaiveDate) -> Result<DashboardStats, RepositoryError> {
        stats::dashboard(&self.pool, since).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flipledger_core::ListingStatus;

    #[test]
    fn test_parse_column_reports_corruption() {
        let err = parse_column::<ListingStatus>("listing_status", "Lost").unwrap_err();
        assert!(matches!(err, RepositoryError::DataCorruption(msg) if msg.contains("listing_status")));
    }

    #[test]
    fn test_page_bounds() {
        assert_eq!(page_bounds(Page::new(Some(5000), Some(10))), (1000, 10));
    }

    #[test]
    fn test_expect_row() {
        assert!(matches!(expect_row(0), Err(RepositoryError::NotFound)));
        assert!(expect_row(1).is_ok());
    }
}
