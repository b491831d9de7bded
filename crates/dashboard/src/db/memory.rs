//! In-process [`Store`] over hash maps.
//!
//! Same semantics as the `PostgreSQL` backend: unique SKU and order id,
//! `NotFound` on updating or deleting a missing row, relations applied on
//! delete under a single write lock.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use flipledger_core::relations::{Relation, dependents_of};
use flipledger_core::{
    DeleteReport, EntityKind, InventoryItemId, RelationKind, ReturnCaseId, SaleId, ShipmentId,
    TaskId,
};

use super::{RepositoryError, Store};
use crate::models::{
    DashboardStats, InventoryCounts, InventoryFilter, InventoryItem, Page, ReturnCase,
    ReturnFilter, Sale, SaleFilter, Setting, Shipment, ShipmentFilter, ShipmentListing, Task,
    TaskFilter,
};

#[derive(Debug, Default)]
struct Tables {
    inventory: HashMap<InventoryItemId, InventoryItem>,
    sales: HashMap<SaleId, Sale>,
    shipments: HashMap<ShipmentId, Shipment>,
    returns: HashMap<ReturnCaseId, ReturnCase>,
    tasks: HashMap<TaskId, Task>,
    settings: BTreeMap<String, Setting>,
}

impl Tables {
    /// Apply every relation pointing at `parent` to the child rows.
    fn release(&mut self, parent: EntityKind, id: Uuid) -> DeleteReport {
        let mut report = DeleteReport::default();
        for relation in dependents_of(parent) {
            let rows = self.sweep(relation, id);
            report.record(relation.kind, rows);
        }
        report
    }

    fn sweep(&mut self, relation: &Relation, parent: Uuid) -> u64 {
        let kind = relation.kind;
        match relation.child {
            EntityKind::Sale => sweep(
                &mut self.sales,
                kind,
                parent,
                |s| s.inventory_id.map(Uuid::from),
                |s| s.inventory_id = None,
            ),
            EntityKind::Task => sweep(
                &mut self.tasks,
                kind,
                parent,
                |t| t.inventory_id.map(Uuid::from),
                |t| t.inventory_id = None,
            ),
            EntityKind::ReturnCase => sweep(
                &mut self.returns,
                kind,
                parent,
                |r| r.sale_id.map(Uuid::from),
                |r| r.sale_id = None,
            ),
            // A shipment cannot exist without its sale.
            EntityKind::Shipment => sweep(
                &mut self.shipments,
                RelationKind::Owning,
                parent,
                |s| Some(s.sale_id.into()),
                |_| {},
            ),
            EntityKind::Inventory | EntityKind::Setting => 0,
        }
    }

    fn sku_taken(&self, sku: &str, except: InventoryItemId) -> bool {
        self.inventory
            .values()
            .any(|item| item.id != except && item.sku.eq_ignore_ascii_case(sku))
    }

    fn order_id_taken(&self, order_id: &str, except: SaleId) -> bool {
        self.sales
            .values()
            .any(|sale| sale.id != except && sale.order_id == order_id)
    }
}

fn sweep<K, V>(
    rows: &mut HashMap<K, V>,
    kind: RelationKind,
    parent: Uuid,
    refers: impl Fn(&V) -> Option<Uuid>,
    clear: impl Fn(&mut V),
) -> u64
where
    K: Eq + Hash,
{
    let before = rows.len();
    let mut touched = 0_u64;
    match kind {
        RelationKind::Owning => rows.retain(|_, row| refers(row) != Some(parent)),
        RelationKind::Weak => {
            for row in rows.values_mut().filter(|row| refers(row) == Some(parent)) {
                clear(row);
                touched += 1;
            }
        }
    }
    touched + (before - rows.len()) as u64
}

fn replace<K, V: Clone>(rows: &mut HashMap<K, V>, key: K, value: &V) -> Result<(), RepositoryError>
where
    K: Eq + Hash,
{
    match rows.get_mut(&key) {
        Some(slot) => {
            *slot = value.clone();
            Ok(())
        }
        None => Err(RepositoryError::NotFound),
    }
}

/// Shared in-memory store. Clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn insert_inventory(&self, item: &InventoryItem) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.sku_taken(&item.sku, item.id) {
            return Err(RepositoryError::Conflict("sku".to_owned()));
        }
        tables.inventory.insert(item.id, item.clone());
        Ok(())
    }

    async fn get_inventory(
        &self,
        id: InventoryItemId,
    ) -> Result<Option<InventoryItem>, RepositoryError> {
        Ok(self.tables.read().await.inventory.get(&id).cloned())
    }

    async fn get_inventory_by_sku(
        &self,
        sku: &str,
    ) -> Result<Option<InventoryItem>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .inventory
            .values()
            .find(|item| item.sku.eq_ignore_ascii_case(sku))
            .cloned())
    }

    async fn update_inventory(&self, item: &InventoryItem) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.sku_taken(&item.sku, item.id) {
            return Err(RepositoryError::Conflict("sku".to_owned()));
        }
        replace(&mut tables.inventory, item.id, item)
    }

    async fn delete_inventory(&self, id: InventoryItemId) -> Result<DeleteReport, RepositoryError> {
        let mut tables = self.tables.write().await;
        tables
            .inventory
            .remove(&id)
            .ok_or(RepositoryError::NotFound)?;
        Ok(tables.release(EntityKind::Inventory, id.into()))
    }

    async fn list_inventory(
        &self,
        filter: &InventoryFilter,
        page: Page,
    ) -> Result<Vec<InventoryItem>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<InventoryItem> = tables
            .inventory
            .values()
            .filter(|item| filter.matches(item))
            .cloned()
            .collect();
        rows.sort_by_key(|item| Reverse((item.created_at, item.id)));
        Ok(page.slice(rows))
    }

    async fn inventory_brands(&self) -> Result<Vec<String>, RepositoryError> {
        let tables = self.tables.read().await;
        let brands: BTreeSet<String> = tables
            .inventory
            .values()
            .filter_map(|item| item.brand.clone())
            .collect();
        Ok(brands.into_iter().collect())
    }

    async fn insert_sale(&self, sale: &Sale) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.order_id_taken(&sale.order_id, sale.id) {
            return Err(RepositoryError::Conflict("order_id".to_owned()));
        }
        tables.sales.insert(sale.id, sale.clone());
        Ok(())
    }

    async fn get_sale(&self, id: SaleId) -> Result<Option<Sale>, RepositoryError> {
        Ok(self.tables.read().await.sales.get(&id).cloned())
    }

    async fn get_sale_by_order_id(&self, order_id: &str) -> Result<Option<Sale>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .sales
            .values()
            .find(|sale| sale.order_id == order_id)
            .cloned())
    }

    async fn update_sale(&self, sale: &Sale) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.order_id_taken(&sale.order_id, sale.id) {
            return Err(RepositoryError::Conflict("order_id".to_owned()));
        }
        replace(&mut tables.sales, sale.id, sale)
    }

    async fn delete_sale(&self, id: SaleId) -> Result<DeleteReport, RepositoryError> {
        let mut tables = self.tables.write().await;
        tables.sales.remove(&id).ok_or(RepositoryError::NotFound)?;
        Ok(tables.release(EntityKind::Sale, id.into()))
    }

    async fn list_sales(&self, filter: &SaleFilter, page: Page) -> Result<Vec<Sale>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Sale> = tables
            .sales
            .values()
            .filter(|sale| filter.matches(sale))
            .cloned()
            .collect();
        rows.sort_by_key(|sale| Reverse((sale.date_sold, sale.created_at, sale.id)));
        Ok(page.slice(rows))
    }

    async fn insert_shipment(&self, shipment: &Shipment) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        if !tables.sales.contains_key(&shipment.sale_id) {
            return Err(RepositoryError::NotFound);
        }
        tables.shipments.insert(shipment.id, shipment.clone());
        Ok(())
    }

    async fn get_shipment(&self, id: ShipmentId) -> Result<Option<Shipment>, RepositoryError> {
        Ok(self.tables.read().await.shipments.get(&id).cloned())
    }

    async fn update_shipment(&self, shipment: &Shipment) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        replace(&mut tables.shipments, shipment.id, shipment)
    }

    async fn delete_shipment(&self, id: ShipmentId) -> Result<DeleteReport, RepositoryError> {
        let mut tables = self.tables.write().await;
        tables
            .shipments
            .remove(&id)
            .ok_or(RepositoryError::NotFound)?;
        Ok(tables.release(EntityKind::Shipment, id.into()))
    }

    async fn list_shipments(
        &self,
        filter: &ShipmentFilter,
        page: Page,
    ) -> Result<Vec<ShipmentListing>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<ShipmentListing> = tables
            .shipments
            .values()
            .filter(|shipment| filter.matches(shipment))
            .filter_map(|shipment| {
                let sale = tables.sales.get(&shipment.sale_id)?;
                Some(ShipmentListing {
                    shipment: shipment.clone(),
                    order_id: sale.order_id.clone(),
                    item_name: sale.item_name.clone(),
                    buyer_name: sale.buyer_name.clone(),
                })
            })
            .collect();
        if filter.awaiting_dispatch {
            rows.sort_by_key(|row| {
                let deadline = row.shipment.dispatch_deadline;
                (deadline.is_none(), deadline, row.shipment.created_at)
            });
        } else {
            rows.sort_by_key(|row| Reverse((row.shipment.created_at, row.shipment.id)));
        }
        Ok(page.slice(rows))
    }

    async fn insert_return(&self, case: &ReturnCase) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        tables.returns.insert(case.id, case.clone());
        Ok(())
    }

    async fn get_return(&self, id: ReturnCaseId) -> Result<Option<ReturnCase>, RepositoryError> {
        Ok(self.tables.read().await.returns.get(&id).cloned())
    }

    async fn update_return(&self, case: &ReturnCase) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        replace(&mut tables.returns, case.id, case)
    }

    async fn delete_return(&self, id: ReturnCaseId) -> Result<DeleteReport, RepositoryError> {
        let mut tables = self.tables.write().await;
        tables.returns.remove(&id).ok_or(RepositoryError::NotFound)?;
        Ok(tables.release(EntityKind::ReturnCase, id.into()))
    }

    async fn list_returns(
        &self,
        filter: &ReturnFilter,
        page: Page,
    ) -> Result<Vec<ReturnCase>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<ReturnCase> = tables
            .returns
            .values()
            .filter(|case| filter.matches(case))
            .cloned()
            .collect();
        rows.sort_by_key(|case| Reverse((case.date_opened, case.created_at, case.id)));
        Ok(page.slice(rows))
    }

    async fn insert_task(&self, task: &Task) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        tables.tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn get_task(&self, id: TaskId) -> Result<Option<Task>, RepositoryError> {
        Ok(self.tables.read().await.tasks.get(&id).cloned())
    }

    async fn update_task(&self, task: &Task) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        replace(&mut tables.tasks, task.id, task)
    }

    async fn delete_task(&self, id: TaskId) -> Result<DeleteReport, RepositoryError> {
        let mut tables = self.tables.write().await;
        tables.tasks.remove(&id).ok_or(RepositoryError::NotFound)?;
        Ok(tables.release(EntityKind::Task, id.into()))
    }

    async fn list_tasks(&self, filter: &TaskFilter, page: Page) -> Result<Vec<Task>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Task> = tables
            .tasks
            .values()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect();
        let ordering = filter.ordering();
        rows.sort_by(|a, b| ordering(a, b).then_with(|| a.created_at.cmp(&b.created_at)));
        Ok(page.slice(rows))
    }

    async fn list_settings(&self) -> Result<Vec<Setting>, RepositoryError> {
        Ok(self.tables.read().await.settings.values().cloned().collect())
    }

    async fn upsert_setting(&self, key: &str, value: &str) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        tables.settings.insert(
            key.to_owned(),
            Setting {
                key: key.to_owned(),
                value: value.to_owned(),
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn dashboard_stats(&self, since: NaiveDate) -> Result<DashboardStats, RepositoryError> {
        let tables = self.tables.read().await;

        let mut inventory = InventoryCounts::default();
        for item in tables.inventory.values() {
            inventory.add(item.listing_status, 1);
        }

        let recent: Vec<&Sale> = tables
            .sales
            .values()
            .filter(|sale| sale.date_sold >= since)
            .collect();

        Ok(DashboardStats {
            inventory,
            recent_sales: recent.len() as u64,
            recent_net_profit: recent.iter().map(|sale| sale.net_profit).sum::<Decimal>(),
            sales_by_platform: DashboardStats::platform_counts(
                tables.sales.values().map(|sale| (sale.platform, 1)),
            ),
            pending_shipments: tables
                .shipments
                .values()
                .filter(|s| s.status.is_awaiting_dispatch())
                .count() as u64,
            open_returns: tables
                .returns
                .values()
                .filter(|r| r.status.is_open())
                .count() as u64,
            pending_tasks: tables
                .tasks
                .values()
                .filter(|t| t.status.is_pending())
                .count() as u64,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use flipledger_core::{ListingStatus, Platform, ShipmentStatus, TaskStatus};

    use super::*;
    use crate::models::{InventoryInput, TaskInput};

    fn item(sku: &str, brand: &str, status: ListingStatus) -> InventoryItem {
        InventoryItem::from_input(
            InventoryInput {
                sku: sku.to_owned(),
                item_name: format!("{brand} item"),
                brand: Some(brand.to_owned()),
                listing_status: status,
                ..InventoryInput::default()
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn sale(order_id: &str, inventory_id: Option<InventoryItemId>, net: Decimal) -> Sale {
        Sale {
            id: SaleId::generate(),
            order_id: order_id.to_owned(),
            inventory_id,
            platform: Platform::Vinted,
            item_name: None,
            sale_price: net,
            platform_fees: Decimal::ZERO,
            payment_processing_fees: Decimal::ZERO,
            shipping_cost: Decimal::ZERO,
            buyer_paid_shipping: true,
            net_profit: net,
            date_sold: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            shipped_date: None,
            tracking_number: None,
            payout_status: flipledger_core::PayoutStatus::Pending,
            buyer_name: Some("Sam".to_owned()),
            buyer_username: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn shipment(sale_id: SaleId) -> Shipment {
        Shipment {
            id: ShipmentId::generate(),
            sale_id,
            carrier: None,
            tracking_number: None,
            label_cost: Decimal::ZERO,
            dispatch_deadline: None,
            status: ShipmentStatus::PendingLabel,
            shipped_date: None,
            delivered_date: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_sku_conflicts() {
        let store = MemoryStore::new();
        store.insert_inventory(&item("SKU1", "Nike", ListingStatus::Draft)).await.unwrap();
        let err = store
            .insert_inventory(&item("sku1", "Adidas", ListingStatus::Draft))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(field) if field == "sku"));
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_inventory(&item("SKU1", "Nike", ListingStatus::Draft))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_deleting_item_detaches_sales_and_tasks() {
        let store = MemoryStore::new();
        let hoodie = item("SKU1", "Nike", ListingStatus::Sold);
        store.insert_inventory(&hoodie).await.unwrap();
        let linked = sale("V-1", Some(hoodie.id), dec!(5));
        store.insert_sale(&linked).await.unwrap();

        let mut task = Task {
            id: TaskId::generate(),
            title: String::new(),
            description: None,
            category: flipledger_core::TaskCategory::Packing,
            priority: flipledger_core::TaskPriority::High,
            status: TaskStatus::Todo,
            due_date: None,
            completed_date: None,
            inventory_id: Some(hoodie.id),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        task.apply(TaskInput {
            title: "Pack hoodie".to_owned(),
            ..TaskInput::default()
        });
        store.insert_task(&task).await.unwrap();

        let report = store.delete_inventory(hoodie.id).await.unwrap();
        assert_eq!(report.detached, 2);
        assert_eq!(report.cascaded, 0);

        let kept = store.get_sale(linked.id).await.unwrap().unwrap();
        assert_eq!(kept.inventory_id, None);
        let kept = store.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(kept.inventory_id, None);
    }

    #[tokio::test]
    async fn test_deleting_sale_cascades_shipments() {
        let store = MemoryStore::new();
        let s = sale("V-2", None, dec!(5));
        store.insert_sale(&s).await.unwrap();
        let parcel = shipment(s.id);
        store.insert_shipment(&parcel).await.unwrap();

        let report = store.delete_sale(s.id).await.unwrap();
        assert_eq!(report.cascaded, 1);
        assert!(store.get_shipment(parcel.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_shipment_requires_sale() {
        let store = MemoryStore::new();
        let err = store
            .insert_shipment(&shipment(SaleId::generate()))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_list_shipments_joins_sale() {
        let store = MemoryStore::new();
        let s = sale("V-3", None, dec!(5));
        store.insert_sale(&s).await.unwrap();
        store.insert_shipment(&shipment(s.id)).await.unwrap();

        let rows = store
            .list_shipments(&ShipmentFilter::default(), Page::default())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].order_id, "V-3");
        assert_eq!(rows[0].buyer_name.as_deref(), Some("Sam"));
    }

    #[tokio::test]
    async fn test_brands_are_distinct_and_sorted() {
        let store = MemoryStore::new();
        for (sku, brand) in [("A", "Nike"), ("B", "Adidas"), ("C", "Nike")] {
            store.insert_inventory(&item(sku, brand, ListingStatus::Draft)).await.unwrap();
        }
        assert_eq!(store.inventory_brands().await.unwrap(), vec!["Adidas", "Nike"]);
    }

    #[tokio::test]
    async fn test_dashboard_stats_window() {
        let store = MemoryStore::new();
        store.insert_inventory(&item("A", "Nike", ListingStatus::Listed)).await.unwrap();
        store.insert_inventory(&item("B", "Nike", ListingStatus::Sold)).await.unwrap();

        let mut old = sale("OLD", None, dec!(100));
        old.date_sold = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        store.insert_sale(&old).await.unwrap();
        store.insert_sale(&sale("N1", None, dec!(10.10))).await.unwrap();
        store.insert_sale(&sale("N2", None, dec!(2.20))).await.unwrap();

        let since = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
        let stats = store.dashboard_stats(since).await.unwrap();
        assert_eq!(stats.inventory.total, 2);
        assert_eq!(stats.inventory.active_listings(), 1);
        assert_eq!(stats.recent_sales, 2);
        assert_eq!(stats.recent_net_profit, dec!(12.30));
        let vinted = stats
            .sales_by_platform
            .iter()
            .find(|c| c.platform == Platform::Vinted)
            .unwrap();
        assert_eq!(vinted.sales, 3);
    }

    #[tokio::test]
    async fn test_upsert_setting_replaces_value() {
        let store = MemoryStore::new();
        store.upsert_setting("currency", "GBP").await.unwrap();
        store.upsert_setting("currency", "EUR").await.unwrap();
        let settings = store.list_settings().await.unwrap();
        assert_eq!(settings.len(), 1);
        assert_eq!(settings[0].value, "EUR");
    }
}
