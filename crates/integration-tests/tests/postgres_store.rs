//! `PostgreSQL` store tests.
//!
//! These tests require:
//! - A running `PostgreSQL` database in `DATABASE_URL`
//! - Migrations applied (`cargo run -p flipledger-cli -- migrate`)
//!
//! Run with: cargo test -p flipledger-integration-tests -- --ignored

use rust_decimal_macros::dec;
use secrecy::SecretString;
use uuid::Uuid;

use flipledger_core::{ListingStatus, Platform};
use flipledger_dashboard::db::{self, PgStore, Store};
use flipledger_dashboard::models::{AppSettings, InventoryInput, SaleInput, ShipmentInput};
use flipledger_dashboard::services::{ServiceContext, ServiceError};
use flipledger_integration_tests::today;

async fn store() -> PgStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = db::create_pool(&SecretString::from(url))
        .await
        .expect("Failed to connect to database");
    PgStore::new(pool)
}

/// A SKU no other run will use.
fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

#[tokio::test]
#[ignore = "Requires a migrated PostgreSQL database"]
async fn test_ping() {
    store().await.ping().await.expect("ping");
}

#[tokio::test]
#[ignore = "Requires a migrated PostgreSQL database"]
async fn test_sku_is_unique_ignoring_case() {
    let store = store().await;
    let settings = AppSettings::default();
    let inventory = ServiceContext::new(&store, &settings, today()).inventory();
    let sku = unique("pg-sku");

    let item = inventory
        .create(InventoryInput {
            sku: sku.clone(),
            item_name: "Scarf".to_string(),
            ..InventoryInput::default()
        })
        .await
        .expect("create");

    let duplicate = inventory
        .create(InventoryInput {
            sku: sku.to_uppercase(),
            item_name: "Scarf again".to_string(),
            ..InventoryInput::default()
        })
        .await;
    assert!(matches!(duplicate, Err(ServiceError::Validation(_))));

    inventory.delete(item.id).await.expect("cleanup");
}

#[tokio::test]
#[ignore = "Requires a migrated PostgreSQL database"]
async fn test_delete_relations() {
    let store = store().await;
    let settings = AppSettings::default();
    let ctx = ServiceContext::new(&store, &settings, today());
    let sku = unique("pg-rel");
    let order_id = unique("pg-order");

    let item = ctx
        .inventory()
        .create(InventoryInput {
            sku: sku.clone(),
            item_name: "Boots".to_string(),
            listing_status: ListingStatus::Listed,
            purchase_price: dec!(10.00),
            ..InventoryInput::default()
        })
        .await
        .expect("create item");

    let sale = ctx
        .sales()
        .record(SaleInput {
            order_id: order_id.clone(),
            platform: Platform::Vinted,
            sale_price: dec!(30.00),
            inventory_sku: Some(sku),
            ..SaleInput::default()
        })
        .await
        .expect("record sale");
    assert_eq!(sale.inventory_id, Some(item.id));

    let shipment = ctx
        .shipments()
        .create(sale.id, ShipmentInput::default())
        .await
        .expect("create shipment");

    // Deleting the item unlinks the sale.
    let report = ctx.inventory().delete(item.id).await.expect("delete item");
    assert_eq!(report.detached, 1);
    let kept = store
        .get_sale_by_order_id(&order_id)
        .await
        .expect("store")
        .expect("sale kept");
    assert_eq!(kept.inventory_id, None);

    // Deleting the sale takes its shipment with it.
    let report = ctx.sales().delete(sale.id).await.expect("delete sale");
    assert_eq!(report.cascaded, 1);
    assert!(store.get_shipment(shipment.id).await.expect("store").is_none());
}
