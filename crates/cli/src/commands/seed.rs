//! Seed the database from a YAML file.
//!
//! # Usage
//!
//! ```bash
//! fl-cli seed crates/cli/seed/demo.yaml
//! ```
//!
//! The file has one list per record kind. Each record uses the same field
//! names as the dashboard forms, so the same validation applies:
//!
//! ```yaml
//! inventory:
//!   - sku: BOOT-001
//!     item_name: Leather boots
//!     purchase_price: 12.50
//!     platforms: [Vinted, eBay]
//! sales:
//!   - order_id: V-1001
//!     platform: Vinted
//!     sale_price: 45
//!     date_sold: 2024-06-01
//!     inventory_sku: BOOT-001
//! shipments:
//!   - order_id: V-1001
//!     carrier: Royal Mail
//! ```
//!
//! Shipments name their sale by `order_id`. Records are created in file
//! order, inventory first, and the command stops at the first rejected one.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Local;
use serde::Deserialize;
use serde_yaml::Value;
use thiserror::Error;

use flipledger_core::SaleId;
use flipledger_dashboard::models::{
    FormFields, InventoryInput, InventoryItem, ReturnCase, ReturnInput, Sale, SaleInput, Shipment,
    ShipmentInput, Task, TaskInput,
};
use flipledger_dashboard::services::{ServiceContext, ServiceError};

use super::CommandError;

/// One record as written in the file.
type RawRecord = BTreeMap<String, Value>;

/// Seed file layout.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeedFile {
    pub inventory: Vec<RawRecord>,
    pub sales: Vec<RawRecord>,
    pub shipments: Vec<RawRecord>,
    pub returns: Vec<RawRecord>,
    pub tasks: Vec<RawRecord>,
}

/// Errors while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid seed file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error("{kind} #{index}: {source}")]
    Record {
        kind: &'static str,
        index: usize,
        source: ServiceError,
    },

    #[error("{kind} #{index}: field {field} must be a plain value")]
    Shape {
        kind: &'static str,
        index: usize,
        field: String,
    },

    #[error("shipments #{index}: no sale with order id {order_id:?}")]
    UnknownSale { index: usize, order_id: String },
}

/// Counts of created records.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub inventory: usize,
    pub sales: usize,
    pub shipments: usize,
    pub returns: usize,
    pub tasks: usize,
}

/// Load `path` and create every record in it.
pub async fn run(path: &Path) -> Result<(), SeedError> {
    let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let file: SeedFile = serde_yaml::from_str(&raw)?;

    let (store, _cache, settings) = super::open_store().await?;
    let ctx = ServiceContext::new(store.as_ref(), &settings, Local::now().date_naive());

    tracing::info!("Seeding from {}...", path.display());
    let report = seed(ctx, &file).await?;

    tracing::info!(
        inventory = report.inventory,
        sales = report.sales,
        shipments = report.shipments,
        returns = report.returns,
        tasks = report.tasks,
        "Seed complete!"
    );
    Ok(())
}

/// Create every record in `file`, in dependency order.
pub async fn seed(ctx: ServiceContext<'_>, file: &SeedFile) -> Result<SeedReport, SeedError> {
    let mut report = SeedReport::default();

    for (index, record) in file.inventory.iter().enumerate() {
        let fields = to_fields("inventory", index, record)?;
        let item = create_inventory(ctx, &fields)
            .await
            .map_err(|source| SeedError::Record {
                kind: "inventory",
                index,
                source,
            })?;
        tracing::debug!(sku = %item.sku, "Seeded inventory item");
        report.inventory += 1;
    }

    for (index, record) in file.sales.iter().enumerate() {
        let fields = to_fields("sales", index, record)?;
        let sale = record_sale(ctx, &fields)
            .await
            .map_err(|source| SeedError::Record {
                kind: "sales",
                index,
                source,
            })?;
        tracing::debug!(order_id = %sale.order_id, "Seeded sale");
        report.sales += 1;
    }

    for (index, record) in file.shipments.iter().enumerate() {
        let fields = to_fields("shipments", index, record)?;
        let order_id = fields.get("order_id").unwrap_or_default().trim().to_string();
        let sale = ctx
            .store
            .get_sale_by_order_id(&order_id)
            .await
            .map_err(|error| SeedError::Record {
                kind: "shipments",
                index,
                source: error.into(),
            })?
            .ok_or(SeedError::UnknownSale { index, order_id })?;

        create_shipment(ctx, sale.id, &fields)
            .await
            .map_err(|source| SeedError::Record {
                kind: "shipments",
                index,
                source,
            })?;
        report.shipments += 1;
    }

    for (index, record) in file.returns.iter().enumerate() {
        let fields = to_fields("returns", index, record)?;
        open_return(ctx, &fields)
            .await
            .map_err(|source| SeedError::Record {
                kind: "returns",
                index,
                source,
            })?;
        report.returns += 1;
    }

    for (index, record) in file.tasks.iter().enumerate() {
        let fields = to_fields("tasks", index, record)?;
        create_task(ctx, &fields)
            .await
            .map_err(|source| SeedError::Record {
                kind: "tasks",
                index,
                source,
            })?;
        report.tasks += 1;
    }

    Ok(report)
}

async fn create_inventory(
    ctx: ServiceContext<'_>,
    fields: &FormFields,
) -> Result<InventoryItem, ServiceError> {
    ctx.inventory().create(InventoryInput::from_form(fields)?).await
}

async fn record_sale(ctx: ServiceContext<'_>, fields: &FormFields) -> Result<Sale, ServiceError> {
    ctx.sales().record(SaleInput::from_form(fields)?).await
}

async fn create_shipment(
    ctx: ServiceContext<'_>,
    sale_id: SaleId,
    fields: &FormFields,
) -> Result<Shipment, ServiceError> {
    ctx.shipments()
        .create(sale_id, ShipmentInput::from_form(fields)?)
        .await
}

async fn open_return(
    ctx: ServiceContext<'_>,
    fields: &FormFields,
) -> Result<ReturnCase, ServiceError> {
    ctx.returns().open(ReturnInput::from_form(fields)?).await
}

async fn create_task(ctx: ServiceContext<'_>, fields: &FormFields) -> Result<Task, ServiceError> {
    ctx.tasks().create(TaskInput::from_form(fields)?).await
}

/// Flatten one record into form pairs. Lists repeat the field; nulls are
/// dropped.
fn to_fields(kind: &'static str, index: usize, record: &RawRecord) -> Result<FormFields, SeedError> {
    let mut pairs = Vec::with_capacity(record.len());
    for (name, value) in record {
        let shape = || SeedError::Shape {
            kind,
            index,
            field: name.clone(),
        };
        match value {
            Value::Sequence(items) => {
                for item in items {
                    pairs.push((name.clone(), scalar(item).ok_or_else(shape)?));
                }
            }
            Value::Null => {}
            other => pairs.push((name.clone(), scalar(other).ok_or_else(shape)?)),
        }
    }
    Ok(FormFields::new(pairs))
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(yaml: &str) -> RawRecord {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_to_fields_flattens_scalars_and_lists() {
        let fields = to_fields(
            "inventory",
            0,
            &record("sku: BOOT-1\npurchase_price: 12.5\nplatforms: [Vinted, eBay]\nnotes: ~\n"),
        )
        .unwrap();

        assert_eq!(fields.get("sku"), Some("BOOT-1"));
        assert_eq!(fields.get("purchase_price"), Some("12.5"));
        assert_eq!(fields.all("platforms").collect::<Vec<_>>(), ["Vinted", "eBay"]);
        assert!(!fields.has("notes"));
    }

    #[test]
    fn test_to_fields_rejects_nested_maps() {
        let err = to_fields("tasks", 3, &record("title: x\nextra: {a: 1}\n")).unwrap_err();
        assert_eq!(err.to_string(), "tasks #3: field extra must be a plain value");
    }

    #[test]
    fn test_seed_file_sections_default_to_empty() {
        let file: SeedFile = serde_yaml::from_str("tasks:\n  - title: Photograph boots\n").unwrap();
        assert!(file.inventory.is_empty());
        assert_eq!(file.tasks.len(), 1);

        assert!(serde_yaml::from_str::<SeedFile>("orders: []\n").is_err());
    }

    #[test]
    fn test_demo_seed_file_parses() {
        let file: SeedFile = serde_yaml::from_str(include_str!("../../seed/demo.yaml")).unwrap();
        assert!(!file.inventory.is_empty());
        assert!(!file.sales.is_empty());
    }
}
