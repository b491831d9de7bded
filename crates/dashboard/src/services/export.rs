//! CSV export.
//!
//! One row per record with a header row naming the fields. Money is written
//! with two decimals, dates as `YYYY-MM-DD` and missing values as empty cells.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};

use super::{ServiceContext, ServiceError};
use crate::models::{InventoryFilter, InventoryItem, Page, Sale, SaleFilter};

/// Errors while producing an export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to finish CSV: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// A finished CSV document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvFile {
    /// Suggested download name.
    pub filename: String,
    pub body: Vec<u8>,
}

#[derive(Serialize)]
struct InventoryRecord<'a> {
    sku: &'a str,
    item_name: &'a str,
    category: Option<&'a str>,
    size: Option<&'a str>,
    condition: Option<&'a str>,
    brand: Option<&'a str>,
    listing_status: &'static str,
    purchase_price: Decimal,
    sale_price: Option<Decimal>,
    profit: Option<Decimal>,
    date_purchased: Option<NaiveDate>,
    date_listed: Option<NaiveDate>,
    date_sold: Option<NaiveDate>,
    storage_location: Option<&'a str>,
    notes: Option<&'a str>,
}

impl<'a> From<&'a InventoryItem> for InventoryRecord<'a> {
    fn from(item: &'a InventoryItem) -> Self {
        Self {
            sku: &item.sku,
            item_name: &item.item_name,
            category: item.category.as_deref(),
            size: item.size.as_deref(),
            condition: item.condition.as_deref(),
            brand: item.brand.as_deref(),
            listing_status: item.listing_status.label(),
            purchase_price: item.purchase_price,
            sale_price: item.sale_price,
            profit: item.profit,
            date_purchased: item.date_purchased,
            date_listed: item.date_listed,
            date_sold: item.date_sold,
            storage_location: item.storage_location.as_deref(),
            notes: item.notes.as_deref(),
        }
    }
}

#[derive(Serialize)]
struct SaleRecord<'a> {
    order_id: &'a str,
    platform: &'static str,
    item_name: Option<&'a str>,
    sale_price: Decimal,
    platform_fees: Decimal,
    payment_processing_fees: Decimal,
    shipping_cost: Decimal,
    net_profit: Decimal,
    date_sold: NaiveDate,
    payout_status: &'static str,
    buyer_name: Option<&'a str>,
}

impl<'a> From<&'a Sale> for SaleRecord<'a> {
    fn from(sale: &'a Sale) -> Self {
        Self {
            order_id: &sale.order_id,
            platform: sale.platform.label(),
            item_name: sale.item_name.as_deref(),
            sale_price: sale.sale_price,
            platform_fees: sale.platform_fees,
            payment_processing_fees: sale.payment_processing_fees,
            shipping_cost: sale.shipping_cost,
            net_profit: sale.net_profit,
            date_sold: sale.date_sold,
            payout_status: sale.payout_status.label(),
            buyer_name: sale.buyer_name.as_deref(),
        }
    }
}

const INVENTORY_HEADER: &[&str] = &[
    "sku",
    "item_name",
    "category",
    "size",
    "condition",
    "brand",
    "listing_status",
    "purchase_price",
    "sale_price",
    "profit",
    "date_purchased",
    "date_listed",
    "date_sold",
    "storage_location",
    "notes",
];

const SALES_HEADER: &[&str] = &[
    "order_id",
    "platform",
    "item_name",
    "sale_price",
    "platform_fees",
    "payment_processing_fees",
    "shipping_cost",
    "net_profit",
    "date_sold",
    "payout_status",
    "buyer_name",
];

/// The header is written explicitly so an empty export still has one.
fn write_csv<R: Serialize>(
    header: &[&str],
    records: impl IntoIterator<Item = R>,
) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(header)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}

/// Read every row by walking pages until a short one comes back.
async fn collect_pages<T, F, Fut>(mut fetch: F) -> Result<Vec<T>, ServiceError>
where
    F: FnMut(Page) -> Fut,
    Fut: Future<Output = Result<Vec<T>, ServiceError>>,
{
    let mut page = Page::all();
    let mut rows = Vec::new();
    loop {
        let batch = fetch(page).await?;
        let full = batch.len() >= page.limit as usize;
        rows.extend(batch);
        if !full {
            return Ok(rows);
        }
        page.offset += page.limit;
    }
}

/// CSV downloads.
pub struct ExportService<'a> {
    ctx: ServiceContext<'a>,
}

impl<'a> ExportService<'a> {
    #[must_use]
    pub const fn new(ctx: ServiceContext<'a>) -> Self {
        Self { ctx }
    }

    fn filename(&self, prefix: &str) -> String {
        format!("{prefix}_export_{}.csv", self.ctx.today.format("%Y%m%d"))
    }

    /// Every inventory item, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if loading or writing fails.
    #[instrument(skip(self))]
    pub async fn inventory_csv(&self) -> Result<CsvFile, ExportError> {
        let inventory = self.ctx.inventory();
        let filter = InventoryFilter::default();
        let items = collect_pages(|page| inventory.list(&filter, page)).await?;
        let body = write_csv(INVENTORY_HEADER, items.iter().map(InventoryRecord::from))?;
        info!(rows = items.len(), "Exported inventory");
        Ok(CsvFile {
            filename: self.filename("inventory"),
            body,
        })
    }

    /// Every sale, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if loading or writing fails.
    #[instrument(skip(self))]
    pub async fn sales_csv(&self) -> Result<CsvFile, ExportError> {
        let service = &self.ctx.sales();
        let filter = &SaleFilter::default();
        let sales = collect_pages(|page| async move {
            service.list(filter, page).await.map(|(sales, _)| sales)
        })
        .await?;
        let body = write_csv(SALES_HEADER, sales.iter().map(SaleRecord::from))?;
        info!(rows = sales.len(), "Exported sales");
        Ok(CsvFile {
            filename: self.filename("sales"),
            body,
        })
    }
}
