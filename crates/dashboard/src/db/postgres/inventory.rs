//! Inventory table queries.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, instrument};

use flipledger_core::{InventoryItemId, ListingStatus, Platform, ShippingPayer};

use super::{RepositoryError, expect_row, page_bounds, parse_column, unique_conflict};
use crate::models::{InventoryFilter, InventoryItem, Page};

const COLUMNS: &str = "id, sku, item_name, category, size, condition, brand, platforms, \
    listing_status, purchase_price, fees_estimate, shipping_cost, shipping_payer, sale_price, \
    profit, roi_percent, date_purchased, date_listed, date_sold, storage_location, notes, photos, \
    created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct InventoryRow {
    id: InventoryItemId,
    sku: String,
    item_name: String,
    category: Option<String>,
    size: Option<String>,
    condition: Option<String>,
    brand: Option<String>,
    platforms: Vec<String>,
    listing_status: String,
    purchase_price: Decimal,
    fees_estimate: Decimal,
    shipping_cost: Decimal,
    shipping_payer: String,
    sale_price: Option<Decimal>,
    profit: Option<Decimal>,
    roi_percent: Option<Decimal>,
    date_purchased: Option<NaiveDate>,
    date_listed: Option<NaiveDate>,
    date_sold: Option<NaiveDate>,
    storage_location: Option<String>,
    notes: Option<String>,
    photos: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<InventoryRow> for InventoryItem {
    type Error = RepositoryError;

    fn try_from(row: InventoryRow) -> Result<Self, Self::Error> {
        let platforms = row
            .platforms
            .iter()
            .map(|raw| parse_column::<Platform>("platforms", raw))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: row.id,
            sku: row.sku,
            item_name: row.item_name,
            category: row.category,
            size: row.size,
            condition: row.condition,
            brand: row.brand,
            platforms,
            listing_status: parse_column::<ListingStatus>("listing_status", &row.listing_status)?,
            purchase_price: row.purchase_price,
            fees_estimate: row.fees_estimate,
            shipping_cost: row.shipping_cost,
            shipping_payer: parse_column::<ShippingPayer>("shipping_payer", &row.shipping_payer)?,
            sale_price: row.sale_price,
            profit: row.profit,
            roi_percent: row.roi_percent,
            date_purchased: row.date_purchased,
            date_listed: row.date_listed,
            date_sold: row.date_sold,
            storage_location: row.storage_location,
            notes: row.notes,
            photos: row.photos,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn platform_labels(item: &InventoryItem) -> Vec<&'static str> {
    item.platforms.iter().map(|p| p.label()).collect()
}

/// Escape `LIKE` wildcards in user text.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[instrument(skip(pool, item), fields(sku = %item.sku))]
pub(super) async fn insert(pool: &PgPool, item: &InventoryItem) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO inventory (
            id, sku, item_name, category, size, condition, brand, platforms,
            listing_status, purchase_price, fees_estimate, shipping_cost, shipping_payer,
            sale_price, profit, roi_percent, date_purchased, date_listed, date_sold,
            storage_location, notes, photos, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                $17, $18, $19, $20, $21, $22, $23, $24)
        ",
    )
    .bind(item.id)
    .bind(&item.sku)
    .bind(&item.item_name)
    .bind(&item.category)
    .bind(&item.size)
    .bind(&item.condition)
    .bind(&item.brand)
    .bind(platform_labels(item))
    .bind(item.listing_status.label())
    .bind(item.purchase_price)
    .bind(item.fees_estimate)
    .bind(item.shipping_cost)
    .bind(item.shipping_payer.label())
    .bind(item.sale_price)
    .bind(item.profit)
    .bind(item.roi_percent)
    .bind(item.date_purchased)
    .bind(item.date_listed)
    .bind(item.date_sold)
    .bind(&item.storage_location)
    .bind(&item.notes)
    .bind(&item.photos)
    .bind(item.created_at)
    .bind(item.updated_at)
    .execute(pool)
    .await
    .map_err(|e| unique_conflict(e, "sku"))?;

    Ok(())
}

#[instrument(skip(pool))]
pub(super) async fn get(
    pool: &PgPool,
    id: InventoryItemId,
) -> Result<Option<InventoryItem>, RepositoryError> {
    let sql = format!("SELECT {COLUMNS} FROM inventory WHERE id = $1");
    let row = sqlx::query_as::<_, InventoryRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(TryInto::try_into).transpose()
}

#[instrument(skip(pool))]
pub(super) async fn get_by_sku(
    pool: &PgPool,
    sku: &str,
) -> Result<Option<InventoryItem>, RepositoryError> {
    let sql = format!("SELECT {COLUMNS} FROM inventory WHERE lower(sku) = lower($1)");
    let row = sqlx::query_as::<_, InventoryRow>(&sql)
        .bind(sku)
        .fetch_optional(pool)
        .await?;

    row.map(TryInto::try_into).transpose()
}

#[instrument(skip(pool, item), fields(id = %item.id))]
pub(super) async fn update(pool: &PgPool, item: &InventoryItem) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE inventory SET
            sku = $2, item_name = $3, category = $4, size = $5, condition = $6, brand = $7,
            platforms = $8, listing_status = $9, purchase_price = $10, fees_estimate = $11,
            shipping_cost = $12, shipping_payer = $13, sale_price = $14, profit = $15,
            roi_percent = $16, date_purchased = $17, date_listed = $18, date_sold = $19,
            storage_location = $20, notes = $21, photos = $22, updated_at = $23
        WHERE id = $1
        ",
    )
    .bind(item.id)
    .bind(&item.sku)
    .bind(&item.item_name)
    .bind(&item.category)
    .bind(&item.size)
    .bind(&item.condition)
    .bind(&item.brand)
    .bind(platform_labels(item))
    .bind(item.listing_status.label())
    .bind(item.purchase_price)
    .bind(item.fees_estimate)
    .bind(item.shipping_cost)
    .bind(item.shipping_payer.label())
    .bind(item.sale_price)
    .bind(item.profit)
    .bind(item.roi_percent)
    .bind(item.date_purchased)
    .bind(item.date_listed)
    .bind(item.date_sold)
    .bind(&item.storage_location)
    .bind(&item.notes)
    .bind(&item.photos)
    .bind(item.updated_at)
    .execute(pool)
    .await
    .map_err(|e| unique_conflict(e, "sku"))?;

    expect_row(result.rows_affected())
}

#[instrument(skip(pool))]
pub(super) async fn list(
    pool: &PgPool,
    filter: &InventoryFilter,
    page: Page,
) -> Result<Vec<InventoryItem>, RepositoryError> {
    let (limit, offset) = page_bounds(page);
    let sql = format!(
        r"
        SELECT {COLUMNS} FROM inventory
        WHERE ($1::text IS NULL OR listing_status = $1)
          AND ($2::text IS NULL OR brand = $2)
          AND ($3::text IS NULL OR category = $3)
          AND ($4::text IS NULL OR $4 = ANY(platforms))
          AND ($5::date IS NULL OR date_purchased >= $5)
          AND ($6::date IS NULL OR date_purchased <= $6)
          AND ($7::text IS NULL OR sku ILIKE $7 OR item_name ILIKE $7)
        ORDER BY created_at DESC, id DESC
        LIMIT $8 OFFSET $9
        "
    );
    let rows = sqlx::query_as::<_, InventoryRow>(&sql)
        .bind(filter.status.map(ListingStatus::label))
        .bind(filter.brand.as_deref())
        .bind(filter.category.as_deref())
        .bind(filter.platform.map(Platform::label))
        .bind(filter.purchased_from)
        .bind(filter.purchased_to)
        .bind(filter.search.as_deref().map(like_pattern))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    debug!(count = rows.len(), "Listed inventory");
    rows.into_iter().map(TryInto::try_into).collect()
}

pub(super) async fn brands(pool: &PgPool) -> Result<Vec<String>, RepositoryError> {
    let brands = sqlx::query_scalar::<_, String>(
        r"
        SELECT DISTINCT brand FROM inventory
        WHERE brand IS NOT NULL AND brand <> ''
        ORDER BY brand
        ",
    )
    .fetch_all(pool)
    .await?;

    Ok(brands)
}
