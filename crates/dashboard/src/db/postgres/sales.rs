//! Sales table queries.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, instrument};

use flipledger_core::{InventoryItemId, PayoutStatus, Platform, SaleId};

use super::{RepositoryError, expect_row, page_bounds, parse_column, unique_conflict};
use crate::models::{Page, Sale, SaleFilter};

const COLUMNS: &str = "id, order_id, inventory_id, platform, item_name, sale_price, \
    platform_fees, payment_processing_fees, shipping_cost, buyer_paid_shipping, net_profit, \
    date_sold, shipped_date, tracking_number, payout_status, buyer_name, buyer_username, notes, \
    created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: SaleId,
    order_id: String,
    inventory_id: Option<InventoryItemId>,
    platform: String,
    item_name: Option<String>,
    sale_price: Decimal,
    platform_fees: Decimal,
    payment_processing_fees: Decimal,
    shipping_cost: Decimal,
    buyer_paid_shipping: bool,
    net_profit: Decimal,
    date_sold: NaiveDate,
    shipped_date: Option<NaiveDate>,
    tracking_number: Option<String>,
    payout_status: String,
    buyer_name: Option<String>,
    buyer_username: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SaleRow> for Sale {
    type Error = RepositoryError;

    fn try_from(row: SaleRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            inventory_id: row.inventory_id,
            platform: parse_column::<Platform>("platform", &row.platform)?,
            item_name: row.item_name,
            sale_price: row.sale_price,
            platform_fees: row.platform_fees,
            payment_processing_fees: row.payment_processing_fees,
            shipping_cost: row.shipping_cost,
            buyer_paid_shipping: row.buyer_paid_shipping,
            net_profit: row.net_profit,
            date_sold: row.date_sold,
            shipped_date: row.shipped_date,
            tracking_number: row.tracking_number,
            payout_status: parse_column::<PayoutStatus>("payout_status", &row.payout_status)?,
            buyer_name: row.buyer_name,
            buyer_username: row.buyer_username,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[instrument(skip(pool, sale), fields(order_id = %sale.order_id))]
pub(super) async fn insert(pool: &PgPool, sale: &Sale) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO sales (
            id, order_id, inventory_id, platform, item_name, sale_price, platform_fees,
            payment_processing_fees, shipping_cost, buyer_paid_shipping, net_profit,
            date_sold, shipped_date, tracking_number, payout_status, buyer_name,
            buyer_username, notes, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                $17, $18, $19, $20)
        ",
    )
    .bind(sale.id)
    .bind(&sale.order_id)
    .bind(sale.inventory_id)
    .bind(sale.platform.label())
    .bind(&sale.item_name)
    .bind(sale.sale_price)
    .bind(sale.platform_fees)
    .bind(sale.payment_processing_fees)
    .bind(sale.shipping_cost)
    .bind(sale.buyer_paid_shipping)
    .bind(sale.net_profit)
    .bind(sale.date_sold)
    .bind(sale.shipped_date)
    .bind(&sale.tracking_number)
    .bind(sale.payout_status.label())
    .bind(&sale.buyer_name)
    .bind(&sale.buyer_username)
    .bind(&sale.notes)
    .bind(sale.created_at)
    .bind(sale.updated_at)
    .execute(pool)
    .await
    .map_err(|e| unique_conflict(e, "order_id"))?;

    Ok(())
}

#[instrument(skip(pool))]
pub(super) async fn get(pool: &PgPool, id: SaleId) -> Result<Option<Sale>, RepositoryError> {
    let sql = format!("SELECT {COLUMNS} FROM sales WHERE id = $1");
    let row = sqlx::query_as::<_, SaleRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(TryInto::try_into).transpose()
}

#[instrument(skip(pool))]
pub(super) async fn get_by_order_id(
    pool: &PgPool,
    order_id: &str,
) -> Result<Option<Sale>, RepositoryError> {
    let sql = format!("SELECT {COLUMNS} FROM sales WHERE order_id = $1");
    let row = sqlx::query_as::<_, SaleRow>(&sql)
        .bind(order_id)
        .fetch_optional(pool)
        .await?;

    row.map(TryInto::try_into).transpose()
}

#[instrument(skip(pool, sale), fields(id = %sale.id))]
pub(super) async fn update(pool: &PgPool, sale: &Sale) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE sales SET
            order_id = $2, inventory_id = $3, platform = $4, item_name = $5, sale_price = $6,
            platform_fees = $7, payment_processing_fees = $8, shipping_cost = $9,
            buyer_paid_shipping = $10, net_profit = $11, date_sold = $12, shipped_date = $13,
            tracking_number = $14, payout_status = $15, buyer_name = $16,
            buyer_username = $17, notes = $18, updated_at = $19
        WHERE id = $1
        ",
    )
    .bind(sale.id)
    .bind(&sale.order_id)
    .bind(sale.inventory_id)
    .bind(sale.platform.label())
    .bind(&sale.item_name)
    .bind(sale.sale_price)
    .bind(sale.platform_fees)
    .bind(sale.payment_processing_fees)
    .bind(sale.shipping_cost)
    .bind(sale.buyer_paid_shipping)
    .bind(sale.net_profit)
    .bind(sale.date_sold)
    .bind(sale.shipped_date)
    .bind(&sale.tracking_number)
    .bind(sale.payout_status.label())
    .bind(&sale.buyer_name)
    .bind(&sale.buyer_username)
    .bind(&sale.notes)
    .bind(sale.updated_at)
    .execute(pool)
    .await
    .map_err(|e| unique_conflict(e, "order_id"))?;

    expect_row(result.rows_affected())
}

#[instrument(skip(pool))]
pub(super) async fn list(
    pool: &PgPool,
    filter: &SaleFilter,
    page: Page,
) -> Result<Vec<Sale>, RepositoryError> {
    let (limit, offset) = page_bounds(page);
    let sql = format!(
        r"
        SELECT {COLUMNS} FROM sales
        WHERE ($1::text IS NULL OR platform = $1)
          AND ($2::text IS NULL OR payout_status = $2)
          AND ($3::date IS NULL OR date_sold >= $3)
          AND ($4::date IS NULL OR date_sold <= $4)
        ORDER BY date_sold DESC, created_at DESC, id DESC
        LIMIT $5 OFFSET $6
        "
    );
    let rows = sqlx::query_as::<_, SaleRow>(&sql)
        .bind(filter.platform.map(Platform::label))
        .bind(filter.payout_status.map(PayoutStatus::label))
        .bind(filter.sold_from)
        .bind(filter.sold_to)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    debug!(count = rows.len(), "Listed sales");
    rows.into_iter().map(TryInto::try_into).collect()
}
