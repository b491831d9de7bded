//! Shipments table queries.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, instrument};

use flipledger_core::{SaleId, ShipmentId, ShipmentStatus};

use super::{RepositoryError, expect_row, page_bounds, parse_column};
use crate::models::{Page, Shipment, ShipmentFilter, ShipmentListing};

const COLUMNS: &str = "s.id, s.sale_id, s.carrier, s.tracking_number, s.label_cost, \
    s.dispatch_deadline, s.status, s.shipped_date, s.delivered_date, s.notes, s.created_at, \
    s.updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ShipmentRow {
    id: ShipmentId,
    sale_id: SaleId,
    carrier: Option<String>,
    tracking_number: Option<String>,
    label_cost: Decimal,
    dispatch_deadline: Option<NaiveDate>,
    status: String,
    shipped_date: Option<NaiveDate>,
    delivered_date: Option<NaiveDate>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ShipmentRow> for Shipment {
    type Error = RepositoryError;

    fn try_from(row: ShipmentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            sale_id: row.sale_id,
            carrier: row.carrier,
            tracking_number: row.tracking_number,
            label_cost: row.label_cost,
            dispatch_deadline: row.dispatch_deadline,
            status: parse_column::<ShipmentStatus>("status", &row.status)?,
            shipped_date: row.shipped_date,
            delivered_date: row.delivered_date,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ListingRow {
    #[sqlx(flatten)]
    shipment: ShipmentRow,
    order_id: String,
    item_name: Option<String>,
    buyer_name: Option<String>,
}

impl TryFrom<ListingRow> for ShipmentListing {
    type Error = RepositoryError;

    fn try_from(row: ListingRow) -> Result<Self, Self::Error> {
        Ok(Self {
            shipment: row.shipment.try_into()?,
            order_id: row.order_id,
            item_name: row.item_name,
            buyer_name: row.buyer_name,
        })
    }
}

fn awaiting_dispatch_labels() -> Vec<&'static str> {
    ShipmentStatus::ALL
        .iter()
        .filter(|s| s.is_awaiting_dispatch())
        .map(|s| s.label())
        .collect()
}

#[instrument(skip(pool, shipment), fields(sale_id = %shipment.sale_id))]
pub(super) async fn insert(pool: &PgPool, shipment: &Shipment) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO shipments (
            id, sale_id, carrier, tracking_number, label_cost, dispatch_deadline, status,
            shipped_date, delivered_date, notes, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ",
    )
    .bind(shipment.id)
    .bind(shipment.sale_id)
    .bind(&shipment.carrier)
    .bind(&shipment.tracking_number)
    .bind(shipment.label_cost)
    .bind(shipment.dispatch_deadline)
    .bind(shipment.status.label())
    .bind(shipment.shipped_date)
    .bind(shipment.delivered_date)
    .bind(&shipment.notes)
    .bind(shipment.created_at)
    .bind(shipment.updated_at)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_foreign_key_violation()
        {
            return RepositoryError::NotFound;
        }
        RepositoryError::Database(e)
    })?;

    Ok(())
}

#[instrument(skip(pool))]
pub(super) async fn get(pool: &PgPool, id: ShipmentId) -> Result<Option<Shipment>, RepositoryError> {
    let sql = format!("SELECT {COLUMNS} FROM shipments s WHERE s.id = $1");
    let row = sqlx::query_as::<_, ShipmentRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(TryInto::try_into).transpose()
}

#[instrument(skip(pool, shipment), fields(id = %shipment.id))]
pub(super) async fn update(pool: &PgPool, shipment: &Shipment) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE shipments SET
            carrier = $2, tracking_number = $3, label_cost = $4, dispatch_deadline = $5,
            status = $6, shipped_date = $7, delivered_date = $8, notes = $9, updated_at = $10
        WHERE id = $1
        ",
    )
    .bind(shipment.id)
    .bind(&shipment.carrier)
    .bind(&shipment.tracking_number)
    .bind(shipment.label_cost)
    .bind(shipment.dispatch_deadline)
    .bind(shipment.status.label())
    .bind(shipment.shipped_date)
    .bind(shipment.delivered_date)
    .bind(&shipment.notes)
    .bind(shipment.updated_at)
    .execute(pool)
    .await?;

    expect_row(result.rows_affected())
}

#[instrument(skip(pool))]
pub(super) async fn list(
    pool: &PgPool,
    filter: &ShipmentFilter,
    page: Page,
) -> Result<Vec<ShipmentListing>, RepositoryError> {
    let (limit, offset) = page_bounds(page);
    let order = if filter.awaiting_dispatch {
        "s.dispatch_deadline ASC NULLS LAST, s.created_at ASC"
    } else {
        "s.created_at DESC, s.id DESC"
    };
    let sql = format!(
        r"
        SELECT {COLUMNS}, sa.order_id, sa.item_name, sa.buyer_name
        FROM shipments s
        JOIN sales sa ON sa.id = s.sale_id
        WHERE ($1::text IS NULL OR s.status = $1)
          AND ($2::text IS NULL OR s.carrier = $2)
          AND (NOT $3 OR s.status = ANY($4))
        ORDER BY {order}
        LIMIT $5 OFFSET $6
        "
    );
    let rows = sqlx::query_as::<_, ListingRow>(&sql)
        .bind(filter.status.map(ShipmentStatus::label))
        .bind(filter.carrier.as_deref())
        .bind(filter.awaiting_dispatch)
        .bind(awaiting_dispatch_labels())
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    debug!(count = rows.len(), "Listed shipments");
    rows.into_iter().map(TryInto::try_into).collect()
}
