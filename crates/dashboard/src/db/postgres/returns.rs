//! Returns table queries.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, instrument};

use flipledger_core::{ReturnCaseId, ReturnStatus, SaleId};

use super::{RepositoryError, expect_row, page_bounds, parse_column};
use crate::models::{Page, ReturnCase, ReturnFilter};

const COLUMNS: &str = "id, sale_id, order_id, reason, status, date_opened, date_closed, \
    expected_loss, actual_loss, resolution_notes, notes, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ReturnRow {
    id: ReturnCaseId,
    sale_id: Option<SaleId>,
    order_id: String,
    reason: Option<String>,
    status: String,
    date_opened: NaiveDate,
    date_closed: Option<NaiveDate>,
    expected_loss: Decimal,
    actual_loss: Option<Decimal>,
    resolution_notes: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReturnRow> for ReturnCase {
    type Error = RepositoryError;

    fn try_from(row: ReturnRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            sale_id: row.sale_id,
            order_id: row.order_id,
            reason: row.reason,
            status: parse_column::<ReturnStatus>("status", &row.status)?,
            date_opened: row.date_opened,
            date_closed: row.date_closed,
            expected_loss: row.expected_loss,
            actual_loss: row.actual_loss,
            resolution_notes: row.resolution_notes,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn open_labels() -> Vec<&'static str> {
    ReturnStatus::ALL
        .iter()
        .filter(|s| s.is_open())
        .map(|s| s.label())
        .collect()
}

#[instrument(skip(pool, case), fields(order_id = %case.order_id))]
pub(super) async fn insert(pool: &PgPool, case: &ReturnCase) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO returns (
            id, sale_id, order_id, reason, status, date_opened, date_closed, expected_loss,
            actual_loss, resolution_notes, notes, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        ",
    )
    .bind(case.id)
    .bind(case.sale_id)
    .bind(&case.order_id)
    .bind(&case.reason)
    .bind(case.status.label())
    .bind(case.date_opened)
    .bind(case.date_closed)
    .bind(case.expected_loss)
    .bind(case.actual_loss)
    .bind(&case.resolution_notes)
    .bind(&case.notes)
    .bind(case.created_at)
    .bind(case.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

#[instrument(skip(pool))]
pub(super) async fn get(
    pool: &PgPool,
    id: ReturnCaseId,
) -> Result<Option<ReturnCase>, RepositoryError> {
    let sql = format!("SELECT {COLUMNS} FROM returns WHERE id = $1");
    let row = sqlx::query_as::<_, ReturnRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(TryInto::try_into).transpose()
}

#[instrument(skip(pool, case), fields(id = %case.id))]
pub(super) async fn update(pool: &PgPool, case: &ReturnCase) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE returns SET
            sale_id = $2, order_id = $3, reason = $4, status = $5, date_opened = $6,
            date_closed = $7, expected_loss = $8, actual_loss = $9, resolution_notes = $10,
            notes = $11, updated_at = $12
        WHERE id = $1
        ",
    )
    .bind(case.id)
    .bind(case.sale_id)
    .bind(&case.order_id)
    .bind(&case.reason)
    .bind(case.status.label())
    .bind(case.date_opened)
    .bind(case.date_closed)
    .bind(case.expected_loss)
    .bind(case.actual_loss)
    .bind(&case.resolution_notes)
    .bind(&case.notes)
    .bind(case.updated_at)
    .execute(pool)
    .await?;

    expect_row(result.rows_affected())
}

#[instrument(skip(pool))]
pub(super) async fn list(
    pool: &PgPool,
    filter: &ReturnFilter,
    page: Page,
) -> Result<Vec<ReturnCase>, RepositoryError> {
    let (limit, offset) = page_bounds(page);
    let sql = format!(
        r"
        SELECT {COLUMNS} FROM returns
        WHERE ($1::text IS NULL OR status = $1)
          AND (NOT $2 OR status = ANY($3))
        ORDER BY date_opened DESC, created_at DESC, id DESC
        LIMIT $4 OFFSET $5
        "
    );
    let rows = sqlx::query_as::<_, ReturnRow>(&sql)
        .bind(filter.status.map(ReturnStatus::label))
        .bind(filter.open_only)
        .bind(open_labels())
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    debug!(count = rows.len(), "Listed returns");
    rows.into_iter().map(TryInto::try_into).collect()
}
