//! Dashboard aggregate queries.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use flipledger_core::{ListingStatus, Platform, ReturnStatus, ShipmentStatus, TaskStatus};

use super::{RepositoryError, parse_column};
use crate::models::{DashboardStats, InventoryCounts};

fn count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or_default()
}

fn labels<T: Copy>(
    all: &[T],
    keep: impl Fn(T) -> bool,
    label: impl Fn(T) -> &'static str,
) -> Vec<&'static str> {
    all.iter().copied().filter(|v| keep(*v)).map(label).collect()
}

async fn count_in(
    pool: &PgPool,
    table: &str,
    column: &str,
    values: Vec<&'static str>,
) -> Result<u64, RepositoryError> {
    let sql = format!("SELECT COUNT(*) FROM {table} WHERE {column} = ANY($1)");
    let n = sqlx::query_scalar::<_, i64>(&sql)
        .bind(values)
        .fetch_one(pool)
        .await?;
    Ok(count(n))
}

#[instrument(skip(pool))]
pub(super) async fn dashboard(
    pool: &PgPool,
    since: NaiveDate,
) -> Result<DashboardStats, RepositoryError> {
    let by_status = sqlx::query_as::<_, (String, i64)>(
        r"
        SELECT listing_status, COUNT(*) FROM inventory
        GROUP BY listing_status
        ",
    )
    .fetch_all(pool)
    .await?;

    let mut inventory = InventoryCounts::default();
    for (status, n) in by_status {
        inventory.add(parse_column::<ListingStatus>("listing_status", &status)?, count(n));
    }

    let (recent_sales, recent_net_profit) = sqlx::query_as::<_, (i64, Decimal)>(
        r"
        SELECT COUNT(*), COALESCE(SUM(net_profit), 0) FROM sales
        WHERE date_sold >= $1
        ",
    )
    .bind(since)
    .fetch_one(pool)
    .await?;

    let by_platform = sqlx::query_as::<_, (String, i64)>(
        r"
        SELECT platform, COUNT(*) FROM sales
        GROUP BY platform
        ",
    )
    .fetch_all(pool)
    .await?;
    let by_platform = by_platform
        .into_iter()
        .map(|(platform, n)| Ok((parse_column::<Platform>("platform", &platform)?, count(n))))
        .collect::<Result<Vec<_>, RepositoryError>>()?;

    let pending_shipments = count_in(
        pool,
        "shipments",
        "status",
        labels(ShipmentStatus::ALL, ShipmentStatus::is_awaiting_dispatch, ShipmentStatus::label),
    )
    .await?;
    let open_returns = count_in(
        pool,
        "returns",
        "status",
        labels(ReturnStatus::ALL, ReturnStatus::is_open, ReturnStatus::label),
    )
    .await?;
    let pending_tasks = count_in(
        pool,
        "tasks",
        "status",
        labels(TaskStatus::ALL, TaskStatus::is_pending, TaskStatus::label),
    )
    .await?;

    Ok(DashboardStats {
        inventory,
        recent_sales: count(recent_sales),
        recent_net_profit,
        sales_by_platform: DashboardStats::platform_counts(by_platform),
        pending_shipments,
        open_returns,
        pending_tasks,
    })
}
