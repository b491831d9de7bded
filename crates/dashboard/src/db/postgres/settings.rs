//! Settings table queries.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use super::RepositoryError;
use crate::models::Setting;

#[derive(Debug, sqlx::FromRow)]
struct SettingRow {
    key: String,
    value: String,
    updated_at: DateTime<Utc>,
}

impl From<SettingRow> for Setting {
    fn from(row: SettingRow) -> Self {
        Self {
            key: row.key,
            value: row.value,
            updated_at: row.updated_at,
        }
    }
}

pub(super) async fn list(pool: &PgPool) -> Result<Vec<Setting>, RepositoryError> {
    let rows = sqlx::query_as::<_, SettingRow>(
        r"
        SELECT key, value, updated_at FROM settings
        ORDER BY key
        ",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

#[instrument(skip(pool, value))]
pub(super) async fn upsert(pool: &PgPool, key: &str, value: &str) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO settings (key, value, updated_at)
        VALUES ($1, $2, NOW())
        ON CONFLICT (key) DO UPDATE SET value = $2, updated_at = NOW()
        ",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}
