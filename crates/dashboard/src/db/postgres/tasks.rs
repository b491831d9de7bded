//! Tasks table queries.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument};

use flipledger_core::{InventoryItemId, TaskCategory, TaskId, TaskPriority, TaskStatus};

use super::{RepositoryError, expect_row, page_bounds, parse_column};
use crate::models::{Page, Task, TaskFilter};

const COLUMNS: &str = "id, title, description, category, priority, status, due_date, \
    completed_date, inventory_id, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: TaskId,
    title: String,
    description: Option<String>,
    category: String,
    priority: String,
    status: String,
    due_date: Option<NaiveDate>,
    completed_date: Option<NaiveDate>,
    inventory_id: Option<InventoryItemId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = RepositoryError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            title: row.title,
            description: row.description,
            category: parse_column::<TaskCategory>("category", &row.category)?,
            priority: parse_column::<TaskPriority>("priority", &row.priority)?,
            status: parse_column::<TaskStatus>("status", &row.status)?,
            due_date: row.due_date,
            completed_date: row.completed_date,
            inventory_id: row.inventory_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn pending_labels() -> Vec<&'static str> {
    TaskStatus::ALL
        .iter()
        .filter(|s| s.is_pending())
        .map(|s| s.label())
        .collect()
}

/// SQL expression ranking priorities, highest first.
fn priority_rank_sql() -> String {
    let arms: String = TaskPriority::ALL
        .iter()
        .map(|p| format!(" WHEN '{}' THEN {}", p.label(), p.rank()))
        .collect();
    format!("CASE priority{arms} ELSE 0 END")
}

#[instrument(skip(pool, task), fields(title = %task.title))]
pub(super) async fn insert(pool: &PgPool, task: &Task) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO tasks (
            id, title, description, category, priority, status, due_date, completed_date,
            inventory_id, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ",
    )
    .bind(task.id)
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.category.label())
    .bind(task.priority.label())
    .bind(task.status.label())
    .bind(task.due_date)
    .bind(task.completed_date)
    .bind(task.inventory_id)
    .bind(task.created_at)
    .bind(task.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

#[instrument(skip(pool))]
pub(super) async fn get(pool: &PgPool, id: TaskId) -> Result<Option<Task>, RepositoryError> {
    let sql = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1");
    let row = sqlx::query_as::<_, TaskRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(TryInto::try_into).transpose()
}

#[instrument(skip(pool, task), fields(id = %task.id))]
pub(super) async fn update(pool: &PgPool, task: &Task) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE tasks SET
            title = $2, description = $3, category = $4, priority = $5, status = $6,
            due_date = $7, completed_date = $8, inventory_id = $9, updated_at = $10
        WHERE id = $1
        ",
    )
    .bind(task.id)
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.category.label())
    .bind(task.priority.label())
    .bind(task.status.label())
    .bind(task.due_date)
    .bind(task.completed_date)
    .bind(task.inventory_id)
    .bind(task.updated_at)
    .execute(pool)
    .await?;

    expect_row(result.rows_affected())
}

#[instrument(skip(pool))]
pub(super) async fn list(
    pool: &PgPool,
    filter: &TaskFilter,
    page: Page,
) -> Result<Vec<Task>, RepositoryError> {
    let (limit, offset) = page_bounds(page);
    let order = if filter.pending_only {
        format!("{} DESC, due_date ASC NULLS LAST, created_at ASC", priority_rank_sql())
    } else {
        "due_date ASC NULLS LAST, created_at ASC".to_owned()
    };
    let sql = format!(
        r"
        SELECT {COLUMNS} FROM tasks
        WHERE ($1::text IS NULL OR status = $1)
          AND ($2::text IS NULL OR priority = $2)
          AND ($3::text IS NULL OR category = $3)
          AND (NOT $4 OR status = ANY($5))
        ORDER BY {order}
        LIMIT $6 OFFSET $7
        "
    );
    let rows = sqlx::query_as::<_, TaskRow>(&sql)
        .bind(filter.status.map(TaskStatus::label))
        .bind(filter.priority.map(TaskPriority::label))
        .bind(filter.category.map(TaskCategory::label))
        .bind(filter.pending_only)
        .bind(pending_labels())
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    debug!(count = rows.len(), "Listed tasks");
    rows.into_iter().map(TryInto::try_into).collect()
}
