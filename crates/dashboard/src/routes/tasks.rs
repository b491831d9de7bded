//! Task route handlers.
//!
//! New tasks and status changes are posted from the list page. A post to
//! `/tasks/{id}` carrying a `title` is a full edit; one carrying only
//! `status` moves the task along.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use tracing::instrument;

use flipledger_core::validation::{parse_enum, require_text};
use flipledger_core::{TaskCategory, TaskId, TaskPriority, TaskStatus, ValidationError};

use super::{
    FlashQuery, FormView, PageMeta, Prefill, date_text, form_errors, labels, linked_form_errors,
    next_page_link, redirect_success, render, unprocessable,
};
use crate::error::AppError;
use crate::filters;
use crate::models::{AppSettings, FormFields, Page, PageQuery, Task, TaskInput, TaskQuery};
use crate::services::{ServiceContext, ServiceError};
use crate::state::AppState;

const PATH: &str = "/tasks";
const LINKED: &str = "inventory item";

/// One task, formatted for display.
#[derive(Debug, Clone)]
pub struct TaskRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: &'static str,
    pub priority: &'static str,
    pub status: &'static str,
    pub due_date: String,
    pub completed_date: String,
    /// Still pending with the due date passed.
    pub overdue: bool,
    pub linked: bool,
}

impl TaskRow {
    #[must_use]
    pub fn new(task: &Task, today: NaiveDate) -> Self {
        Self {
            id: task.id.to_string(),
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            category: task.category.label(),
            priority: task.priority.label(),
            status: task.status.label(),
            due_date: date_text(task.due_date),
            completed_date: date_text(task.completed_date),
            overdue: task.status.is_pending() && task.due_date.is_some_and(|due| due < today),
            linked: task.inventory_id.is_some(),
        }
    }
}

/// Choices shared by the task forms.
#[derive(Debug, Clone)]
pub struct TaskChoices {
    pub statuses: Vec<&'static str>,
    pub priorities: Vec<&'static str>,
    pub categories: Vec<&'static str>,
}

impl Default for TaskChoices {
    fn default() -> Self {
        Self {
            statuses: labels(TaskStatus::ALL, TaskStatus::label),
            priorities: labels(TaskPriority::ALL, TaskPriority::label),
            categories: labels(TaskCategory::ALL, TaskCategory::label),
        }
    }
}

/// Task list page with the new-task form.
#[derive(Template)]
#[template(path = "tasks/index.html")]
pub struct TasksListTemplate {
    pub page: PageMeta,
    pub rows: Vec<TaskRow>,
    pub filter: FormView,
    pub form: FormView,
    pub choices: TaskChoices,
    pub next_page: Option<String>,
}

/// Full task edit page.
#[derive(Template)]
#[template(path = "tasks/form.html")]
pub struct TaskFormTemplate {
    pub page: PageMeta,
    pub heading: String,
    pub action: String,
    pub form: FormView,
    pub choices: TaskChoices,
}

fn task_form(task: &Task, inventory_sku: Option<&str>) -> FormView {
    Prefill::new()
        .text("title", &task.title)
        .opt("description", task.description.as_deref())
        .text("category", task.category.label())
        .text("priority", task.priority.label())
        .text("status", task.status.label())
        .date("due_date", task.due_date)
        .date("completed_date", task.completed_date)
        .opt("inventory_sku", inventory_sku)
        .finish()
}

fn blank_form() -> FormView {
    Prefill::new()
        .text("category", TaskCategory::default().label())
        .text("priority", TaskPriority::default().label())
        .text("status", TaskStatus::default().label())
        .finish()
}

/// Build the tasks router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(PATH, get(list).post(create))
        .route("/tasks/{id}/edit", get(edit_form))
        .route("/tasks/{id}", post(update))
        .route("/tasks/{id}/delete", post(delete))
}

async fn list_page(
    state: &AppState,
    settings: &AppSettings,
    raw: Vec<(String, String)>,
    query: &TaskQuery,
    page: Page,
    meta: PageMeta,
    form: FormView,
) -> Result<TasksListTemplate, AppError> {
    let filter = query.to_filter()?;
    let tasks = state.context(settings).tasks().list(&filter, page).await?;
    let today = state.today();

    Ok(TasksListTemplate {
        page: meta,
        next_page: next_page_link(PATH, &raw, page, tasks.len()),
        rows: tasks.iter().map(|task| TaskRow::new(task, today)).collect(),
        filter: FormView::filled(FormFields::new(raw)),
        form,
        choices: TaskChoices::default(),
    })
}

/// Filtered task list.
#[instrument(skip(state, raw))]
async fn list(
    State(state): State<AppState>,
    Query(raw): Query<Vec<(String, String)>>,
    Query(query): Query<TaskQuery>,
    Query(paging): Query<PageQuery>,
    Query(flash): Query<FlashQuery>,
) -> Result<Html<String>, AppError> {
    let settings = state.settings().await?;
    let meta = PageMeta::new(&settings, PATH, flash);
    let template =
        list_page(&state, &settings, raw, &query, paging.into(), meta, blank_form()).await?;
    render(&template)
}

/// Re-render the list after a rejected form.
async fn rejected(
    state: &AppState,
    settings: &AppSettings,
    form: FormView,
    errors: &ValidationError,
) -> Result<Response, AppError> {
    let meta = PageMeta::new(settings, PATH, FlashQuery::default()).with_error(errors.to_string());
    let template = list_page(
        state,
        settings,
        Vec::new(),
        &TaskQuery::default(),
        Page::default(),
        meta,
        form,
    )
    .await?;
    unprocessable(&template)
}

async fn create_task(ctx: ServiceContext<'_>, fields: &FormFields) -> Result<Task, ServiceError> {
    let input = TaskInput::from_form(fields)?;
    ctx.tasks().create(input).await
}

/// Create a task.
#[instrument(skip(state, pairs))]
async fn create(
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let fields = FormFields::new(pairs);
    let settings = state.settings().await?;

    match create_task(state.context(&settings), &fields).await {
        Ok(task) => Ok(redirect_success(PATH, &format!("Added task {}", task.title)).into_response()),
        Err(error) => {
            let errors = linked_form_errors(error, LINKED, "inventory_sku")?;
            rejected(&state, &settings, FormView::rejected(fields, errors.clone()), &errors).await
        }
    }
}

/// Edit form for a task.
#[instrument(skip(state))]
async fn edit_form(
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
) -> Result<Html<String>, AppError> {
    let settings = state.settings().await?;
    let tasks = state.context(&settings).tasks();
    let task = tasks.get(id).await?;
    let sku = tasks.linked_sku(&task).await?;
    render(&TaskFormTemplate {
        page: PageMeta::new(&settings, PATH, FlashQuery::default()),
        heading: format!("Edit task {}", task.title),
        action: format!("/tasks/{id}"),
        form: task_form(&task, sku.as_deref()),
        choices: TaskChoices::default(),
    })
}

/// The status a status-only post asks for.
fn requested_status(fields: &FormFields) -> Result<TaskStatus, ValidationError> {
    let raw = require_text("status", fields.get("status"))?;
    Ok(parse_enum("status", &raw)?)
}

async fn update_task(
    ctx: ServiceContext<'_>,
    id: TaskId,
    fields: &FormFields,
) -> Result<Task, ServiceError> {
    if fields.has("title") {
        let input = TaskInput::from_form(fields)?;
        ctx.tasks().update(id, input).await
    } else {
        let status = requested_status(fields)?;
        ctx.tasks().update_status(id, status).await
    }
}

/// Save a full edit or a status change.
#[instrument(skip(state, pairs))]
async fn update(
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let fields = FormFields::new(pairs);
    let settings = state.settings().await?;
    let full_edit = fields.has("title");

    match update_task(state.context(&settings), id, &fields).await {
        Ok(task) => Ok(redirect_success(
            PATH,
            &format!("Task {} is {}", task.title, task.status),
        )
        .into_response()),
        Err(error) => {
            let errors = linked_form_errors(error, LINKED, "inventory_sku")?;
            if full_edit {
                unprocessable(&TaskFormTemplate {
                    page: PageMeta::new(&settings, PATH, FlashQuery::default()),
                    heading: "Edit task".to_string(),
                    action: format!("/tasks/{id}"),
                    form: FormView::rejected(fields, errors),
                    choices: TaskChoices::default(),
                })
            } else {
                rejected(&state, &settings, blank_form(), &errors).await
            }
        }
    }
}

/// Delete a task.
#[instrument(skip(state))]
async fn delete(
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
) -> Result<Response, AppError> {
    let settings = state.settings().await?;
    state.context(&settings).tasks().delete(id).await?;
    Ok(redirect_success(PATH, "Task deleted").into_response())
}
