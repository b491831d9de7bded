//! Return case route handlers.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::instrument;

use flipledger_core::{CurrencyCode, ReturnCaseId, ReturnStatus};

use super::{
    FlashQuery, FormView, PageMeta, Prefill, date_text, form_errors, labels, money, money_opt,
    next_page_link, redirect_success, render, unprocessable,
};
use crate::error::AppError;
use crate::filters;
use crate::models::{FormFields, Page, PageQuery, ReturnCase, ReturnInput, ReturnQuery};
use crate::services::{ServiceContext, ServiceError};
use crate::state::AppState;

const PATH: &str = "/returns";

/// One return case, formatted for display.
#[derive(Debug, Clone)]
pub struct ReturnRow {
    pub id: String,
    pub order_id: String,
    /// A sale with this order id exists.
    pub linked: bool,
    pub reason: String,
    pub status: &'static str,
    pub date_opened: String,
    pub date_closed: String,
    pub expected_loss: String,
    pub actual_loss: String,
}

impl ReturnRow {
    #[must_use]
    pub fn new(case: &ReturnCase, currency: CurrencyCode) -> Self {
        Self {
            id: case.id.to_string(),
            order_id: case.order_id.clone(),
            linked: case.sale_id.is_some(),
            reason: case.reason.clone().unwrap_or_default(),
            status: case.status.label(),
            date_opened: date_text(Some(case.date_opened)),
            date_closed: date_text(case.date_closed),
            expected_loss: money(case.expected_loss, currency),
            actual_loss: money_opt(case.actual_loss, currency),
        }
    }
}

/// Returns list page.
#[derive(Template)]
#[template(path = "returns/index.html")]
pub struct ReturnsListTemplate {
    pub page: PageMeta,
    pub rows: Vec<ReturnRow>,
    pub filter: FormView,
    pub statuses: Vec<&'static str>,
    pub next_page: Option<String>,
}

/// Open/edit return page.
#[derive(Template)]
#[template(path = "returns/form.html")]
pub struct ReturnFormTemplate {
    pub page: PageMeta,
    pub heading: String,
    pub action: String,
    pub form: FormView,
    pub statuses: Vec<&'static str>,
}

impl ReturnFormTemplate {
    fn new(page: PageMeta, heading: String, action: String, form: FormView) -> Self {
        Self {
            page,
            heading,
            action,
            form,
            statuses: labels(ReturnStatus::ALL, ReturnStatus::label),
        }
    }
}

fn return_form(case: &ReturnCase) -> FormView {
    Prefill::new()
        .text("order_id", &case.order_id)
        .opt("reason", case.reason.as_deref())
        .text("status", case.status.label())
        .date("date_opened", Some(case.date_opened))
        .date("date_closed", case.date_closed)
        .money("expected_loss", Some(case.expected_loss))
        .money("actual_loss", case.actual_loss)
        .opt("resolution_notes", case.resolution_notes.as_deref())
        .opt("notes", case.notes.as_deref())
        .finish()
}

/// Build the returns router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(PATH, get(list).post(create))
        .route("/returns/new", get(new_form))
        .route("/returns/{id}/edit", get(edit_form))
        .route("/returns/{id}", post(update))
        .route("/returns/{id}/delete", post(delete))
}

/// Filtered return list.
#[instrument(skip(state, raw))]
async fn list(
    State(state): State<AppState>,
    Query(raw): Query<Vec<(String, String)>>,
    Query(query): Query<ReturnQuery>,
    Query(paging): Query<PageQuery>,
    Query(flash): Query<FlashQuery>,
) -> Result<Html<String>, AppError> {
    let filter = query.to_filter()?;
    let page = Page::from(paging);
    let settings = state.settings().await?;
    let cases = state.context(&settings).returns().list(&filter, page).await?;

    render(&ReturnsListTemplate {
        page: PageMeta::new(&settings, PATH, flash),
        next_page: next_page_link(PATH, &raw, page, cases.len()),
        rows: cases
            .iter()
            .map(|case| ReturnRow::new(case, settings.currency))
            .collect(),
        filter: FormView::filled(FormFields::new(raw)),
        statuses: labels(ReturnStatus::ALL, ReturnStatus::label),
    })
}

/// `?order_id=` prefills the order being returned.
#[derive(Debug, Default, Deserialize)]
pub struct NewReturnParams {
    pub order_id: Option<String>,
}

/// Empty return form.
async fn new_form(
    State(state): State<AppState>,
    Query(params): Query<NewReturnParams>,
) -> Result<Html<String>, AppError> {
    let settings = state.settings().await?;
    let form = Prefill::new()
        .opt("order_id", params.order_id.as_deref())
        .text("status", ReturnStatus::default().label())
        .date("date_opened", Some(state.today()))
        .finish();
    render(&ReturnFormTemplate::new(
        PageMeta::new(&settings, PATH, FlashQuery::default()),
        "Open return".to_string(),
        PATH.to_string(),
        form,
    ))
}

async fn open_return(
    ctx: ServiceContext<'_>,
    fields: &FormFields,
) -> Result<ReturnCase, ServiceError> {
    let input = ReturnInput::from_form(fields)?;
    ctx.returns().open(input).await
}

/// Open a return.
#[instrument(skip(state, pairs))]
async fn create(
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let fields = FormFields::new(pairs);
    let settings = state.settings().await?;

    match open_return(state.context(&settings), &fields).await {
        Ok(case) => {
            let message = if case.sale_id.is_some() {
                format!("Opened return for {}", case.order_id)
            } else {
                format!("Opened return for {} (no matching sale)", case.order_id)
            };
            Ok(redirect_success(PATH, &message).into_response())
        }
        Err(error) => {
            let errors = form_errors(error)?;
            unprocessable(&ReturnFormTemplate::new(
                PageMeta::new(&settings, PATH, FlashQuery::default()),
                "Open return".to_string(),
                PATH.to_string(),
                FormView::rejected(fields, errors),
            ))
        }
    }
}

/// Edit form for a return.
#[instrument(skip(state))]
async fn edit_form(
    State(state): State<AppState>,
    Path(id): Path<ReturnCaseId>,
) -> Result<Html<String>, AppError> {
    let settings = state.settings().await?;
    let case = state.context(&settings).returns().get(id).await?;
    render(&ReturnFormTemplate::new(
        PageMeta::new(&settings, PATH, FlashQuery::default()),
        format!("Return for {}", case.order_id),
        format!("/returns/{id}"),
        return_form(&case),
    ))
}

async fn update_return(
    ctx: ServiceContext<'_>,
    id: ReturnCaseId,
    fields: &FormFields,
) -> Result<ReturnCase, ServiceError> {
    let input = ReturnInput::from_form(fields)?;
    ctx.returns().update(id, input).await
}

/// Save a return: status, losses, resolution.
#[instrument(skip(state, pairs))]
async fn update(
    State(state): State<AppState>,
    Path(id): Path<ReturnCaseId>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let fields = FormFields::new(pairs);
    let settings = state.settings().await?;

    match update_return(state.context(&settings), id, &fields).await {
        Ok(case) => Ok(redirect_success(
            PATH,
            &format!("Return for {} is {}", case.order_id, case.status),
        )
        .into_response()),
        Err(error) => {
            let errors = form_errors(error)?;
            unprocessable(&ReturnFormTemplate::new(
                PageMeta::new(&settings, PATH, FlashQuery::default()),
                "Edit return".to_string(),
                format!("/returns/{id}"),
                FormView::rejected(fields, errors),
            ))
        }
    }
}

/// Delete a return.
#[instrument(skip(state))]
async fn delete(
    State(state): State<AppState>,
    Path(id): Path<ReturnCaseId>,
) -> Result<Response, AppError> {
    let settings = state.settings().await?;
    state.context(&settings).returns().delete(id).await?;
    Ok(redirect_success(PATH, "Return deleted").into_response())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_row_and_form() {
        let now = Utc::now();
        let case = ReturnCase {
            id: ReturnCaseId::generate(),
            sale_id: None,
            order_id: "E-9".to_string(),
            reason: Some("Wrong size".to_string()),
            status: ReturnStatus::InProgress,
            date_opened: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap_or_default(),
            date_closed: None,
            expected_loss: dec!(5),
            actual_loss: None,
            resolution_notes: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        let row = ReturnRow::new(&case, CurrencyCode::USD);
        assert!(!row.linked);
        assert_eq!(row.expected_loss, "$5.00");
        assert_eq!(row.actual_loss, "");

        let form = return_form(&case);
        assert!(form.selected("status", "In Progress"));
        assert_eq!(form.value("expected_loss"), "5.00");
        assert_eq!(form.value("date_opened"), "2024-06-01");
    }
}
