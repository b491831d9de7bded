//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                  - Liveness
//! GET  /health/ready            - Store reachable
//!
//! # Dashboard
//! GET  /                        - Overview
//!
//! # Inventory
//! GET  /inventory               - List (status, brand, category, platform, from, to, q)
//! GET  /inventory/new           - New item form
//! POST /inventory               - Create item
//! GET  /inventory/export        - CSV download
//! GET  /inventory/{id}/edit     - Edit form
//! POST /inventory/{id}          - Update item
//! POST /inventory/{id}/delete   - Delete item
//!
//! # Sales
//! GET  /sales                   - List with totals (platform, payout_status, from, to)
//! GET  /sales/new               - Record sale form
//! POST /sales                   - Record sale
//! GET  /sales/export            - CSV download
//! GET  /sales/{id}/edit         - Edit form
//! POST /sales/{id}              - Update sale
//! POST /sales/{id}/delete       - Delete sale and its shipments
//!
//! # Shipping
//! GET  /shipping                - List (status, carrier, pending)
//! POST /shipping                - Create for a sale
//! POST /shipping/{id}           - Update
//! POST /shipping/{id}/delete    - Delete
//!
//! # Returns
//! GET  /returns                 - List (status, open)
//! GET  /returns/new             - Open return form
//! POST /returns                 - Open return
//! GET  /returns/{id}/edit       - Edit form
//! POST /returns/{id}            - Update
//! POST /returns/{id}/delete     - Delete
//!
//! # Tasks
//! GET  /tasks                   - List (status, priority, category, pending)
//! POST /tasks                   - Create
//! GET  /tasks/{id}/edit         - Edit form
//! POST /tasks/{id}              - Full update, or status change alone
//! POST /tasks/{id}/delete       - Delete
//!
//! # Settings
//! GET  /settings                - Settings page
//! POST /settings                - Update settings
//! ```

pub mod dashboard;
pub mod inventory;
pub mod returns;
pub mod sales;
pub mod settings;
pub mod shipping;
pub mod tasks;

use askama::Template;
use axum::{
    Router,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use flipledger_core::validation::DATE_FORMAT;
use flipledger_core::{CurrencyCode, Price, ValidationError};

use crate::error::AppError;
use crate::models::{AppSettings, FormFields, Page};
use crate::services::ServiceError;
use crate::services::export::CsvFile;
use crate::state::AppState;

/// Build the page router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(dashboard::router())
        .merge(inventory::router())
        .merge(sales::router())
        .merge(shipping::router())
        .merge(returns::router())
        .merge(tasks::router())
        .merge(settings::router())
}

// =============================================================================
// Flash messages
// =============================================================================

/// Banner text carried across a redirect.
#[derive(Debug, Default, Deserialize)]
pub struct FlashQuery {
    pub success: Option<String>,
    pub error: Option<String>,
}

/// Redirect to `path` with a success banner.
#[must_use]
pub fn redirect_success(path: &str, message: &str) -> Redirect {
    Redirect::to(&format!("{path}?success={}", urlencoding::encode(message)))
}

// =============================================================================
// Rendering
// =============================================================================

/// Render a page.
///
/// # Errors
///
/// Returns [`AppError::Template`] if rendering fails.
pub fn render(template: &impl Template) -> Result<Html<String>, AppError> {
    Ok(Html(template.render()?))
}

/// Render a page for a rejected submission.
///
/// # Errors
///
/// Returns [`AppError::Template`] if rendering fails.
pub fn unprocessable(template: &impl Template) -> Result<Response, AppError> {
    Ok((StatusCode::UNPROCESSABLE_ENTITY, render(template)?).into_response())
}

/// Serve an export as a download.
#[must_use]
pub fn csv_download(file: CsvFile) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.filename),
            ),
        ],
        file.body,
    )
        .into_response()
}

/// The field errors a form can show for a failed submission.
///
/// # Errors
///
/// Returns the failure unchanged when it is not about the submitted values.
pub fn form_errors(error: ServiceError) -> Result<ValidationError, AppError> {
    match error {
        ServiceError::Validation(errors) => Ok(errors),
        other => Err(other.into()),
    }
}

/// Like [`form_errors`], also reporting a missing `linked` record (say, an
/// unknown SKU) against `field`.
///
/// # Errors
///
/// Returns the failure unchanged when it is not about the submitted values.
pub fn linked_form_errors(
    error: ServiceError,
    linked: &str,
    field: &str,
) -> Result<ValidationError, AppError> {
    match error {
        ServiceError::NotFound(missing) if missing.entity == linked => Ok(ValidationError::field(
            field,
            format!("no {} matches {:?}", missing.entity, missing.key),
        )),
        other => form_errors(other),
    }
}

// =============================================================================
// Page chrome
// =============================================================================

/// What the layout needs on every page.
#[derive(Debug, Clone)]
pub struct PageMeta {
    pub app_name: String,
    pub app_version: String,
    /// Highlights the matching navigation entry.
    pub current_path: &'static str,
    pub success_message: Option<String>,
    pub error_message: Option<String>,
}

impl PageMeta {
    #[must_use]
    pub fn new(settings: &AppSettings, current_path: &'static str, flash: FlashQuery) -> Self {
        Self {
            app_name: settings.app_name.clone(),
            app_version: settings.app_version.clone(),
            current_path,
            success_message: flash.success.filter(|m| !m.trim().is_empty()),
            error_message: flash.error.filter(|m| !m.trim().is_empty()),
        }
    }

    /// Replace any banner with `message`.
    #[must_use]
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.success_message = None;
        self.error_message = Some(message.into());
        self
    }
}

/// Link to the page after `page`, keeping every other query parameter.
///
/// `None` once a short page shows there is nothing more.
#[must_use]
pub fn next_page_link(path: &str, query: &[(String, String)], page: Page, rows: usize) -> Option<String> {
    if rows < page.limit as usize {
        return None;
    }
    let mut params: Vec<String> = query
        .iter()
        .filter(|(key, _)| !matches!(key.as_str(), "offset" | "success" | "error"))
        .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
        .collect();
    params.push(format!("offset={}", page.offset + page.limit));
    Some(format!("{path}?{}", params.join("&")))
}

// =============================================================================
// Forms
// =============================================================================

/// Values and per-field messages for an HTML form.
#[derive(Debug, Clone, Default)]
pub struct FormView {
    fields: FormFields,
    errors: ValidationError,
}

impl FormView {
    /// Prefilled, with no errors.
    #[must_use]
    pub fn filled(fields: FormFields) -> Self {
        Self {
            fields,
            errors: ValidationError::default(),
        }
    }

    /// A submission that was rejected.
    #[must_use]
    pub const fn rejected(fields: FormFields, errors: ValidationError) -> Self {
        Self { fields, errors }
    }

    /// Submitted value of `name`, blank when absent.
    #[must_use]
    pub fn value(&self, name: &str) -> &str {
        self.fields.get(name).unwrap_or_default()
    }

    /// Whether `value` is among the values submitted for `name`.
    #[must_use]
    pub fn checked(&self, name: &str, value: &str) -> bool {
        self.fields
            .all(name)
            .any(|submitted| submitted.eq_ignore_ascii_case(value))
    }

    /// Whether `name` currently holds `value`, for `<option selected>`.
    #[must_use]
    pub fn selected(&self, name: &str, value: &str) -> bool {
        self.fields
            .get(name)
            .is_some_and(|submitted| submitted.trim().eq_ignore_ascii_case(value))
    }

    /// Checkbox state.
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        self.fields.checkbox(name)
    }

    /// Message for `name`, if it was rejected.
    #[must_use]
    pub fn error(&self, name: &str) -> Option<&str> {
        self.errors.message_for(name)
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Every message, for the summary above the form.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.errors.errors().iter().map(ToString::to_string).collect()
    }
}

/// Accumulates `(name, value)` pairs for prefilling an edit form.
#[derive(Debug, Default)]
pub struct Prefill {
    pairs: Vec<(String, String)>,
}

impl Prefill {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text(mut self, name: &str, value: impl ToString) -> Self {
        self.pairs.push((name.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn opt(self, name: &str, value: Option<&str>) -> Self {
        self.text(name, value.unwrap_or_default())
    }

    #[must_use]
    pub fn money(self, name: &str, value: Option<Decimal>) -> Self {
        self.text(name, value.map(|v| format!("{v:.2}")).unwrap_or_default())
    }

    #[must_use]
    pub fn date(self, name: &str, value: Option<NaiveDate>) -> Self {
        self.text(name, date_text(value))
    }

    #[must_use]
    pub fn flag(self, name: &str, on: bool) -> Self {
        if on { self.text(name, "on") } else { self }
    }

    #[must_use]
    pub fn finish(self) -> FormView {
        FormView::filled(FormFields::new(self.pairs))
    }
}

// =============================================================================
// Formatting
// =============================================================================

/// Labels of every variant, for `<select>` options.
#[must_use]
pub fn labels<T: Copy>(all: &[T], label: fn(T) -> &'static str) -> Vec<&'static str> {
    all.iter().map(|&v| label(v)).collect()
}

/// Amount with the configured currency symbol.
#[must_use]
pub fn money(amount: Decimal, currency: CurrencyCode) -> String {
    Price::new(amount, currency).display()
}

/// Optional amount; blank when missing.
#[must_use]
pub fn money_opt(amount: Option<Decimal>, currency: CurrencyCode) -> String {
    amount.map(|a| money(a, currency)).unwrap_or_default()
}

/// `YYYY-MM-DD`; blank when missing.
#[must_use]
pub fn date_text(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}
