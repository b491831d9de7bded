//! Shipping route handlers.
//!
//! Shipments are created and edited inline on the list page, so a rejected
//! submission re-renders the list with the problem in the error banner.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use tracing::instrument;

use flipledger_core::{CurrencyCode, ShipmentId, ShipmentStatus, ValidationError};

use super::{
    FlashQuery, FormView, PageMeta, Prefill, date_text, form_errors, labels, linked_form_errors,
    money, next_page_link, redirect_success, render, unprocessable,
};
use crate::error::AppError;
use crate::filters;
use crate::models::shipment::sale_id_from_form;
use crate::models::{
    AppSettings, FormFields, Page, PageQuery, SaleFilter, Shipment, ShipmentInput,
    ShipmentListing, ShipmentQuery,
};
use crate::services::{ServiceContext, ServiceError};
use crate::state::AppState;

const PATH: &str = "/shipping";

/// Sales offered in the new-shipment dropdown.
const SALE_CHOICES: u32 = 100;

// =============================================================================
// Views
// =============================================================================

/// One shipment with its inline edit form.
#[derive(Debug, Clone)]
pub struct ShipmentRow {
    pub id: String,
    pub order_id: String,
    pub item_name: String,
    pub buyer_name: String,
    pub status: &'static str,
    pub label_cost: String,
    pub dispatch_deadline: String,
    pub overdue: bool,
    pub form: FormView,
}

impl ShipmentRow {
    #[must_use]
    pub fn new(listing: &ShipmentListing, currency: CurrencyCode, today: NaiveDate) -> Self {
        let shipment = &listing.shipment;
        Self {
            id: shipment.id.to_string(),
            order_id: listing.order_id.clone(),
            item_name: listing.item_name.clone().unwrap_or_default(),
            buyer_name: listing.buyer_name.clone().unwrap_or_default(),
            status: shipment.status.label(),
            label_cost: money(shipment.label_cost, currency),
            dispatch_deadline: date_text(shipment.dispatch_deadline),
            overdue: shipment.is_overdue(today),
            form: shipment_form(shipment),
        }
    }
}

/// A sale a new shipment can be attached to.
#[derive(Debug, Clone)]
pub struct SaleChoice {
    pub id: String,
    pub label: String,
}

/// Shipping list page.
#[derive(Template)]
#[template(path = "shipping/index.html")]
pub struct ShippingListTemplate {
    pub page: PageMeta,
    pub rows: Vec<ShipmentRow>,
    pub filter: FormView,
    pub statuses: Vec<&'static str>,
    pub sales: Vec<SaleChoice>,
    /// The new-shipment form.
    pub form: FormView,
    pub next_page: Option<String>,
}

fn shipment_form(shipment: &Shipment) -> FormView {
    Prefill::new()
        .opt("carrier", shipment.carrier.as_deref())
        .opt("tracking_number", shipment.tracking_number.as_deref())
        .money("label_cost", Some(shipment.label_cost))
        .date("dispatch_deadline", shipment.dispatch_deadline)
        .text("status", shipment.status.label())
        .date("shipped_date", shipment.shipped_date)
        .date("delivered_date", shipment.delivered_date)
        .opt("notes", shipment.notes.as_deref())
        .finish()
}

fn blank_form() -> FormView {
    Prefill::new()
        .text("status", ShipmentStatus::default().label())
        .finish()
}

/// Build the shipping router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(PATH, get(list).post(create))
        .route("/shipping/{id}", post(update))
        .route("/shipping/{id}/delete", post(delete))
}

// =============================================================================
// Handlers
// =============================================================================

async fn list_page(
    state: &AppState,
    settings: &AppSettings,
    raw: Vec<(String, String)>,
    query: &ShipmentQuery,
    page: Page,
    meta: PageMeta,
    form: FormView,
) -> Result<ShippingListTemplate, AppError> {
    let filter = query.to_filter()?;
    let ctx = state.context(settings);
    let shipment_service = ctx.shipments();
    let sale_service = ctx.sales();
    let sale_filter = SaleFilter::default();
    let (shipments, (sales, _)) = tokio::try_join!(
        shipment_service.list(&filter, page),
        sale_service.list(&sale_filter, Page::first(SALE_CHOICES)),
    )?;

    let today = state.today();
    Ok(ShippingListTemplate {
        page: meta,
        next_page: next_page_link(PATH, &raw, page, shipments.len()),
        rows: shipments
            .iter()
            .map(|listing| ShipmentRow::new(listing, settings.currency, today))
            .collect(),
        filter: FormView::filled(FormFields::new(raw)),
        statuses: labels(ShipmentStatus::ALL, ShipmentStatus::label),
        sales: sales
            .iter()
            .map(|sale| SaleChoice {
                id: sale.id.to_string(),
                label: match &sale.item_name {
                    Some(name) => format!("{} - {name}", sale.order_id),
                    None => sale.order_id.clone(),
                },
            })
            .collect(),
        form,
    })
}

/// Filtered shipment list.
#[instrument(skip(state, raw))]
async fn list(
    State(state): State<AppState>,
    Query(raw): Query<Vec<(String, String)>>,
    Query(query): Query<ShipmentQuery>,
    Query(paging): Query<PageQuery>,
    Query(flash): Query<FlashQuery>,
) -> Result<Html<String>, AppError> {
    let settings = state.settings().await?;
    let meta = PageMeta::new(&settings, PATH, flash);
    let template =
        list_page(&state, &settings, raw, &query, paging.into(), meta, blank_form()).await?;
    render(&template)
}

/// Re-render the list after a rejected inline form.
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
        &ShipmentQuery::default(),
        Page::default(),
        meta,
        form,
    )
    .await?;
    unprocessable(&template)
}

async fn create_shipment(
    ctx: ServiceContext<'_>,
    fields: &FormFields,
) -> Result<Shipment, ServiceError> {
    let sale_id = sale_id_from_form(fields)?;
    let input = ShipmentInput::from_form(fields)?;
    ctx.shipments().create(sale_id, input).await
}

/// Create a shipment for a sale.
#[instrument(skip(state, pairs))]
async fn create(
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let fields = FormFields::new(pairs);
    let settings = state.settings().await?;

    match create_shipment(state.context(&settings), &fields).await {
        Ok(shipment) => {
            let message = match shipment.dispatch_deadline {
                Some(deadline) => format!("Shipment added; dispatch by {}", date_text(Some(deadline))),
                None => "Shipment added".to_string(),
            };
            Ok(redirect_success(PATH, &message).into_response())
        }
        Err(error) => {
            let errors = linked_form_errors(error, "sale", "sale_id")?;
            rejected(&state, &settings, FormView::rejected(fields, errors.clone()), &errors).await
        }
    }
}

async fn update_shipment(
    ctx: ServiceContext<'_>,
    id: ShipmentId,
    fields: &FormFields,
) -> Result<Shipment, ServiceError> {
    let input = ShipmentInput::from_form(fields)?;
    ctx.shipments().update(id, input).await
}

/// Save an inline shipment edit.
#[instrument(skip(state, pairs))]
async fn update(
    State(state): State<AppState>,
    Path(id): Path<ShipmentId>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let fields = FormFields::new(pairs);
    let settings = state.settings().await?;

    match update_shipment(state.context(&settings), id, &fields).await {
        Ok(shipment) => Ok(redirect_success(
            PATH,
            &format!("Shipment is now {}", shipment.status),
        )
        .into_response()),
        Err(error) => {
            let errors = form_errors(error)?;
            rejected(&state, &settings, blank_form(), &errors).await
        }
    }
}

/// Delete a shipment.
#[instrument(skip(state))]
async fn delete(
    State(state): State<AppState>,
    Path(id): Path<ShipmentId>,
) -> Result<Response, AppError> {
    let settings = state.settings().await?;
    state.context(&settings).shipments().delete(id).await?;
    Ok(redirect_success(PATH, "Shipment deleted").into_response())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use flipledger_core::SaleId;

    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap_or_default()
    }

    #[test]
    fn test_row_flags_overdue() {
        let now = Utc::now();
        let listing = ShipmentListing {
            shipment: Shipment {
                id: ShipmentId::generate(),
                sale_id: SaleId::generate(),
                carrier: Some("Evri".to_string()),
                tracking_number: None,
                label_cost: dec!(3.20),
                dispatch_deadline: Some(day(12)),
                status: ShipmentStatus::LabelCreated,
                shipped_date: None,
                delivered_date: None,
                notes: None,
                created_at: now,
                updated_at: now,
            },
            order_id: "V-1".to_string(),
            item_name: None,
            buyer_name: Some("Sam".to_string()),
        };
        let row = ShipmentRow::new(&listing, CurrencyCode::GBP, day(15));
        assert!(row.overdue);
        assert_eq!(row.label_cost, "£3.20");
        assert_eq!(row.form.value("carrier"), "Evri");
        assert!(row.form.selected("status", "Label Created"));

        let on_time = ShipmentRow::new(&listing, CurrencyCode::GBP, day(12));
        assert!(!on_time.overdue);
    }
}
