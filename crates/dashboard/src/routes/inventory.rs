//! Inventory route handlers.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use tracing::instrument;

use flipledger_core::{
    CurrencyCode, DeleteReport, InventoryItemId, ListingStatus, Platform, ShippingPayer,
};

use super::{
    FlashQuery, FormView, PageMeta, Prefill, csv_download, date_text, form_errors, labels, money,
    money_opt, next_page_link, redirect_success, render, unprocessable,
};
use crate::error::AppError;
use crate::filters;
use crate::models::{FormFields, InventoryInput, InventoryItem, InventoryQuery, Page, PageQuery};
use crate::services::{ServiceContext, ServiceError};
use crate::state::AppState;

const PATH: &str = "/inventory";

// =============================================================================
// Views
// =============================================================================

/// One inventory row, formatted for display.
#[derive(Debug, Clone)]
pub struct InventoryRow {
    pub id: String,
    pub sku: String,
    pub item_name: String,
    pub brand: String,
    pub category: String,
    pub platforms: String,
    pub status: &'static str,
    pub purchase_price: String,
    pub sale_price: String,
    pub profit: String,
    /// Blank when there is no sale price or the purchase price is zero.
    pub roi: String,
    pub date_purchased: String,
    pub storage_location: String,
}

impl InventoryRow {
    #[must_use]
    pub fn new(item: &InventoryItem, currency: CurrencyCode) -> Self {
        Self {
            id: item.id.to_string(),
            sku: item.sku.clone(),
            item_name: item.item_name.clone(),
            brand: item.brand.clone().unwrap_or_default(),
            category: item.category.clone().unwrap_or_default(),
            platforms: item
                .platforms
                .iter()
                .map(|p| p.label())
                .collect::<Vec<_>>()
                .join(", "),
            status: item.listing_status.label(),
            purchase_price: money(item.purchase_price, currency),
            sale_price: money_opt(item.sale_price, currency),
            profit: money_opt(item.profit, currency),
            roi: item.roi_percent.map(|r| format!("{r:.2}%")).unwrap_or_default(),
            date_purchased: date_text(item.date_purchased),
            storage_location: item.storage_location.clone().unwrap_or_default(),
        }
    }
}

/// Inventory list page.
#[derive(Template)]
#[template(path = "inventory/index.html")]
pub struct InventoryListTemplate {
    pub page: PageMeta,
    pub rows: Vec<InventoryRow>,
    /// Current filter values.
    pub filter: FormView,
    pub statuses: Vec<&'static str>,
    pub platforms: Vec<&'static str>,
    pub brands: Vec<String>,
    pub next_page: Option<String>,
}

/// New/edit item page.
#[derive(Template)]
#[template(path = "inventory/form.html")]
pub struct InventoryFormTemplate {
    pub page: PageMeta,
    pub heading: String,
    pub action: String,
    pub form: FormView,
    pub statuses: Vec<&'static str>,
    pub platforms: Vec<&'static str>,
    pub payers: Vec<&'static str>,
}

impl InventoryFormTemplate {
    fn new(page: PageMeta, heading: String, action: String, form: FormView) -> Self {
        Self {
            page,
            heading,
            action,
            form,
            statuses: labels(ListingStatus::ALL, ListingStatus::label),
            platforms: labels(Platform::ALL, Platform::label),
            payers: labels(ShippingPayer::ALL, ShippingPayer::label),
        }
    }
}

/// Prefill the edit form from a stored item.
fn item_form(item: &InventoryItem) -> FormView {
    let mut prefill = Prefill::new()
        .text("sku", &item.sku)
        .text("item_name", &item.item_name)
        .opt("category", item.category.as_deref())
        .opt("size", item.size.as_deref())
        .opt("condition", item.condition.as_deref())
        .opt("brand", item.brand.as_deref())
        .text("listing_status", item.listing_status.label())
        .money("purchase_price", Some(item.purchase_price))
        .money("fees_estimate", Some(item.fees_estimate))
        .money("shipping_cost", Some(item.shipping_cost))
        .text("shipping_paid_by", item.shipping_payer.label())
        .money("sale_price", item.sale_price)
        .date("date_purchased", item.date_purchased)
        .date("date_listed", item.date_listed)
        .date("date_sold", item.date_sold)
        .opt("storage_location", item.storage_location.as_deref())
        .opt("notes", item.notes.as_deref())
        .text("photos", item.photos.join("\n"));
    for platform in &item.platforms {
        prefill = prefill.text("platforms", platform.label());
    }
    prefill.finish()
}

fn deleted_message(sku: &str, report: DeleteReport) -> String {
    match report.detached {
        0 => format!("Deleted {sku}"),
        n => format!("Deleted {sku}; {n} linked record(s) kept without it"),
    }
}

/// Build the inventory router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(PATH, get(list).post(create))
        .route("/inventory/new", get(new_form))
        .route("/inventory/export", get(export))
        .route("/inventory/{id}/edit", get(edit_form))
        .route("/inventory/{id}", post(update))
        .route("/inventory/{id}/delete", post(delete))
}

// =============================================================================
// Handlers
// =============================================================================

/// Filtered inventory list.
#[instrument(skip(state, raw))]
async fn list(
    State(state): State<AppState>,
    Query(raw): Query<Vec<(String, String)>>,
    Query(query): Query<InventoryQuery>,
    Query(paging): Query<PageQuery>,
    Query(flash): Query<FlashQuery>,
) -> Result<Html<String>, AppError> {
    let filter = query.to_filter()?;
    let page = Page::from(paging);
    let settings = state.settings().await?;
    let inventory = state.context(&settings).inventory();
    let (items, brands) = tokio::try_join!(inventory.list(&filter, page), inventory.brands())?;

    let template = InventoryListTemplate {
        page: PageMeta::new(&settings, PATH, flash),
        next_page: next_page_link(PATH, &raw, page, items.len()),
        rows: items
            .iter()
            .map(|item| InventoryRow::new(item, settings.currency))
            .collect(),
        filter: FormView::filled(FormFields::new(raw)),
        statuses: labels(ListingStatus::ALL, ListingStatus::label),
        platforms: labels(Platform::ALL, Platform::label),
        brands,
    };
    render(&template)
}

/// Empty item form.
async fn new_form(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let settings = state.settings().await?;
    let form = Prefill::new()
        .text("listing_status", ListingStatus::default().label())
        .text("shipping_paid_by", ShippingPayer::default().label())
        .date("date_purchased", Some(state.today()))
        .finish();
    render(&InventoryFormTemplate::new(
        PageMeta::new(&settings, PATH, FlashQuery::default()),
        "New item".to_string(),
        PATH.to_string(),
        form,
    ))
}

async fn create_item(
    ctx: ServiceContext<'_>,
    fields: &FormFields,
) -> Result<InventoryItem, ServiceError> {
    let input = InventoryInput::from_form(fields)?;
    ctx.inventory().create(input).await
}

/// Create an item.
#[instrument(skip(state, pairs))]
async fn create(
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let fields = FormFields::new(pairs);
    let settings = state.settings().await?;

    match create_item(state.context(&settings), &fields).await {
        Ok(item) => Ok(redirect_success(PATH, &format!("Added {}", item.sku)).into_response()),
        Err(error) => {
            let errors = form_errors(error)?;
            unprocessable(&InventoryFormTemplate::new(
                PageMeta::new(&settings, PATH, FlashQuery::default()),
                "New item".to_string(),
                PATH.to_string(),
                FormView::rejected(fields, errors),
            ))
        }
    }
}

/// Edit form for an existing item.
#[instrument(skip(state))]
async fn edit_form(
    State(state): State<AppState>,
    Path(id): Path<InventoryItemId>,
) -> Result<Html<String>, AppError> {
    let settings = state.settings().await?;
    let item = state.context(&settings).inventory().get(id).await?;
    render(&InventoryFormTemplate::new(
        PageMeta::new(&settings, PATH, FlashQuery::default()),
        format!("Edit {}", item.sku),
        format!("/inventory/{id}"),
        item_form(&item),
    ))
}

async fn update_item(
    ctx: ServiceContext<'_>,
    id: InventoryItemId,
    fields: &FormFields,
) -> Result<InventoryItem, ServiceError> {
    let input = InventoryInput::from_form(fields)?;
    ctx.inventory().update(id, input).await
}

/// Save an edited item.
#[instrument(skip(state, pairs))]
async fn update(
    State(state): State<AppState>,
    Path(id): Path<InventoryItemId>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let fields = FormFields::new(pairs);
    let settings = state.settings().await?;

    match update_item(state.context(&settings), id, &fields).await {
        Ok(item) => Ok(redirect_success(PATH, &format!("Saved {}", item.sku)).into_response()),
        Err(error) => {
            let errors = form_errors(error)?;
            unprocessable(&InventoryFormTemplate::new(
                PageMeta::new(&settings, PATH, FlashQuery::default()),
                "Edit item".to_string(),
                format!("/inventory/{id}"),
                FormView::rejected(fields, errors),
            ))
        }
    }
}

/// Delete an item; its sales and tasks stay, unlinked.
#[instrument(skip(state))]
async fn delete(
    State(state): State<AppState>,
    Path(id): Path<InventoryItemId>,
) -> Result<Response, AppError> {
    let settings = state.settings().await?;
    let inventory = state.context(&settings).inventory();
    let item = inventory.get(id).await?;
    let report = inventory.delete(id).await?;
    Ok(redirect_success(PATH, &deleted_message(&item.sku, report)).into_response())
}

/// Every item as CSV.
#[instrument(skip(state))]
async fn export(State(state): State<AppState>) -> Result<Response, AppError> {
    let settings = state.settings().await?;
    let file = state.context(&settings).export().inventory_csv().await?;
    Ok(csv_download(file))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_row_formats_money_and_roi() {
        let mut input = InventoryInput {
            sku: "SKU1".to_string(),
            item_name: "Jacket".to_string(),
            platforms: vec![Platform::Vinted, Platform::Ebay],
            purchase_price: dec!(10.00),
            fees_estimate: dec!(1.00),
            shipping_cost: dec!(2.00),
            sale_price: Some(dec!(25.00)),
            ..InventoryInput::default()
        };
        let item = InventoryItem::from_input(input.clone(), chrono::Utc::now()).unwrap();
        let row = InventoryRow::new(&item, CurrencyCode::GBP);
        assert_eq!(row.profit, "£12.00");
        assert_eq!(row.roi, "120.00%");
        assert_eq!(row.platforms, "Vinted, eBay");

        input.purchase_price = dec!(0);
        let free = InventoryItem::from_input(input, chrono::Utc::now()).unwrap();
        assert_eq!(InventoryRow::new(&free, CurrencyCode::GBP).roi, "");
    }

    #[test]
    fn test_item_form_round_trips_through_input() {
        let input = InventoryInput {
            sku: "SKU2".to_string(),
            item_name: "Boots".to_string(),
            platforms: vec![Platform::Depop],
            listing_status: ListingStatus::Listed,
            purchase_price: dec!(8.50),
            photos: vec!["a.jpg".to_string(), "b.jpg".to_string()],
            ..InventoryInput::default()
        };
        let item = InventoryItem::from_input(input.clone(), chrono::Utc::now()).unwrap();
        let form = item_form(&item);
        assert!(form.checked("platforms", "Depop"));
        assert!(form.selected("listing_status", "Listed"));
        assert_eq!(form.value("photos"), "a.jpg\nb.jpg");
    }

    #[test]
    fn test_deleted_message_mentions_unlinked_records() {
        let report = DeleteReport {
            detached: 2,
            cascaded: 0,
        };
        assert_eq!(
            deleted_message("SKU1", report),
            "Deleted SKU1; 2 linked record(s) kept without it"
        );
        assert_eq!(deleted_message("SKU1", DeleteReport::default()), "Deleted SKU1");
    }
}
