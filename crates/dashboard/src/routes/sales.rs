//! Sales route handlers.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::instrument;

use flipledger_core::{CurrencyCode, PayoutStatus, Platform, SaleId};

use super::{
    FlashQuery, FormView, PageMeta, Prefill, csv_download, date_text, labels, linked_form_errors,
    money, next_page_link, redirect_success, render, unprocessable,
};
use crate::error::AppError;
use crate::filters;
use crate::models::{FormFields, Page, PageQuery, Sale, SaleInput, SaleQuery};
use crate::services::{ServiceContext, ServiceError};
use crate::state::AppState;

const PATH: &str = "/sales";
const LINKED: &str = "inventory item";

// =============================================================================
// Views
// =============================================================================

/// One sale row, formatted for display.
#[derive(Debug, Clone)]
pub struct SaleRow {
    pub id: String,
    pub order_id: String,
    pub item_name: String,
    pub platform: &'static str,
    pub sale_price: String,
    pub fees: String,
    pub net_profit: String,
    pub date_sold: String,
    pub shipped_date: String,
    pub payout_status: &'static str,
    pub buyer: String,
}

impl SaleRow {
    #[must_use]
    pub fn new(sale: &Sale, currency: CurrencyCode) -> Self {
        Self {
            id: sale.id.to_string(),
            order_id: sale.order_id.clone(),
            item_name: sale.item_name.clone().unwrap_or_default(),
            platform: sale.platform.label(),
            sale_price: money(sale.sale_price, currency),
            fees: money(sale.platform_fees + sale.payment_processing_fees, currency),
            net_profit: money(sale.net_profit, currency),
            date_sold: date_text(Some(sale.date_sold)),
            shipped_date: date_text(sale.shipped_date),
            payout_status: sale.payout_status.label(),
            buyer: sale
                .buyer_name
                .clone()
                .or_else(|| sale.buyer_username.clone())
                .unwrap_or_default(),
        }
    }
}

/// Sales list page.
#[derive(Template)]
#[template(path = "sales/index.html")]
pub struct SalesListTemplate {
    pub page: PageMeta,
    pub rows: Vec<SaleRow>,
    pub revenue: String,
    pub net_profit: String,
    pub filter: FormView,
    pub platforms: Vec<&'static str>,
    pub payout_statuses: Vec<&'static str>,
    pub next_page: Option<String>,
}

/// Record/edit sale page.
#[derive(Template)]
#[template(path = "sales/form.html")]
pub struct SaleFormTemplate {
    pub page: PageMeta,
    pub heading: String,
    pub action: String,
    pub form: FormView,
    pub platforms: Vec<&'static str>,
    pub payout_statuses: Vec<&'static str>,
}

impl SaleFormTemplate {
    fn new(page: PageMeta, heading: String, action: String, form: FormView) -> Self {
        Self {
            page,
            heading,
            action,
            form,
            platforms: labels(Platform::ALL, Platform::label),
            payout_statuses: labels(PayoutStatus::ALL, PayoutStatus::label),
        }
    }
}

/// Prefill the edit form from a stored sale.
fn sale_form(sale: &Sale, inventory_sku: Option<&str>) -> FormView {
    Prefill::new()
        .text("order_id", &sale.order_id)
        .opt("inventory_sku", inventory_sku)
        .text("platform", sale.platform.label())
        .opt("item_name", sale.item_name.as_deref())
        .money("sale_price", Some(sale.sale_price))
        .money("platform_fees", Some(sale.platform_fees))
        .money("payment_processing_fees", Some(sale.payment_processing_fees))
        .money("shipping_cost", Some(sale.shipping_cost))
        .flag("buyer_paid_shipping", sale.buyer_paid_shipping)
        .date("date_sold", Some(sale.date_sold))
        .date("shipped_date", sale.shipped_date)
        .opt("tracking_number", sale.tracking_number.as_deref())
        .text("payout_status", sale.payout_status.label())
        .opt("buyer_name", sale.buyer_name.as_deref())
        .opt("buyer_username", sale.buyer_username.as_deref())
        .opt("notes", sale.notes.as_deref())
        .finish()
}

/// Build the sales router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(PATH, get(list).post(create))
        .route("/sales/new", get(new_form))
        .route("/sales/export", get(export))
        .route("/sales/{id}/edit", get(edit_form))
        .route("/sales/{id}", post(update))
        .route("/sales/{id}/delete", post(delete))
}

// =============================================================================
// Handlers
// =============================================================================

/// Filtered sales list with totals over the rows shown.
#[instrument(skip(state, raw))]
async fn list(
    State(state): State<AppState>,
    Query(raw): Query<Vec<(String, String)>>,
    Query(query): Query<SaleQuery>,
    Query(paging): Query<PageQuery>,
    Query(flash): Query<FlashQuery>,
) -> Result<Html<String>, AppError> {
    let filter = query.to_filter()?;
    let page = Page::from(paging);
    let settings = state.settings().await?;
    let (sales, totals) = state.context(&settings).sales().list(&filter, page).await?;
    let currency = settings.currency;

    let template = SalesListTemplate {
        page: PageMeta::new(&settings, PATH, flash),
        next_page: next_page_link(PATH, &raw, page, sales.len()),
        rows: sales.iter().map(|sale| SaleRow::new(sale, currency)).collect(),
        revenue: money(totals.revenue, currency),
        net_profit: money(totals.net_profit, currency),
        filter: FormView::filled(FormFields::new(raw)),
        platforms: labels(Platform::ALL, Platform::label),
        payout_statuses: labels(PayoutStatus::ALL, PayoutStatus::label),
    };
    render(&template)
}

/// `?sku=` preselects the item being sold.
#[derive(Debug, Default, Deserialize)]
pub struct NewSaleParams {
    pub sku: Option<String>,
}

/// Empty sale form.
async fn new_form(
    State(state): State<AppState>,
    Query(params): Query<NewSaleParams>,
) -> Result<Html<String>, AppError> {
    let settings = state.settings().await?;
    let form = Prefill::new()
        .opt("inventory_sku", params.sku.as_deref())
        .text("payout_status", PayoutStatus::default().label())
        .date("date_sold", Some(state.today()))
        .finish();
    render(&SaleFormTemplate::new(
        PageMeta::new(&settings, PATH, FlashQuery::default()),
        "Record sale".to_string(),
        PATH.to_string(),
        form,
    ))
}

async fn record_sale(ctx: ServiceContext<'_>, fields: &FormFields) -> Result<Sale, ServiceError> {
    let input = SaleInput::from_form(fields)?;
    ctx.sales().record(input).await
}

/// Record a sale.
#[instrument(skip(state, pairs))]
async fn create(
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let fields = FormFields::new(pairs);
    let settings = state.settings().await?;

    match record_sale(state.context(&settings), &fields).await {
        Ok(sale) => Ok(redirect_success(
            PATH,
            &format!(
                "Recorded {}: net profit {}",
                sale.order_id,
                money(sale.net_profit, settings.currency)
            ),
        )
        .into_response()),
        Err(error) => {
            let errors = linked_form_errors(error, LINKED, "inventory_sku")?;
            unprocessable(&SaleFormTemplate::new(
                PageMeta::new(&settings, PATH, FlashQuery::default()),
                "Record sale".to_string(),
                PATH.to_string(),
                FormView::rejected(fields, errors),
            ))
        }
    }
}

/// Edit form for an existing sale.
#[instrument(skip(state))]
async fn edit_form(
    State(state): State<AppState>,
    Path(id): Path<SaleId>,
) -> Result<Html<String>, AppError> {
    let settings = state.settings().await?;
    let sales = state.context(&settings).sales();
    let sale = sales.get(id).await?;
    let sku = sales.linked_sku(&sale).await?;
    render(&SaleFormTemplate::new(
        PageMeta::new(&settings, PATH, FlashQuery::default()),
        format!("Edit sale {}", sale.order_id),
        format!("/sales/{id}"),
        sale_form(&sale, sku.as_deref()),
    ))
}

async fn update_sale(
    ctx: ServiceContext<'_>,
    id: SaleId,
    fields: &FormFields,
) -> Result<Sale, ServiceError> {
    let input = SaleInput::from_form(fields)?;
    ctx.sales().update(id, input).await
}

/// Save an edited sale.
#[instrument(skip(state, pairs))]
async fn update(
    State(state): State<AppState>,
    Path(id): Path<SaleId>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let fields = FormFields::new(pairs);
    let settings = state.settings().await?;

    match update_sale(state.context(&settings), id, &fields).await {
        Ok(sale) => {
            Ok(redirect_success(PATH, &format!("Saved sale {}", sale.order_id)).into_response())
        }
        Err(error) => {
            let errors = linked_form_errors(error, LINKED, "inventory_sku")?;
            unprocessable(&SaleFormTemplate::new(
                PageMeta::new(&settings, PATH, FlashQuery::default()),
                "Edit sale".to_string(),
                format!("/sales/{id}"),
                FormView::rejected(fields, errors),
            ))
        }
    }
}

/// Delete a sale together with its shipments.
#[instrument(skip(state))]
async fn delete(
    State(state): State<AppState>,
    Path(id): Path<SaleId>,
) -> Result<Response, AppError> {
    let settings = state.settings().await?;
    let sales = state.context(&settings).sales();
    let sale = sales.get(id).await?;
    let report = sales.delete(id).await?;
    let message = match report.cascaded {
        0 => format!("Deleted sale {}", sale.order_id),
        n => format!("Deleted sale {} and {n} shipment(s)", sale.order_id),
    };
    Ok(redirect_success(PATH, &message).into_response())
}

/// Every sale as CSV.
#[instrument(skip(state))]
async fn export(State(state): State<AppState>) -> Result<Response, AppError> {
    let settings = state.settings().await?;
    let file = state.context(&settings).export().sales_csv().await?;
    Ok(csv_download(file))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;

    use super::*;

    fn sale() -> Sale {
        let now = Utc::now();
        let mut sale = Sale {
            id: SaleId::generate(),
            order_id: "V-100".to_string(),
            inventory_id: None,
            platform: Platform::Vinted,
            item_name: Some("Jacket".to_string()),
            sale_price: dec!(30.00),
            platform_fees: dec!(3.00),
            payment_processing_fees: dec!(1.00),
            shipping_cost: dec!(4.00),
            buyer_paid_shipping: false,
            net_profit: dec!(0),
            date_sold: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap_or_default(),
            shipped_date: None,
            tracking_number: None,
            payout_status: PayoutStatus::OnHold,
            buyer_name: None,
            buyer_username: Some("sam_b".to_string()),
            notes: None,
            created_at: now,
            updated_at: now,
        };
        sale.recompute().unwrap();
        sale
    }

    #[test]
    fn test_row_formats_sale() {
        let row = SaleRow::new(&sale(), CurrencyCode::EUR);
        assert_eq!(row.net_profit, "€22.00");
        assert_eq!(row.fees, "€4.00");
        assert_eq!(row.payout_status, "On Hold");
        assert_eq!(row.buyer, "sam_b");
        assert_eq!(row.shipped_date, "");
    }

    #[test]
    fn test_sale_form_parses_back() {
        let form = sale_form(&sale(), Some("SKU1"));
        assert!(form.selected("payout_status", "On Hold"));
        assert!(!form.flag("buyer_paid_shipping"));
        assert_eq!(form.value("inventory_sku"), "SKU1");
        assert_eq!(form.value("date_sold"), "2024-06-10");
    }
}
