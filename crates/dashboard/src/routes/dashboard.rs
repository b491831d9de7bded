//! Dashboard route handler.

use askama::Template;
use axum::{
    Router,
    extract::{Query, State},
    response::Html,
    routing::get,
};
use tracing::instrument;

use super::inventory::InventoryRow;
use super::sales::SaleRow;
use super::tasks::TaskRow;
use super::{FlashQuery, PageMeta, money, render};
use crate::error::AppError;
use crate::filters;
use crate::models::DashboardStats;
use crate::services::dashboard::RECENT_WINDOW_DAYS;
use crate::state::AppState;

/// Sale count per platform, formatted for display.
#[derive(Debug, Clone)]
pub struct PlatformSales {
    pub platform: &'static str,
    pub sales: u64,
}

/// Dashboard page template.
#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub page: PageMeta,
    pub stats: DashboardStats,
    pub recent_net_profit: String,
    pub window_days: u64,
    pub platform_sales: Vec<PlatformSales>,
    pub recent_sales: Vec<SaleRow>,
    pub recent_inventory: Vec<InventoryRow>,
    pub pending_tasks: Vec<TaskRow>,
}

/// Build the dashboard router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(dashboard))
}

/// Dashboard home page.
#[instrument(skip(state))]
async fn dashboard(
    State(state): State<AppState>,
    Query(flash): Query<FlashQuery>,
) -> Result<Html<String>, AppError> {
    let settings = state.settings().await?;
    let overview = state.context(&settings).dashboard().overview().await?;
    let currency = settings.currency;
    let today = state.today();

    let template = DashboardTemplate {
        page: PageMeta::new(&settings, "/", flash),
        recent_net_profit: money(overview.stats.recent_net_profit, currency),
        window_days: RECENT_WINDOW_DAYS,
        platform_sales: overview
            .stats
            .sales_by_platform
            .iter()
            .map(|count| PlatformSales {
                platform: count.platform.label(),
                sales: count.sales,
            })
            .collect(),
        recent_sales: overview
            .recent_sales
            .iter()
            .map(|sale| SaleRow::new(sale, currency))
            .collect(),
        recent_inventory: overview
            .recent_inventory
            .iter()
            .map(|item| InventoryRow::new(item, currency))
            .collect(),
        pending_tasks: overview
            .pending_tasks
            .iter()
            .map(|task| TaskRow::new(task, today))
            .collect(),
        stats: overview.stats,
    };

    render(&template)
}
