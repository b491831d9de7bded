//! Dashboard overview.

use chrono::{Days, NaiveDate};
use tracing::instrument;

use super::{ServiceContext, ServiceError};
use crate::models::{
    DashboardStats, InventoryFilter, InventoryItem, Page, Sale, SaleFilter, Task, TaskFilter,
};

/// Days of sales counted in the recent window.
pub const RECENT_WINDOW_DAYS: u64 = 30;

const RECENT_SALES: u32 = 5;
const RECENT_INVENTORY: u32 = 8;
const PENDING_TASKS: u32 = 5;

/// Everything the dashboard page shows.
#[derive(Debug, Clone)]
pub struct DashboardOverview {
    pub stats: DashboardStats,
    pub recent_sales: Vec<Sale>,
    pub recent_inventory: Vec<InventoryItem>,
    /// Most urgent first.
    pub pending_tasks: Vec<Task>,
}

/// Dashboard aggregates.
pub struct DashboardService<'a> {
    ctx: ServiceContext<'a>,
}

impl<'a> DashboardService<'a> {
    #[must_use]
    pub const fn new(ctx: ServiceContext<'a>) -> Self {
        Self { ctx }
    }

    /// First day of the recent-sales window.
    #[must_use]
    pub fn window_start(&self) -> NaiveDate {
        self.ctx
            .today
            .checked_sub_days(Days::new(RECENT_WINDOW_DAYS))
            .unwrap_or(NaiveDate::MIN)
    }

    /// Headline numbers over the live records.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn stats(&self) -> Result<DashboardStats, ServiceError> {
        Ok(self.ctx.store.dashboard_stats(self.window_start()).await?)
    }

    /// Stats plus the latest sales, latest items and most urgent tasks.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    #[instrument(skip(self))]
    pub async fn overview(&self) -> Result<DashboardOverview, ServiceError> {
        let store = self.ctx.store;
        let pending = TaskFilter {
            pending_only: true,
            ..TaskFilter::default()
        };

        let (stats, recent_sales, recent_inventory, pending_tasks) = tokio::try_join!(
            self.stats(),
            async {
                Ok::<_, ServiceError>(
                    store
                        .list_sales(&SaleFilter::default(), Page::first(RECENT_SALES))
                        .await?,
                )
            },
            async {
                Ok::<_, ServiceError>(
                    store
                        .list_inventory(&InventoryFilter::default(), Page::first(RECENT_INVENTORY))
                        .await?,
                )
            },
            async {
                Ok::<_, ServiceError>(store.list_tasks(&pending, Page::first(PENDING_TASKS)).await?)
            },
        )?;

        Ok(DashboardOverview {
            stats,
            recent_sales,
            recent_inventory,
            pending_tasks,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use flipledger_core::{ListingStatus, Platform, TaskStatus};

    use super::*;
    use crate::models::{AppSettings, InventoryInput, SaleInput, TaskInput};
    use crate::services::test_support::{store, today};

    fn sale(order_id: &str, platform: Platform, days_ago: u64) -> SaleInput {
        SaleInput {
            order_id: order_id.to_owned(),
            platform,
            sale_price: dec!(20.00),
            platform_fees: Some(dec!(2.00)),
            payment_processing_fees: Some(dec!(0.50)),
            shipping_cost: dec!(3.00),
            date_sold: today().checked_sub_days(Days::new(days_ago)),
            ..SaleInput::default()
        }
    }

    #[tokio::test]
    async fn test_window_sums_recent_net_profit() {
        let store = store();
        let settings = AppSettings::default();
        let ctx = ServiceContext::new(&store, &settings, today());
        let sales = ctx.sales();
        let mut expected = dec!(0);
        for (order, platform, days) in [
            ("A", Platform::Vinted, 0),
            ("B", Platform::Ebay, 10),
            ("C", Platform::Vinted, 30),
        ] {
            expected += sales.record(sale(order, platform, days)).await.unwrap().net_profit;
        }
        sales.record(sale("OLD", Platform::Depop, 31)).await.unwrap();

        let stats = ctx.dashboard().stats().await.unwrap();
        assert_eq!(stats.recent_sales, 3);
        assert_eq!(stats.recent_net_profit, expected);
        assert_eq!(stats.recent_net_profit, dec!(43.50));

        let vinted = stats
            .sales_by_platform
            .iter()
            .find(|p| p.platform == Platform::Vinted)
            .unwrap();
        assert_eq!(vinted.sales, 2);
    }

    #[tokio::test]
    async fn test_overview_limits_and_counts() {
        let store = store();
        let settings = AppSettings::default();
        let ctx = ServiceContext::new(&store, &settings, today());
        for n in 0..10 {
            ctx.inventory()
                .create(InventoryInput {
                    sku: format!("SKU{n}"),
                    item_name: format!("Item {n}"),
                    listing_status: if n % 2 == 0 {
                        ListingStatus::Listed
                    } else {
                        ListingStatus::Draft
                    },
                    ..InventoryInput::default()
                })
                .await
                .unwrap();
        }
        for title in ["a", "b", "c", "d", "e", "f"] {
            ctx.tasks()
                .create(TaskInput {
                    title: title.to_owned(),
                    ..TaskInput::default()
                })
                .await
                .unwrap();
        }
        ctx.tasks()
            .create(TaskInput {
                title: "done".to_owned(),
                status: TaskStatus::Done,
                ..TaskInput::default()
            })
            .await
            .unwrap();

        let overview = ctx.dashboard().overview().await.unwrap();
        assert_eq!(overview.recent_inventory.len(), 8);
        assert_eq!(overview.pending_tasks.len(), 5);
        assert!(overview.recent_sales.is_empty());
        assert_eq!(overview.stats.inventory.total, 10);
        assert_eq!(overview.stats.inventory.active_listings(), 5);
        assert_eq!(overview.stats.pending_tasks, 6);
    }
}
