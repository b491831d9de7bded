//! Dashboard aggregates.

use rust_decimal::Decimal;
use serde::Serialize;

use flipledger_core::{ListingStatus, Platform};

/// Inventory item counts per listing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct InventoryCounts {
    pub total: u64,
    pub draft: u64,
    pub listed: u64,
    pub sold: u64,
    pub returned: u64,
    pub archived: u64,
}

impl InventoryCounts {
    /// Count `n` items in `status`.
    pub const fn add(&mut self, status: ListingStatus, n: u64) {
        self.total += n;
        match status {
            ListingStatus::Draft => self.draft += n,
            ListingStatus::Listed => self.listed += n,
            ListingStatus::Sold => self.sold += n,
            ListingStatus::Returned => self.returned += n,
            ListingStatus::Archived => self.archived += n,
        }
    }

    /// Items currently listed for sale.
    #[must_use]
    pub const fn active_listings(&self) -> u64 {
        self.listed
    }
}

/// Sale count for one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlatformCount {
    pub platform: Platform,
    pub sales: u64,
}

/// Headline numbers for the dashboard page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DashboardStats {
    pub inventory: InventoryCounts,
    /// Sales in the trailing window.
    pub recent_sales: u64,
    /// Net profit summed over the trailing window.
    pub recent_net_profit: Decimal,
    /// All-time sales per platform, in [`Platform::ALL`] order, zero counts included.
    pub sales_by_platform: Vec<PlatformCount>,
    pub pending_shipments: u64,
    pub open_returns: u64,
    pub pending_tasks: u64,
}

impl DashboardStats {
    /// Platform counts with every platform present.
    #[must_use]
    pub fn platform_counts(counted: impl IntoIterator<Item = (Platform, u64)>) -> Vec<PlatformCount> {
        let mut out: Vec<PlatformCount> = Platform::ALL
            .iter()
            .map(|&platform| PlatformCount { platform, sales: 0 })
            .collect();
        for (platform, n) in counted {
            if let Some(slot) = out.iter_mut().find(|c| c.platform == platform) {
                slot.sales += n;
            }
        }
        out
    }
}
