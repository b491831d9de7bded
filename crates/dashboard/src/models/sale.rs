//! Sale models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use flipledger_core::calc::{self, SaleAmounts};
use flipledger_core::validation::{
    ValidationError, parse_enum, parse_money, parse_optional_date, parse_optional_enum,
    parse_optional_money, require_text,
};
use flipledger_core::{
    ComputationError, FieldError, InventoryItemId, PayoutStatus, Platform, SaleId,
};

use super::form::FormFields;
use super::inventory::money_or_zero;

/// A completed sale on a marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    /// Marketplace order identifier, unique.
    pub order_id: String,
    /// Weak link to the item sold; cleared when the item is deleted.
    pub inventory_id: Option<InventoryItemId>,
    pub platform: Platform,
    pub item_name: Option<String>,
    pub sale_price: Decimal,
    pub platform_fees: Decimal,
    pub payment_processing_fees: Decimal,
    pub shipping_cost: Decimal,
    pub buyer_paid_shipping: bool,
    /// Derived from the amounts above.
    pub net_profit: Decimal,
    pub date_sold: NaiveDate,
    pub shipped_date: Option<NaiveDate>,
    pub tracking_number: Option<String>,
    pub payout_status: PayoutStatus,
    pub buyer_name: Option<String>,
    pub buyer_username: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    /// Amount inputs to the net profit calculation.
    #[must_use]
    pub const fn amounts(&self) -> SaleAmounts {
        SaleAmounts {
            sale_price: self.sale_price,
            platform_fees: self.platform_fees,
            payment_processing_fees: self.payment_processing_fees,
            shipping_cost: self.shipping_cost,
            buyer_paid_shipping: self.buyer_paid_shipping,
        }
    }

    /// Recompute net profit from the current amounts.
    ///
    /// # Errors
    ///
    /// Returns [`ComputationError::Overflow`] if the net profit is out of range.
    pub fn recompute(&mut self) -> Result<(), ComputationError> {
        self.net_profit = calc::net_profit(self.amounts())?;
        Ok(())
    }
}

/// Validated create/edit input for a sale.
///
/// Fees left as `None` are filled in from settings by the sales service.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SaleInput {
    pub order_id: String,
    /// SKU of the inventory item to link, if any.
    pub inventory_sku: Option<String>,
    pub platform: Platform,
    pub item_name: Option<String>,
    pub sale_price: Decimal,
    pub platform_fees: Option<Decimal>,
    pub payment_processing_fees: Option<Decimal>,
    pub shipping_cost: Decimal,
    pub buyer_paid_shipping: bool,
    /// Defaults to today when absent.
    pub date_sold: Option<NaiveDate>,
    pub shipped_date: Option<NaiveDate>,
    pub tracking_number: Option<String>,
    pub payout_status: PayoutStatus,
    pub buyer_name: Option<String>,
    pub buyer_username: Option<String>,
    pub notes: Option<String>,
}

impl SaleInput {
    /// Parse and validate a submitted sale form.
    ///
    /// # Errors
    ///
    /// Returns every invalid field at once.
    pub fn from_form(form: &FormFields) -> Result<Self, ValidationError> {
        let mut errors = ValidationError::default();

        let input = Self {
            order_id: errors.check(require_text("order_id", form.get("order_id"))),
            inventory_sku: form.text("inventory_sku"),
            platform: errors.check(required_platform(form)),
            item_name: form.text("item_name"),
            sale_price: errors.check(
                require_text("sale_price", form.get("sale_price"))
                    .and_then(|raw| parse_money("sale_price", &raw)),
            ),
            platform_fees: errors
                .check(parse_optional_money("platform_fees", form.get("platform_fees"))),
            payment_processing_fees: errors.check(parse_optional_money(
                "payment_processing_fees",
                form.get("payment_processing_fees"),
            )),
            shipping_cost: errors.check(money_or_zero(form, "shipping_cost")),
            buyer_paid_shipping: form.checkbox("buyer_paid_shipping"),
            date_sold: errors.check(parse_optional_date("date_sold", form.get("date_sold"))),
            shipped_date: errors.check(parse_optional_date("shipped_date", form.get("shipped_date"))),
            tracking_number: form.text("tracking_number"),
            payout_status: errors
                .check(parse_optional_enum("payout_status", form.get("payout_status")))
                .unwrap_or_default(),
            buyer_name: form.text("buyer_name"),
            buyer_username: form.text("buyer_username"),
            notes: form.text("notes"),
        };

        errors.into_result(input)
    }
}

fn required_platform(form: &FormFields) -> Result<Platform, FieldError> {
    let raw = require_text("platform", form.get("platform"))?;
    parse_enum("platform", &raw)
}

/// Filter criteria for listing sales.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaleFilter {
    pub platform: Option<Platform>,
    pub payout_status: Option<PayoutStatus>,
    /// Sold date lower bound (inclusive).
    pub sold_from: Option<NaiveDate>,
    /// Sold date upper bound (inclusive).
    pub sold_to: Option<NaiveDate>,
}

impl SaleFilter {
    /// Whether `sale` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, sale: &Sale) -> bool {
        self.platform.is_none_or(|p| sale.platform == p)
            && self.payout_status.is_none_or(|s| sale.payout_status == s)
            && self.sold_from.is_none_or(|from| sale.date_sold >= from)
            && self.sold_to.is_none_or(|to| sale.date_sold <= to)
    }
}

/// Raw sales list query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaleQuery {
    pub platform: Option<String>,
    pub payout_status: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl SaleQuery {
    /// Parse into a typed filter.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming each malformed parameter.
    pub fn to_filter(&self) -> Result<SaleFilter, ValidationError> {
        let mut errors = ValidationError::default();
        let filter = SaleFilter {
            platform: errors.check(parse_optional_enum("platform", self.platform.as_deref())),
            payout_status: errors
                .check(parse_optional_enum("payout_status", self.payout_status.as_deref())),
            sold_from: errors.check(parse_optional_date("from", self.from.as_deref())),
            sold_to: errors.check(parse_optional_date("to", self.to.as_deref())),
        };
        errors.into_result(filter)
    }
}

/// Revenue and profit over a set of sales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SalesTotals {
    pub revenue: Decimal,
    pub net_profit: Decimal,
}

impl SalesTotals {
    /// Sum over `sales`.
    #[must_use]
    pub fn of(sales: &[Sale]) -> Self {
        sales.iter().fold(Self::default(), |acc, sale| Self {
            revenue: acc.revenue + sale.sale_price,
            net_profit: acc.net_profit + sale.net_profit,
        })
    }
}
