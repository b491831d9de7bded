//! Derived-field calculations.
//!
//! Profit, ROI and net profit are pure functions of a record's inputs and are
//! recomputed on every create and edit. Nothing here reads stored derived
//! values.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;

use crate::types::{MONEY_SCALE, ShipmentStatus};
use crate::validation::ComputationError;

/// Inputs to an inventory item's profit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemCosts {
    pub purchase_price: Decimal,
    pub fees_estimate: Decimal,
    pub shipping_cost: Decimal,
}

/// Profit and ROI for an inventory item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ItemReturns {
    /// `None` until a sale price is known.
    pub profit: Option<Decimal>,
    /// `None` until a sale price is known, and when ROI is undefined.
    pub roi_percent: Option<Decimal>,
}

/// `sale_price − purchase_price − fees_estimate − shipping_cost`.
///
/// # Errors
///
/// Returns [`ComputationError::Overflow`] if the result leaves the decimal range.
pub fn item_profit(costs: ItemCosts, sale_price: Decimal) -> Result<Decimal, ComputationError> {
    sale_price
        .checked_sub(costs.purchase_price)
        .and_then(|v| v.checked_sub(costs.fees_estimate))
        .and_then(|v| v.checked_sub(costs.shipping_cost))
        .map(|v| v.round_dp(MONEY_SCALE))
        .ok_or(ComputationError::Overflow)
}

/// ROI as a percentage of the purchase price, rounded to two decimals.
///
/// # Errors
///
/// Returns [`ComputationError::RoiUndefined`] when the purchase price is zero.
pub fn roi_percent(profit: Decimal, purchase_price: Decimal) -> Result<Decimal, ComputationError> {
    if purchase_price.is_zero() {
        return Err(ComputationError::RoiUndefined);
    }
    profit
        .checked_div(purchase_price)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map(|pct| pct.round_dp(MONEY_SCALE))
        .ok_or(ComputationError::RoiUndefined)
}

/// Profit and ROI for an item, given an optional sale price.
///
/// An undefined ROI is reported as `None` alongside the computed profit.
///
/// # Errors
///
/// Returns [`ComputationError::Overflow`] if the profit cannot be represented.
pub fn item_returns(
    costs: ItemCosts,
    sale_price: Option<Decimal>,
) -> Result<ItemReturns, ComputationError> {
    let Some(sale_price) = sale_price else {
        return Ok(ItemReturns::default());
    };
    let profit = item_profit(costs, sale_price)?;
    Ok(ItemReturns {
        profit: Some(profit),
        roi_percent: roi_percent(profit, costs.purchase_price).ok(),
    })
}

/// Inputs to a sale's net profit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleAmounts {
    pub sale_price: Decimal,
    pub platform_fees: Decimal,
    pub payment_processing_fees: Decimal,
    pub shipping_cost: Decimal,
    pub buyer_paid_shipping: bool,
}

/// `sale_price − platform_fees − payment_processing_fees − (shipping_cost if seller-paid)`.
///
/// # Errors
///
/// Returns [`ComputationError::Overflow`] if the result leaves the decimal range.
pub fn net_profit(amounts: SaleAmounts) -> Result<Decimal, ComputationError> {
    let shipping = if amounts.buyer_paid_shipping {
        Decimal::ZERO
    } else {
        amounts.shipping_cost
    };
    amounts
        .sale_price
        .checked_sub(amounts.platform_fees)
        .and_then(|v| v.checked_sub(amounts.payment_processing_fees))
        .and_then(|v| v.checked_sub(shipping))
        .map(|v| v.round_dp(MONEY_SCALE))
        .ok_or(ComputationError::Overflow)
}

/// `amount × percent / 100`, rounded to cents.
///
/// # Errors
///
/// Returns [`ComputationError::Overflow`] if the product leaves the decimal range.
pub fn percentage_of(amount: Decimal, percent: Decimal) -> Result<Decimal, ComputationError> {
    amount
        .checked_mul(percent)
        .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
        .map(|v| v.round_dp(MONEY_SCALE))
        .ok_or(ComputationError::Overflow)
}

/// Latest date a sale sold on `date_sold` may be handed to the carrier.
#[must_use]
pub fn dispatch_deadline(date_sold: NaiveDate, window_days: u32) -> NaiveDate {
    date_sold
        .checked_add_days(Days::new(u64::from(window_days)))
        .unwrap_or(NaiveDate::MAX)
}

/// A shipment awaiting dispatch whose deadline has passed.
#[must_use]
pub fn is_overdue(status: ShipmentStatus, deadline: Option<NaiveDate>, today: NaiveDate) -> bool {
    status.is_awaiting_dispatch() && deadline.is_some_and(|d| d < today)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn costs(purchase: Decimal, fees: Decimal, shipping: Decimal) -> ItemCosts {
        ItemCosts {
            purchase_price: purchase,
            fees_estimate: fees,
            shipping_cost: shipping,
        }
    }

    #[test]
    fn test_item_scenario_profit_and_roi() {
        let returns =
            item_returns(costs(dec!(10.00), dec!(1.00), dec!(2.00)), Some(dec!(25.00))).unwrap();
        assert_eq!(returns.profit, Some(dec!(12.00)));
        assert_eq!(returns.roi_percent, Some(dec!(120.00)));
    }

    #[test]
    fn test_profit_matches_formula_for_many_inputs() {
        let cases = [
            (dec!(0), dec!(0), dec!(0), dec!(5)),
            (dec!(19.99), dec!(2.50), dec!(3.20), dec!(15.00)),
            (dec!(4.10), dec!(0.35), dec!(0), dec!(100.00)),
        ];
        for (purchase, fees, shipping, sale) in cases {
            let profit = item_profit(costs(purchase, fees, shipping), sale).unwrap();
            assert_eq!(profit, sale - purchase - fees - shipping);
        }
    }

    #[test]
    fn test_no_sale_price_means_no_returns() {
        let returns = item_returns(costs(dec!(10), dec!(1), dec!(2)), None).unwrap();
        assert_eq!(returns, ItemReturns::default());
    }

    #[test]
    fn test_zero_purchase_price_roi_unavailable() {
        assert_eq!(
            roi_percent(dec!(5), Decimal::ZERO),
            Err(ComputationError::RoiUndefined)
        );
        let returns = item_returns(costs(dec!(0), dec!(1), dec!(0)), Some(dec!(8))).unwrap();
        assert_eq!(returns.profit, Some(dec!(7)));
        assert_eq!(returns.roi_percent, None);
    }

    #[test]
    fn test_roi_rounds_to_two_decimals() {
        assert_eq!(roi_percent(dec!(1), dec!(3)).unwrap(), dec!(33.33));
        assert_eq!(roi_percent(dec!(-2), dec!(3)).unwrap(), dec!(-66.67));
    }

    #[test]
    fn test_net_profit_seller_paid_shipping() {
        let amounts = SaleAmounts {
            sale_price: dec!(30.00),
            platform_fees: dec!(3.00),
            payment_processing_fees: dec!(1.00),
            shipping_cost: dec!(4.00),
            buyer_paid_shipping: false,
        };
        assert_eq!(net_profit(amounts).unwrap(), dec!(22.00));
    }

    #[test]
    fn test_net_profit_buyer_paid_shipping_ignores_cost() {
        let amounts = SaleAmounts {
            sale_price: dec!(30.00),
            platform_fees: dec!(3.00),
            payment_processing_fees: dec!(1.00),
            shipping_cost: dec!(4.00),
            buyer_paid_shipping: true,
        };
        assert_eq!(net_profit(amounts).unwrap(), dec!(26.00));
    }

    #[test]
    fn test_percentage_of_rounds_to_cents() {
        assert_eq!(percentage_of(dec!(19.99), dec!(12.8)).unwrap(), dec!(2.56));
        assert_eq!(percentage_of(dec!(50), dec!(0)).unwrap(), dec!(0));
    }

    #[test]
    fn test_out_of_range_amounts_report_overflow() {
        let huge = Decimal::MAX;
        assert_eq!(
            item_profit(costs(-huge, dec!(0), dec!(0)), huge),
            Err(ComputationError::Overflow)
        );
        assert_eq!(
            item_returns(costs(dec!(1), dec!(0), dec!(0)), Some(-huge)).map(|_| ()),
            Err(ComputationError::Overflow)
        );
        let amounts = SaleAmounts {
            sale_price: -huge,
            platform_fees: huge,
            payment_processing_fees: dec!(0),
            shipping_cost: dec!(0),
            buyer_paid_shipping: true,
        };
        assert_eq!(net_profit(amounts), Err(ComputationError::Overflow));
        assert_eq!(percentage_of(huge, dec!(12.8)), Err(ComputationError::Overflow));
    }

    #[test]
    fn test_dispatch_deadline_and_overdue() {
        let sold = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();
        let deadline = dispatch_deadline(sold, 3);
        assert_eq!(deadline, NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());

        let on_deadline = deadline;
        let after = NaiveDate::from_ymd_opt(2025, 1, 3).unwrap();
        assert!(!is_overdue(ShipmentStatus::PendingLabel, Some(deadline), on_deadline));
        assert!(is_overdue(ShipmentStatus::LabelCreated, Some(deadline), after));
        assert!(!is_overdue(ShipmentStatus::Shipped, Some(deadline), after));
        assert!(!is_overdue(ShipmentStatus::PendingLabel, None, after));
    }
}
