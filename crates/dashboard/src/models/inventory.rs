//! Inventory item models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use flipledger_core::calc::{self, ItemCosts, ItemReturns};
use flipledger_core::validation::{
    ValidationError, non_blank, parse_optional_date, parse_optional_enum, parse_optional_money,
    require_text,
};
use flipledger_core::{
    ComputationError, FieldError, InventoryItemId, ListingStatus, Platform, ShippingPayer,
};

use super::form::FormFields;

/// A physical item bought for resale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: InventoryItemId,
    /// Unique stock-keeping unit.
    pub sku: String,
    pub item_name: String,
    pub category: Option<String>,
    pub size: Option<String>,
    pub condition: Option<String>,
    pub brand: Option<String>,
    /// Marketplaces the item is listed on.
    pub platforms: Vec<Platform>,
    pub listing_status: ListingStatus,
    pub purchase_price: Decimal,
    pub fees_estimate: Decimal,
    pub shipping_cost: Decimal,
    pub shipping_payer: ShippingPayer,
    pub sale_price: Option<Decimal>,
    /// Derived; `None` until a sale price is known.
    pub profit: Option<Decimal>,
    /// Derived; `None` until a sale price is known or when undefined.
    pub roi_percent: Option<Decimal>,
    pub date_purchased: Option<NaiveDate>,
    pub date_listed: Option<NaiveDate>,
    pub date_sold: Option<NaiveDate>,
    pub storage_location: Option<String>,
    pub notes: Option<String>,
    /// Photo references (paths or URLs).
    pub photos: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Cost inputs to the profit calculation.
    #[must_use]
    pub const fn costs(&self) -> ItemCosts {
        ItemCosts {
            purchase_price: self.purchase_price,
            fees_estimate: self.fees_estimate,
            shipping_cost: self.shipping_cost,
        }
    }

    /// Recompute profit and ROI from the current inputs.
    ///
    /// # Errors
    ///
    /// Returns [`ComputationError::Overflow`] if the profit is out of range.
    pub fn recompute(&mut self) -> Result<(), ComputationError> {
        let ItemReturns {
            profit,
            roi_percent,
        } = calc::item_returns(self.costs(), self.sale_price)?;
        self.profit = profit;
        self.roi_percent = roi_percent;
        Ok(())
    }

    /// Build a new record from validated input.
    ///
    /// # Errors
    ///
    /// See [`InventoryItem::recompute`].
    pub fn from_input(
        input: InventoryInput,
        now: DateTime<Utc>,
    ) -> Result<Self, ComputationError> {
        let mut item = Self {
            id: InventoryItemId::generate(),
            sku: String::new(),
            item_name: String::new(),
            category: None,
            size: None,
            condition: None,
            brand: None,
            platforms: Vec::new(),
            listing_status: ListingStatus::default(),
            purchase_price: Decimal::ZERO,
            fees_estimate: Decimal::ZERO,
            shipping_cost: Decimal::ZERO,
            shipping_payer: ShippingPayer::default(),
            sale_price: None,
            profit: None,
            roi_percent: None,
            date_purchased: None,
            date_listed: None,
            date_sold: None,
            storage_location: None,
            notes: None,
            photos: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        item.apply(input)?;
        Ok(item)
    }

    /// Overwrite every editable field and recompute derived values.
    ///
    /// # Errors
    ///
    /// See [`InventoryItem::recompute`].
    pub fn apply(&mut self, input: InventoryInput) -> Result<(), ComputationError> {
        self.sku = input.sku;
        self.item_name = input.item_name;
        self.category = input.category;
        self.size = input.size;
        self.condition = input.condition;
        self.brand = input.brand;
        self.platforms = input.platforms;
        self.listing_status = input.listing_status;
        self.purchase_price = input.purchase_price;
        self.fees_estimate = input.fees_estimate;
        self.shipping_cost = input.shipping_cost;
        self.shipping_payer = input.shipping_payer;
        self.sale_price = input.sale_price;
        self.date_purchased = input.date_purchased;
        self.date_listed = input.date_listed;
        self.date_sold = input.date_sold;
        self.storage_location = input.storage_location;
        self.notes = input.notes;
        self.photos = input.photos;
        self.recompute()
    }

    /// Stamp the date belonging to `status` if it is still empty.
    pub fn stamp_status_date(&mut self, today: NaiveDate) {
        match self.listing_status {
            ListingStatus::Listed => {
                self.date_listed.get_or_insert(today);
            }
            ListingStatus::Sold => {
                self.date_sold.get_or_insert(today);
            }
            ListingStatus::Draft | ListingStatus::Returned | ListingStatus::Archived => {}
        }
    }
}

/// Validated create/edit input for an inventory item.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InventoryInput {
    pub sku: String,
    pub item_name: String,
    pub category: Option<String>,
    pub size: Option<String>,
    pub condition: Option<String>,
    pub brand: Option<String>,
    pub platforms: Vec<Platform>,
    pub listing_status: ListingStatus,
    pub purchase_price: Decimal,
    pub fees_estimate: Decimal,
    pub shipping_cost: Decimal,
    pub shipping_payer: ShippingPayer,
    pub sale_price: Option<Decimal>,
    pub date_purchased: Option<NaiveDate>,
    pub date_listed: Option<NaiveDate>,
    pub date_sold: Option<NaiveDate>,
    pub storage_location: Option<String>,
    pub notes: Option<String>,
    pub photos: Vec<String>,
}

impl InventoryInput {
    /// Parse and validate a submitted inventory form.
    ///
    /// Blank money fields other than the sale price default to zero.
    ///
    /// # Errors
    ///
    /// Returns every invalid field at once.
    pub fn from_form(form: &FormFields) -> Result<Self, ValidationError> {
        let mut errors = ValidationError::default();

        let input = Self {
            sku: errors.check(require_text("sku", form.get("sku"))),
            item_name: errors.check(require_text("item_name", form.get("item_name"))),
            category: form.text("category"),
            size: form.text("size"),
            condition: form.text("condition"),
            brand: form.text("brand"),
            platforms: form.enum_list("platforms", &mut errors),
            listing_status: errors
                .check(parse_optional_enum("listing_status", form.get("listing_status")))
                .unwrap_or_default(),
            purchase_price: errors.check(money_or_zero(form, "purchase_price")),
            fees_estimate: errors.check(money_or_zero(form, "fees_estimate")),
            shipping_cost: errors.check(money_or_zero(form, "shipping_cost")),
            shipping_payer: errors
                .check(parse_optional_enum("shipping_paid_by", form.get("shipping_paid_by")))
                .unwrap_or_default(),
            sale_price: errors.check(parse_optional_money("sale_price", form.get("sale_price"))),
            date_purchased: errors
                .check(parse_optional_date("date_purchased", form.get("date_purchased"))),
            date_listed: errors.check(parse_optional_date("date_listed", form.get("date_listed"))),
            date_sold: errors.check(parse_optional_date("date_sold", form.get("date_sold"))),
            storage_location: form.text("storage_location"),
            notes: form.text("notes"),
            photos: form.lines("photos"),
        };

        errors.into_result(input)
    }
}

/// Blank means zero; anything else must be a valid amount.
pub(crate) fn money_or_zero(form: &FormFields, field: &str) -> Result<Decimal, FieldError> {
    parse_optional_money(field, form.get(field)).map(Option::unwrap_or_default)
}

/// Filter criteria for listing inventory. All set criteria must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryFilter {
    pub status: Option<ListingStatus>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub platform: Option<Platform>,
    /// Purchase date lower bound (inclusive).
    pub purchased_from: Option<NaiveDate>,
    /// Purchase date upper bound (inclusive).
    pub purchased_to: Option<NaiveDate>,
    /// Case-insensitive substring of SKU or item name.
    pub search: Option<String>,
}

impl InventoryFilter {
    /// Whether `item` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, item: &InventoryItem) -> bool {
        self.status.is_none_or(|s| item.listing_status == s)
            && self
                .brand
                .as_deref()
                .is_none_or(|b| item.brand.as_deref() == Some(b))
            && self
                .category
                .as_deref()
                .is_none_or(|c| item.category.as_deref() == Some(c))
            && self.platform.is_none_or(|p| item.platforms.contains(&p))
            && self
                .purchased_from
                .is_none_or(|from| item.date_purchased.is_some_and(|d| d >= from))
            && self
                .purchased_to
                .is_none_or(|to| item.date_purchased.is_some_and(|d| d <= to))
            && self.search.as_deref().is_none_or(|needle| {
                let needle = needle.to_lowercase();
                item.sku.to_lowercase().contains(&needle)
                    || item.item_name.to_lowercase().contains(&needle)
            })
    }
}

/// Raw inventory list query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventoryQuery {
    pub status: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub platform: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub q: Option<String>,
}

impl InventoryQuery {
    /// Parse into a typed filter.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming each malformed parameter.
    pub fn to_filter(&self) -> Result<InventoryFilter, ValidationError> {
        let mut errors = ValidationError::default();
        let filter = InventoryFilter {
            status: errors.check(parse_optional_enum("status", self.status.as_deref())),
            brand: non_blank(self.brand.as_deref()).map(ToString::to_string),
            category: non_blank(self.category.as_deref()).map(ToString::to_string),
            platform: errors.check(parse_optional_enum("platform", self.platform.as_deref())),
            purchased_from: errors.check(parse_optional_date("from", self.from.as_deref())),
            purchased_to: errors.check(parse_optional_date("to", self.to.as_deref())),
            search: non_blank(self.q.as_deref()).map(ToString::to_string),
        };
        errors.into_result(filter)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> FormFields {
        FormFields::from_pairs(pairs)
    }

    fn item_with(status: ListingStatus, brand: &str) -> InventoryItem {
        InventoryItem::from_input(
            InventoryInput {
                sku: format!("{brand}-{status}"),
                item_name: format!("{brand} hoodie"),
                brand: Some(brand.to_string()),
                listing_status: status,
                ..InventoryInput::default()
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_from_form_parses_all_fields() {
        let form = fields(&[
            ("sku", "SKU1"),
            ("item_name", "Nike hoodie"),
            ("brand", "Nike"),
            ("platforms", "Vinted"),
            ("platforms", "eBay"),
            ("listing_status", "Listed"),
            ("purchase_price", "10.00"),
            ("fees_estimate", "1.00"),
            ("shipping_cost", "2.00"),
            ("shipping_paid_by", "Seller"),
            ("sale_price", ""),
            ("date_purchased", "2024-03-01"),
            ("photos", "front.jpg\nback.jpg"),
        ]);
        let input = InventoryInput::from_form(&form).unwrap();
        assert_eq!(input.sku, "SKU1");
        assert_eq!(input.platforms, vec![Platform::Vinted, Platform::Ebay]);
        assert_eq!(input.listing_status, ListingStatus::Listed);
        assert_eq!(input.shipping_payer, ShippingPayer::Seller);
        assert_eq!(input.purchase_price, dec!(10.00));
        assert_eq!(input.sale_price, None);
        assert_eq!(input.photos.len(), 2);
    }

    #[test]
    fn test_from_form_collects_every_error() {
        let form = fields(&[
            ("sku", ""),
            ("item_name", "Thing"),
            ("purchase_price", "-3"),
            ("listing_status", "Shipped"),
            ("date_purchased", "yesterday"),
        ]);
        let err = InventoryInput::from_form(&form).unwrap_err();
        assert!(err.message_for("sku").is_some());
        assert!(err.message_for("purchase_price").is_some());
        assert!(err.message_for("listing_status").is_some());
        assert!(err.message_for("date_purchased").is_some());
        assert_eq!(err.errors().len(), 4);
    }

    #[test]
    fn test_from_input_computes_profit_and_roi() {
        let item = InventoryItem::from_input(
            InventoryInput {
                sku: "SKU1".to_string(),
                item_name: "Jacket".to_string(),
                purchase_price: dec!(10.00),
                fees_estimate: dec!(1.00),
                shipping_cost: dec!(2.00),
                sale_price: Some(dec!(25.00)),
                ..InventoryInput::default()
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(item.profit, Some(dec!(12.00)));
        assert_eq!(item.roi_percent, Some(dec!(120.00)));
    }

    #[test]
    fn test_apply_clears_profit_when_sale_price_removed() {
        let mut item = item_with(ListingStatus::Sold, "Nike");
        item.sale_price = Some(dec!(5));
        item.recompute().unwrap();
        assert!(item.profit.is_some());

        let input = InventoryInput {
            sku: item.sku.clone(),
            item_name: item.item_name.clone(),
            ..InventoryInput::default()
        };
        item.apply(input).unwrap();
        assert_eq!(item.profit, None);
        assert_eq!(item.roi_percent, None);
    }

    #[test]
    fn test_filter_status_and_brand_are_conjunctive() {
        let filter = InventoryFilter {
            status: Some(ListingStatus::Listed),
            brand: Some("Nike".to_string()),
            ..InventoryFilter::default()
        };
        assert!(filter.matches(&item_with(ListingStatus::Listed, "Nike")));
        assert!(!filter.matches(&item_with(ListingStatus::Draft, "Nike")));
        assert!(!filter.matches(&item_with(ListingStatus::Listed, "Adidas")));
    }

    #[test]
    fn test_filter_purchase_range_is_inclusive() {
        let mut item = item_with(ListingStatus::Draft, "Nike");
        item.date_purchased = NaiveDate::from_ymd_opt(2024, 1, 31);
        let filter = InventoryFilter {
            purchased_from: NaiveDate::from_ymd_opt(2024, 1, 1),
            purchased_to: NaiveDate::from_ymd_opt(2024, 1, 31),
            ..InventoryFilter::default()
        };
        assert!(filter.matches(&item));
        item.date_purchased = None;
        assert!(!filter.matches(&item));
    }

    #[test]
    fn test_filter_search_matches_sku_or_name() {
        let item = item_with(ListingStatus::Draft, "Nike");
        let by_name = InventoryFilter {
            search: Some("HOODIE".to_string()),
            ..InventoryFilter::default()
        };
        let miss = InventoryFilter {
            search: Some("jeans".to_string()),
            ..InventoryFilter::default()
        };
        assert!(by_name.matches(&item));
        assert!(!miss.matches(&item));
    }

    #[test]
    fn test_stamp_status_date_only_when_empty() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let earlier = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let mut item = item_with(ListingStatus::Sold, "Nike");
        item.stamp_status_date(today);
        assert_eq!(item.date_sold, Some(today));

        item.date_sold = Some(earlier);
        item.stamp_status_date(today);
        assert_eq!(item.date_sold, Some(earlier));
    }

    #[test]
    fn test_query_to_filter_rejects_bad_status() {
        let query = InventoryQuery {
            status: Some("Gone".to_string()),
            brand: Some(String::new()),
            ..InventoryQuery::default()
        };
        let err = query.to_filter().unwrap_err();
        assert!(err.message_for("status").is_some());
    }
}
