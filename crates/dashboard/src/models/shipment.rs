//! Shipment models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use flipledger_core::calc;
use flipledger_core::validation::{
    ValidationError, non_blank, parse_flag, parse_optional_date, parse_optional_enum,
    require_text,
};
use flipledger_core::{SaleId, ShipmentId, ShipmentStatus};

use super::form::FormFields;
use super::inventory::money_or_zero;

/// Outbound parcel for a sale. Deleted along with its sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: ShipmentId,
    pub sale_id: SaleId,
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub label_cost: Decimal,
    pub dispatch_deadline: Option<NaiveDate>,
    pub status: ShipmentStatus,
    pub shipped_date: Option<NaiveDate>,
    pub delivered_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shipment {
    /// Awaiting dispatch with the deadline already passed.
    #[must_use]
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        calc::is_overdue(self.status, self.dispatch_deadline, today)
    }

    /// Overwrite the editable fields.
    pub fn apply(&mut self, input: ShipmentInput) {
        self.carrier = input.carrier;
        self.tracking_number = input.tracking_number;
        self.label_cost = input.label_cost;
        if input.dispatch_deadline.is_some() {
            self.dispatch_deadline = input.dispatch_deadline;
        }
        self.status = input.status;
        self.shipped_date = input.shipped_date;
        self.delivered_date = input.delivered_date;
        self.notes = input.notes;
    }

    /// Stamp the date belonging to the current status if it is still empty.
    pub fn stamp_status_date(&mut self, today: NaiveDate) {
        match self.status {
            ShipmentStatus::Shipped => {
                self.shipped_date.get_or_insert(today);
            }
            ShipmentStatus::Delivered => {
                self.delivered_date.get_or_insert(today);
            }
            ShipmentStatus::PendingLabel
            | ShipmentStatus::LabelCreated
            | ShipmentStatus::InTransit
            | ShipmentStatus::Problem => {}
        }
    }
}

/// A shipment joined with the sale it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipmentListing {
    pub shipment: Shipment,
    pub order_id: String,
    pub item_name: Option<String>,
    pub buyer_name: Option<String>,
}

/// Validated shipment fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShipmentInput {
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub label_cost: Decimal,
    /// Derived from the sale date when absent on create; kept when absent on edit.
    pub dispatch_deadline: Option<NaiveDate>,
    pub status: ShipmentStatus,
    pub shipped_date: Option<NaiveDate>,
    pub delivered_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl ShipmentInput {
    /// Parse and validate a submitted shipment form.
    ///
    /// # Errors
    ///
    /// Returns every invalid field at once.
    pub fn from_form(form: &FormFields) -> Result<Self, ValidationError> {
        let mut errors = ValidationError::default();
        let input = Self {
            carrier: form.text("carrier"),
            tracking_number: form.text("tracking_number"),
            label_cost: errors.check(money_or_zero(form, "label_cost")),
            dispatch_deadline: errors
                .check(parse_optional_date("dispatch_deadline", form.get("dispatch_deadline"))),
            status: errors
                .check(parse_optional_enum("status", form.get("status")))
                .unwrap_or_default(),
            shipped_date: errors.check(parse_optional_date("shipped_date", form.get("shipped_date"))),
            delivered_date: errors
                .check(parse_optional_date("delivered_date", form.get("delivered_date"))),
            notes: form.text("notes"),
        };
        errors.into_result(input)
    }
}

/// Parse the `sale_id` of a new-shipment form.
///
/// # Errors
///
/// Returns a [`ValidationError`] on `sale_id` when missing or malformed.
pub fn sale_id_from_form(form: &FormFields) -> Result<SaleId, ValidationError> {
    let raw = require_text("sale_id", form.get("sale_id"))?;
    raw.parse()
        .map_err(|_| ValidationError::field("sale_id", "is not a valid sale reference"))
}

/// Filter criteria for listing shipments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShipmentFilter {
    pub status: Option<ShipmentStatus>,
    pub carrier: Option<String>,
    /// Only Pending Label / Label Created, sorted by deadline.
    pub awaiting_dispatch: bool,
}

impl ShipmentFilter {
    /// Whether `shipment` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, shipment: &Shipment) -> bool {
        self.status.is_none_or(|s| shipment.status == s)
            && self
                .carrier
                .as_deref()
                .is_none_or(|c| shipment.carrier.as_deref() == Some(c))
            && (!self.awaiting_dispatch || shipment.status.is_awaiting_dispatch())
    }
}

/// Raw shipping list query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShipmentQuery {
    pub status: Option<String>,
    pub carrier: Option<String>,
    pub pending: Option<String>,
}

impl ShipmentQuery {
    /// Parse into a typed filter.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming each malformed parameter.
    pub fn to_filter(&self) -> Result<ShipmentFilter, ValidationError> {
        let mut errors = ValidationError::default();
        let filter = ShipmentFilter {
            status: errors.check(parse_optional_enum("status", self.status.as_deref())),
            carrier: non_blank(self.carrier.as_deref()).map(ToString::to_string),
            awaiting_dispatch: errors.check(
                non_blank(self.pending.as_deref())
                    .map_or(Ok(false), |raw| parse_flag("pending", raw)),
            ),
        };
        errors.into_result(filter)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn shipment(status: ShipmentStatus) -> Shipment {
        Shipment {
            id: ShipmentId::generate(),
            sale_id: SaleId::generate(),
            carrier: Some("Evri".to_string()),
            tracking_number: None,
            label_cost: Decimal::ZERO,
            dispatch_deadline: NaiveDate::from_ymd_opt(2024, 3, 3),
            status,
            shipped_date: None,
            delivered_date: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_overdue_only_while_awaiting_dispatch() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert!(shipment(ShipmentStatus::PendingLabel).is_overdue(today));
        assert!(!shipment(ShipmentStatus::InTransit).is_overdue(today));
    }

    #[test]
    fn test_stamp_delivered_date_once() {
        let first = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let later = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let mut s = shipment(ShipmentStatus::Delivered);
        s.stamp_status_date(first);
        s.stamp_status_date(later);
        assert_eq!(s.delivered_date, Some(first));
        assert_eq!(s.shipped_date, None);
    }

    #[test]
    fn test_apply_keeps_deadline_when_blank() {
        let mut s = shipment(ShipmentStatus::PendingLabel);
        let deadline = s.dispatch_deadline;
        s.apply(ShipmentInput {
            status: ShipmentStatus::LabelCreated,
            ..ShipmentInput::default()
        });
        assert_eq!(s.dispatch_deadline, deadline);
        assert_eq!(s.status, ShipmentStatus::LabelCreated);
    }

    #[test]
    fn test_filter_awaiting_dispatch() {
        let filter = ShipmentFilter {
            awaiting_dispatch: true,
            ..ShipmentFilter::default()
        };
        assert!(filter.matches(&shipment(ShipmentStatus::LabelCreated)));
        assert!(!filter.matches(&shipment(ShipmentStatus::Shipped)));
    }

    #[test]
    fn test_query_pending_flag() {
        let query = ShipmentQuery {
            pending: Some("1".to_string()),
            ..ShipmentQuery::default()
        };
        assert!(query.to_filter().unwrap().awaiting_dispatch);
    }

    #[test]
    fn test_sale_id_from_form() {
        let id = SaleId::generate();
        let raw = id.to_string();
        let form = FormFields::from_pairs(&[("sale_id", raw.as_str())]);
        assert_eq!(sale_id_from_form(&form).unwrap(), id);
        let bad = FormFields::from_pairs(&[("sale_id", "nope")]);
        assert!(sale_id_from_form(&bad).is_err());
    }
}
