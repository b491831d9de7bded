//! Return and dispute models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use flipledger_core::validation::{
    ValidationError, non_blank, parse_flag, parse_optional_date, parse_optional_enum,
    parse_optional_money, require_text,
};
use flipledger_core::{ReturnCaseId, ReturnStatus, SaleId};

use super::form::FormFields;
use super::inventory::money_or_zero;

/// A return request or dispute raised against a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnCase {
    pub id: ReturnCaseId,
    /// Weak link to the sale; cleared when the sale is deleted.
    pub sale_id: Option<SaleId>,
    pub order_id: String,
    pub reason: Option<String>,
    pub status: ReturnStatus,
    pub date_opened: NaiveDate,
    pub date_closed: Option<NaiveDate>,
    pub expected_loss: Decimal,
    pub actual_loss: Option<Decimal>,
    pub resolution_notes: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReturnCase {
    /// Overwrite the editable fields.
    pub fn apply(&mut self, input: ReturnInput, today: NaiveDate) {
        self.order_id = input.order_id;
        self.reason = input.reason;
        self.status = input.status;
        self.date_opened = input.date_opened.unwrap_or(today);
        self.date_closed = input.date_closed;
        self.expected_loss = input.expected_loss;
        self.actual_loss = input.actual_loss;
        self.resolution_notes = input.resolution_notes;
        self.notes = input.notes;
    }

    /// Stamp `date_closed` on entering Resolved or Rejected, if still empty.
    pub fn stamp_status_date(&mut self, today: NaiveDate) {
        if !self.status.is_open() {
            self.date_closed.get_or_insert(today);
        }
    }
}

/// Validated create/edit input for a return case.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReturnInput {
    pub order_id: String,
    pub reason: Option<String>,
    pub status: ReturnStatus,
    /// Defaults to today when absent.
    pub date_opened: Option<NaiveDate>,
    pub date_closed: Option<NaiveDate>,
    pub expected_loss: Decimal,
    pub actual_loss: Option<Decimal>,
    pub resolution_notes: Option<String>,
    pub notes: Option<String>,
}

impl ReturnInput {
    /// Parse and validate a submitted return form.
    ///
    /// # Errors
    ///
    /// Returns every invalid field at once.
    pub fn from_form(form: &FormFields) -> Result<Self, ValidationError> {
        let mut errors = ValidationError::default();
        let input = Self {
            order_id: errors.check(require_text("order_id", form.get("order_id"))),
            reason: form.text("reason"),
            status: errors
                .check(parse_optional_enum("status", form.get("status")))
                .unwrap_or_default(),
            date_opened: errors.check(parse_optional_date("date_opened", form.get("date_opened"))),
            date_closed: errors.check(parse_optional_date("date_closed", form.get("date_closed"))),
            expected_loss: errors.check(money_or_zero(form, "expected_loss")),
            actual_loss: errors.check(parse_optional_money("actual_loss", form.get("actual_loss"))),
            resolution_notes: form.text("resolution_notes"),
            notes: form.text("notes"),
        };
        errors.into_result(input)
    }
}

/// Filter criteria for listing returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReturnFilter {
    pub status: Option<ReturnStatus>,
    /// Only Opened / In Progress.
    pub open_only: bool,
}

impl ReturnFilter {
    /// Whether `case` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, case: &ReturnCase) -> bool {
        self.status.is_none_or(|s| case.status == s) && (!self.open_only || case.status.is_open())
    }
}

/// Raw returns list query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReturnQuery {
    pub status: Option<String>,
    pub open: Option<String>,
}

impl ReturnQuery {
    /// Parse into a typed filter.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming each malformed parameter.
    pub fn to_filter(&self) -> Result<ReturnFilter, ValidationError> {
        let mut errors = ValidationError::default();
        let filter = ReturnFilter {
            status: errors.check(parse_optional_enum("status", self.status.as_deref())),
            open_only: errors.check(
                non_blank(self.open.as_deref()).map_or(Ok(false), |raw| parse_flag("open", raw)),
            ),
        };
        errors.into_result(filter)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn case(status: ReturnStatus) -> ReturnCase {
        ReturnCase {
            id: ReturnCaseId::generate(),
            sale_id: None,
            order_id: "V-1".to_string(),
            reason: None,
            status,
            date_opened: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            date_closed: None,
            expected_loss: Decimal::ZERO,
            actual_loss: None,
            resolution_notes: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_from_form_defaults() {
        let form = FormFields::from_pairs(&[("order_id", "V-1"), ("expected_loss", "4.50")]);
        let input = ReturnInput::from_form(&form).unwrap();
        assert_eq!(input.status, ReturnStatus::Opened);
        assert_eq!(input.expected_loss, dec!(4.50));
        assert_eq!(input.date_opened, None);
    }

    #[test]
    fn test_from_form_requires_order_id() {
        let err = ReturnInput::from_form(&FormFields::default()).unwrap_err();
        assert_eq!(err.message_for("order_id"), Some("is required"));
    }

    #[test]
    fn test_closing_stamps_date_once() {
        let today = NaiveDate::from_ymd_opt(2024, 4, 5).unwrap();
        let mut c = case(ReturnStatus::InProgress);
        c.stamp_status_date(today);
        assert_eq!(c.date_closed, None);

        c.status = ReturnStatus::Rejected;
        c.stamp_status_date(today);
        assert_eq!(c.date_closed, Some(today));
    }

    #[test]
    fn test_open_only_filter() {
        let filter = ReturnFilter {
            open_only: true,
            ..ReturnFilter::default()
        };
        assert!(filter.matches(&case(ReturnStatus::Opened)));
        assert!(!filter.matches(&case(ReturnStatus::Resolved)));
    }
}
