//! Error taxonomy and field-level parsing.
//!
//! Three error kinds surface to callers:
//!
//! - [`ValidationError`]: one or more per-field messages (bad enumeration
//!   value, missing required field, malformed number or date, illegal status
//!   transition, duplicate unique key).
//! - [`NotFoundError`]: a reference names a record that does not exist.
//! - [`ComputationError`]: a derived value cannot be computed.
//!
//! The `parse_*` helpers turn raw form strings into typed values, reporting
//! failures as [`FieldError`]s so a whole form can be validated in one pass.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::types::{MAX_MONEY, MONEY_SCALE, UnknownVariant};

/// Date format accepted from forms and written to exports.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A problem with a single input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Form field name, e.g. `"purchase_price"`.
    pub field: String,
    /// Human-readable message.
    pub message: String,
}

impl FieldError {
    /// Create a field error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// One or more invalid fields.
#[derive(Debug, Clone, PartialEq, Eq, Default, Error)]
pub struct ValidationError {
    errors: Vec<FieldError>,
}

impl ValidationError {
    /// A validation error for a single field.
    #[must_use]
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError::new(field, message)],
        }
    }

    /// Record another field error.
    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    /// Unwrap a parsed field, recording its error and substituting the
    /// default so parsing can continue with the remaining fields.
    pub fn check<T: Default>(&mut self, result: Result<T, FieldError>) -> T {
        result.unwrap_or_else(|error| {
            self.errors.push(error);
            T::default()
        })
    }

    /// All field errors, in the order they were found.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// First message recorded for `field`, if any.
    #[must_use]
    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// `true` when no field errors were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok(value)` when empty, otherwise `Err(self)`.
    ///
    /// # Errors
    ///
    /// Returns `self` if any field error was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        write!(f, "validation failed: {}", parts.join("; "))
    }
}

impl From<FieldError> for ValidationError {
    fn from(error: FieldError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

/// A reference to a record that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{entity} not found: {key}")]
pub struct NotFoundError {
    /// Record type, e.g. `"inventory item"`.
    pub entity: &'static str,
    /// The key that was looked up (id, SKU or order id).
    pub key: String,
}

impl NotFoundError {
    /// Create a not-found error.
    #[must_use]
    pub fn new(entity: &'static str, key: impl Into<String>) -> Self {
        Self {
            entity,
            key: key.into(),
        }
    }
}

/// A derived value cannot be computed from the given inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ComputationError {
    /// ROI divides by the purchase price, which is zero.
    #[error("ROI is undefined when the purchase price is zero")]
    RoiUndefined,
    /// An intermediate or final amount is outside the decimal range.
    #[error("amount is out of range")]
    Overflow,
}

// =============================================================================
// Field parsing
// =============================================================================

/// Trimmed value, or `None` when absent or blank.
#[must_use]
pub fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// Require a non-blank text value.
///
/// # Errors
///
/// Returns a [`FieldError`] if the value is missing or blank.
pub fn require_text(field: &str, raw: Option<&str>) -> Result<String, FieldError> {
    non_blank(raw)
        .map(ToString::to_string)
        .ok_or_else(|| FieldError::new(field, "is required"))
}

/// Parse a non-negative money amount with at most two decimal places.
///
/// # Errors
///
/// Returns a [`FieldError`] if the value is not a number, is negative, exceeds
/// [`MAX_MONEY`] or has more than two decimal places.
pub fn parse_money(field: &str, raw: &str) -> Result<Decimal, FieldError> {
    let value = Decimal::from_str(raw.trim())
        .map_err(|_| FieldError::new(field, format!("{:?} is not a valid amount", raw.trim())))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(FieldError::new(field, "must not be negative"));
    }
    if value > MAX_MONEY {
        return Err(FieldError::new(field, format!("must be at most {MAX_MONEY}")));
    }
    if value.normalize().scale() > MONEY_SCALE {
        return Err(FieldError::new(field, "must have at most two decimal places"));
    }
    Ok(value.round_dp(MONEY_SCALE))
}

/// Parse an optional money amount; blank means `None`.
///
/// # Errors
///
/// See [`parse_money`].
pub fn parse_optional_money(field: &str, raw: Option<&str>) -> Result<Option<Decimal>, FieldError> {
    non_blank(raw).map(|s| parse_money(field, s)).transpose()
}

/// Parse a percentage between 0 and 100 with at most two decimal places.
///
/// # Errors
///
/// Returns a [`FieldError`] if the value is malformed or out of range.
pub fn parse_percent(field: &str, raw: &str) -> Result<Decimal, FieldError> {
    let value = parse_money(field, raw)?;
    if value > Decimal::ONE_HUNDRED {
        return Err(FieldError::new(field, "must be between 0 and 100"));
    }
    Ok(value)
}

/// Parse a `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns a [`FieldError`] if the value is not a valid calendar date.
pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, FieldError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| FieldError::new(field, format!("{:?} is not a date (YYYY-MM-DD)", raw.trim())))
}

/// Parse an optional date; blank means `None`.
///
/// # Errors
///
/// See [`parse_date`].
pub fn parse_optional_date(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, FieldError> {
    non_blank(raw).map(|s| parse_date(field, s)).transpose()
}

/// Parse one of the closed enumerations.
///
/// # Errors
///
/// Returns a [`FieldError`] naming the accepted labels.
pub fn parse_enum<T>(field: &str, raw: &str) -> Result<T, FieldError>
where
    T: FromStr<Err = UnknownVariant>,
{
    raw.parse::<T>()
        .map_err(|e| FieldError::new(field, format!("must be one of: {}", e.expected)))
}

/// Parse an optional enumeration; blank means `None`.
///
/// # Errors
///
/// See [`parse_enum`].
pub fn parse_optional_enum<T>(field: &str, raw: Option<&str>) -> Result<Option<T>, FieldError>
where
    T: FromStr<Err = UnknownVariant>,
{
    non_blank(raw).map(|s| parse_enum(field, s)).transpose()
}

/// Parse a checkbox-style flag (`on`, `true`, `yes`, `1` / `off`, `false`, `no`, `0`).
///
/// # Errors
///
/// Returns a [`FieldError`] for any other value.
pub fn parse_flag(field: &str, raw: &str) -> Result<bool, FieldError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        other => Err(FieldError::new(field, format!("{other:?} is not a yes/no value"))),
    }
}
