//! Settings: raw key/value rows and the typed view the services use.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use flipledger_core::validation::{FieldError, ValidationError, non_blank, parse_flag, parse_percent};
use flipledger_core::{CurrencyCode, Platform, TransitionPolicy};

use super::form::FormFields;

pub const APP_NAME: &str = "app_name";
pub const APP_VERSION: &str = "app_version";
pub const CURRENCY: &str = "currency";
pub const VINTED_FEE_PERCENT: &str = "vinted_fee_percent";
pub const EBAY_FEE_PERCENT: &str = "ebay_fee_percent";
pub const DEPOP_FEE_PERCENT: &str = "depop_fee_percent";
pub const PAYPAL_FEE_PERCENT: &str = "paypal_fee_percent";
pub const DISPATCH_WINDOW_DAYS: &str = "dispatch_window_days";
pub const ENFORCE_STATUS_TRANSITIONS: &str = "enforce_status_transitions";

/// Keys accepted by the settings update.
pub const EDITABLE_KEYS: &[&str] = &[
    APP_NAME,
    CURRENCY,
    VINTED_FEE_PERCENT,
    EBAY_FEE_PERCENT,
    DEPOP_FEE_PERCENT,
    PAYPAL_FEE_PERCENT,
    DISPATCH_WINDOW_DAYS,
    ENFORCE_STATUS_TRANSITIONS,
];

/// Longest dispatch window accepted, in days.
pub const MAX_DISPATCH_WINDOW_DAYS: u32 = 30;

/// A stored setting row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Typed application settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSettings {
    pub app_name: String,
    /// Always the running build's version.
    pub app_version: String,
    pub currency: CurrencyCode,
    pub vinted_fee_percent: Decimal,
    pub ebay_fee_percent: Decimal,
    pub depop_fee_percent: Decimal,
    pub paypal_fee_percent: Decimal,
    pub dispatch_window_days: u32,
    pub transition_policy: TransitionPolicy,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            app_name: "FlipLedger".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            currency: CurrencyCode::GBP,
            vinted_fee_percent: Decimal::ZERO,
            ebay_fee_percent: Decimal::new(128, 1),
            depop_fee_percent: Decimal::TEN,
            paypal_fee_percent: Decimal::new(29, 1),
            dispatch_window_days: 2,
            transition_policy: TransitionPolicy::Advisory,
        }
    }
}

impl AppSettings {
    /// Build from stored rows. Unknown keys are ignored; malformed values
    /// keep their default and are logged.
    #[must_use]
    pub fn from_rows(rows: &[Setting]) -> Self {
        let mut settings = Self::default();
        for row in rows {
            if let Err(error) = settings.set(&row.key, &row.value) {
                warn!(
                    key = %row.key,
                    value = %row.value,
                    error = %error.message,
                    "Ignoring malformed setting"
                );
            }
        }
        settings
    }

    /// Configured fee percentage for `platform`; zero when it has none.
    #[must_use]
    pub fn platform_fee_percent(&self, platform: Platform) -> Decimal {
        match platform {
            Platform::Vinted => self.vinted_fee_percent,
            Platform::Ebay => self.ebay_fee_percent,
            Platform::Depop => self.depop_fee_percent,
            Platform::Other => Decimal::ZERO,
        }
    }

    /// Current value of `key` in its stored text form.
    #[must_use]
    pub fn value_of(&self, key: &str) -> Option<String> {
        let value = match key {
            APP_NAME => self.app_name.clone(),
            APP_VERSION => self.app_version.clone(),
            CURRENCY => self.currency.code().to_string(),
            VINTED_FEE_PERCENT => self.vinted_fee_percent.to_string(),
            EBAY_FEE_PERCENT => self.ebay_fee_percent.to_string(),
            DEPOP_FEE_PERCENT => self.depop_fee_percent.to_string(),
            PAYPAL_FEE_PERCENT => self.paypal_fee_percent.to_string(),
            DISPATCH_WINDOW_DAYS => self.dispatch_window_days.to_string(),
            ENFORCE_STATUS_TRANSITIONS => self.transition_policy.is_strict().to_string(),
            _ => return None,
        };
        Some(value)
    }

    fn set(&mut self, key: &str, raw: &str) -> Result<(), FieldError> {
        match key {
            APP_NAME => {
                self.app_name = non_blank(Some(raw))
                    .ok_or_else(|| FieldError::new(key, "is required"))?
                    .to_string();
            }
            APP_VERSION => {}
            CURRENCY => {
                self.currency = raw.parse().map_err(|_| {
                    FieldError::new(key, "must be one of: USD, EUR, GBP, CAD, AUD")
                })?;
            }
            VINTED_FEE_PERCENT => self.vinted_fee_percent = parse_percent(key, raw)?,
            EBAY_FEE_PERCENT => self.ebay_fee_percent = parse_percent(key, raw)?,
            DEPOP_FEE_PERCENT => self.depop_fee_percent = parse_percent(key, raw)?,
            PAYPAL_FEE_PERCENT => self.paypal_fee_percent = parse_percent(key, raw)?,
            DISPATCH_WINDOW_DAYS => self.dispatch_window_days = parse_window(key, raw)?,
            ENFORCE_STATUS_TRANSITIONS => {
                self.transition_policy = TransitionPolicy::from_enforced(parse_flag(key, raw)?);
            }
            _ => {}
        }
        Ok(())
    }
}

fn parse_window(field: &str, raw: &str) -> Result<u32, FieldError> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|days| *days <= MAX_DISPATCH_WINDOW_DAYS)
        .ok_or_else(|| {
            FieldError::new(
                field,
                format!("must be a whole number of days between 0 and {MAX_DISPATCH_WINDOW_DAYS}"),
            )
        })
}

/// Validated settings changes, as `(key, normalized value)` pairs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SettingsUpdate {
    pub changes: Vec<(String, String)>,
}

impl SettingsUpdate {
    /// Validate a submitted settings form. Blank values are skipped.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for unknown keys and malformed values.
    pub fn from_form(form: &FormFields) -> Result<Self, ValidationError> {
        let mut errors = ValidationError::default();
        let mut scratch = AppSettings::default();
        let mut changes: Vec<(String, String)> = Vec::new();

        for (key, value) in form.pairs() {
            if !EDITABLE_KEYS.contains(&key) {
                errors.push(FieldError::new(key, "is not a known setting"));
                continue;
            }
            let Some(value) = non_blank(Some(value)) else {
                continue;
            };
            match scratch.set(key, value) {
                Ok(()) => {
                    if let Some(normalized) = scratch.value_of(key) {
                        changes.retain(|(k, _)| k != key);
                        changes.push((key.to_string(), normalized));
                    }
                }
                Err(error) => errors.push(error),
            }
        }

        errors.into_result(Self { changes })
    }

    /// `true` when nothing would change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}
