//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Placeholder shown for a missing value.
pub const MISSING: &str = "-";

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Local::now().year())
}

/// Show a placeholder for blank text.
///
/// Usage in templates: `{{ row.brand|or_dash }}`
#[askama::filter_fn]
pub fn or_dash(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let text = value.to_string();
    if text.trim().is_empty() {
        Ok(MISSING.to_string())
    } else {
        Ok(text)
    }
}

/// CSS class for a status badge: lowercase with spaces as dashes.
///
/// Usage in templates: `<span class="badge {{ row.status|badge }}">`
#[askama::filter_fn]
pub fn badge(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(badge_class(&value.to_string()))
}

fn badge_class(label: &str) -> String {
    label.trim().to_lowercase().replace(' ', "-")
}
