//! Settings commands.
//!
//! # Usage
//!
//! ```bash
//! fl-cli settings list
//! fl-cli settings set vinted_fee_percent 5
//! ```

use flipledger_dashboard::models::setting::EDITABLE_KEYS;
use flipledger_dashboard::models::{FormFields, SettingsUpdate};
use flipledger_dashboard::services::{ServiceError, SettingsService};

use super::CommandError;

/// Log every stored row, then the values in force.
pub async fn list() -> Result<(), CommandError> {
    let (store, cache, settings) = super::open_store().await?;
    let service = SettingsService::new(store.as_ref(), &cache);

    for row in service.rows().await? {
        tracing::info!(key = %row.key, value = %row.value, updated_at = %row.updated_at, "stored");
    }
    for key in EDITABLE_KEYS {
        tracing::info!(key, value = %settings.value_of(key).unwrap_or_default(), "in force");
    }
    Ok(())
}

/// Validate and store one setting.
pub async fn set(key: &str, value: &str) -> Result<(), CommandError> {
    let fields = FormFields::new(vec![(key.to_string(), value.to_string())]);
    let update = SettingsUpdate::from_form(&fields).map_err(ServiceError::from)?;
    if update.is_empty() {
        tracing::info!(key, "Blank value, nothing to change");
        return Ok(());
    }

    let (store, cache, _) = super::open_store().await?;
    let settings = SettingsService::new(store.as_ref(), &cache)
        .update(&update)
        .await?;

    tracing::info!(key, value = %settings.value_of(key).unwrap_or_default(), "Setting saved");
    Ok(())
}
