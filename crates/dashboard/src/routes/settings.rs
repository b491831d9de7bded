//! Settings route handlers.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use tracing::instrument;

use flipledger_core::CurrencyCode;

use super::{
    FlashQuery, FormView, PageMeta, Prefill, labels, redirect_success, render, unprocessable,
};
use crate::error::AppError;
use crate::filters;
use crate::models::setting::EDITABLE_KEYS;
use crate::models::{AppSettings, FormFields, Setting, SettingsUpdate};
use crate::state::AppState;

const PATH: &str = "/settings";

/// A stored row as shown in the table under the form.
#[derive(Debug, Clone)]
pub struct SettingRow {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}

impl From<&Setting> for SettingRow {
    fn from(setting: &Setting) -> Self {
        Self {
            key: setting.key.clone(),
            value: setting.value.clone(),
            updated_at: setting.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Settings page.
#[derive(Template)]
#[template(path = "settings/index.html")]
pub struct SettingsTemplate {
    pub page: PageMeta,
    pub form: FormView,
    pub currencies: Vec<&'static str>,
    pub rows: Vec<SettingRow>,
}

/// Prefill the form with the values in force.
fn settings_form(settings: &AppSettings) -> FormView {
    EDITABLE_KEYS
        .iter()
        .fold(Prefill::new(), |prefill, key| {
            prefill.text(key, settings.value_of(key).unwrap_or_default())
        })
        .finish()
}

/// Build the settings router.
pub fn router() -> Router<AppState> {
    Router::new().route(PATH, get(settings_page).post(update_settings))
}

async fn page(
    state: &AppState,
    meta: PageMeta,
    form: FormView,
) -> Result<SettingsTemplate, AppError> {
    let rows = state.settings_service().rows().await?;
    Ok(SettingsTemplate {
        page: meta,
        form,
        currencies: labels(CurrencyCode::ALL, CurrencyCode::code),
        rows: rows.iter().map(SettingRow::from).collect(),
    })
}

/// Settings page.
#[instrument(skip(state))]
async fn settings_page(
    State(state): State<AppState>,
    Query(flash): Query<FlashQuery>,
) -> Result<Html<String>, AppError> {
    let settings = state.settings().await?;
    let meta = PageMeta::new(&settings, PATH, flash);
    let template = page(&state, meta, settings_form(&settings)).await?;
    render(&template)
}

/// Validate and store changed settings.
#[instrument(skip(state, pairs))]
async fn update_settings(
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let fields = FormFields::new(pairs);

    match SettingsUpdate::from_form(&fields) {
        Ok(update) if update.is_empty() => {
            Ok(redirect_success(PATH, "Nothing to change").into_response())
        }
        Ok(update) => {
            state.settings_service().update(&update).await?;
            tracing::info!(keys = update.changes.len(), "Settings updated");
            Ok(redirect_success(PATH, "Settings saved").into_response())
        }
        Err(errors) => {
            let settings = state.settings().await?;
            let meta = PageMeta::new(&settings, PATH, FlashQuery::default());
            let template = page(&state, meta, FormView::rejected(fields, errors)).await?;
            unprocessable(&template)
        }
    }
}

#[cfg(test)]
mod tests {
    use flipledger_core::TransitionPolicy;

    use super::*;

    #[test]
    fn test_settings_form_shows_values_in_force() {
        let settings = AppSettings {
            currency: CurrencyCode::EUR,
            transition_policy: TransitionPolicy::Strict,
            ..AppSettings::default()
        };
        let form = settings_form(&settings);
        assert!(form.selected("currency", "EUR"));
        assert!(form.flag("enforce_status_transitions"));
        assert_eq!(form.value("dispatch_window_days"), "2");

        let advisory = settings_form(&AppSettings::default());
        assert!(!advisory.flag("enforce_status_transitions"));
    }
}
