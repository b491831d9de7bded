//! Integration tests for FlipLedger.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process tests (in-memory store)
//! cargo test -p flipledger-integration-tests
//!
//! # PostgreSQL store tests, against a migrated database
//! DATABASE_URL=postgres://... cargo test -p flipledger-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `http_pages` - every page renders, health checks, response headers
//! - `record_flows` - create/edit/delete through the forms, exports
//! - `settings_flow` - settings updates and the status-change policy
//! - `postgres_store` - the `PostgreSQL` backend (ignored by default)
//!
//! The in-process tests drive the full router with `tower::ServiceExt::oneshot`
//! and pin "today" to [`today`].

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Request, StatusCode, header};
use chrono::NaiveDate;
use tower::ServiceExt;

use flipledger_dashboard::config::DashboardConfig;
use flipledger_dashboard::db::MemoryStore;
use flipledger_dashboard::state::AppState;

/// The pinned date every in-process test runs on: 2024-06-15.
#[must_use]
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap_or_default()
}

/// A router over an empty in-memory store, plus the store for assertions.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::with_fixed_date(DashboardConfig::default(), store.clone(), today());
        Self {
            router: flipledger_dashboard::app(state),
            store,
        }
    }

    /// `GET uri`.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    pub async fn get(&self, uri: &str) -> TestResponse {
        let request = Request::get(uri)
            .body(Body::empty())
            .unwrap_or_else(|e| panic!("bad request {uri}: {e}"));
        self.send(request).await
    }

    /// `POST uri` with a urlencoded form body.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    pub async fn post_form(&self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(encode_form(fields)))
            .unwrap_or_else(|e| panic!("bad request {uri}: {e}"));
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = match self.router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_else(|e| panic!("unreadable body: {e}"));
        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// A buffered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// Value of `name`, if present and readable.
    #[must_use]
    pub fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Redirect target, percent-decoded.
    #[must_use]
    pub fn location(&self) -> Option<String> {
        self.header(header::LOCATION)
            .map(|raw| urlencoding::decode(raw).map_or_else(|_| raw.to_string(), |s| s.into_owned()))
    }
}

/// Urlencode `fields` in order; repeated names stay repeated.
#[must_use]
pub fn encode_form(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(name, value)| format!("{}={}", urlencoding::encode(name), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}
