//! Page rendering, health checks and response headers.

use axum::http::{StatusCode, header};

use flipledger_dashboard::middleware::REQUEST_ID_HEADER;
use flipledger_integration_tests::TestApp;

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new();

    let live = app.get("/health").await;
    assert_eq!(live.status, StatusCode::OK);
    assert_eq!(live.body, "ok");

    let ready = app.get("/health/ready").await;
    assert_eq!(ready.status, StatusCode::OK);
}

// ============================================================================
// Pages
// ============================================================================

#[tokio::test]
async fn test_every_page_renders_on_an_empty_store() {
    let app = TestApp::new();

    for (uri, heading) in [
        ("/", "<h1>Dashboard</h1>"),
        ("/inventory", "<h1>Inventory</h1>"),
        ("/inventory/new", "<h1>New item</h1>"),
        ("/sales", "<h1>Sales</h1>"),
        ("/sales/new", "<h1>"),
        ("/shipping", "<h1>Shipping</h1>"),
        ("/returns", "<h1>Returns</h1>"),
        ("/returns/new", "<h1>"),
        ("/tasks", "<h1>Tasks</h1>"),
        ("/settings", "<h1>Settings</h1>"),
    ] {
        let response = app.get(uri).await;
        assert_eq!(response.status, StatusCode::OK, "GET {uri}");
        assert!(response.body.contains(heading), "GET {uri} missing {heading}");
        assert!(response.body.contains("<title>"), "GET {uri} is not a full page");
    }
}

#[tokio::test]
async fn test_flash_messages_render() {
    let app = TestApp::new();

    let response = app.get("/tasks?success=Saved%20it").await;
    assert!(response.body.contains(r#"<div class="flash success">Saved it</div>"#));

    let response = app.get("/tasks?error=Nope").await;
    assert!(response.body.contains(r#"<div class="flash error">Nope</div>"#));
}

#[tokio::test]
async fn test_flash_messages_are_escaped() {
    let app = TestApp::new();

    let response = app.get("/tasks?success=%3Cscript%3E").await;
    assert!(!response.body.contains("<script>"));
    assert!(response.body.contains("&lt;script&gt;"));
}

#[tokio::test]
async fn test_missing_records_are_not_found() {
    let app = TestApp::new();
    let id = uuid::Uuid::new_v4();

    for uri in [
        format!("/inventory/{id}/edit"),
        format!("/sales/{id}/edit"),
        format!("/returns/{id}/edit"),
        format!("/tasks/{id}/edit"),
    ] {
        let response = app.get(&uri).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "GET {uri}");
    }

    let response = app.post_form(&format!("/tasks/{id}/delete"), &[]).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_filter_is_rejected() {
    let app = TestApp::new();

    let response = app.get("/inventory?status=Lost").await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);

    let response = app.get("/sales?from=yesterday").await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}

// ============================================================================
// Headers
// ============================================================================

#[tokio::test]
async fn test_security_headers_on_pages() {
    let app = TestApp::new();
    let response = app.get("/").await;

    assert_eq!(response.header(header::X_FRAME_OPTIONS), Some("DENY"));
    assert_eq!(response.header(header::X_CONTENT_TYPE_OPTIONS), Some("nosniff"));
    assert_eq!(response.header(header::CACHE_CONTROL), Some("no-store"));
    assert!(
        response
            .header(header::CONTENT_TYPE)
            .is_some_and(|v| v.starts_with("text/html"))
    );
}

#[tokio::test]
async fn test_request_id_is_assigned() {
    let app = TestApp::new();
    let response = app.get("/health").await;

    let id = response
        .headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(!id.is_empty());
}
