//! Settings updates and the status-change policy they control.

use axum::http::StatusCode;

use flipledger_core::TaskStatus;
use flipledger_dashboard::db::Store;
use flipledger_dashboard::models::{Page, Task, TaskFilter};
use flipledger_integration_tests::{TestApp, today};

async fn only_task(app: &TestApp) -> Task {
    let mut tasks = app
        .store
        .list_tasks(&TaskFilter::default(), Page::default())
        .await
        .expect("store");
    assert_eq!(tasks.len(), 1);
    tasks.remove(0)
}

/// A Done task, created through the form.
async fn done_task(app: &TestApp) -> Task {
    let response = app
        .post_form(
            "/tasks",
            &[("title", "List the boots"), ("category", "Listing"), ("status", "Done")],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER, "{}", response.body);
    only_task(app).await
}

async fn set_strict(app: &TestApp, strict: bool) {
    let mut fields = vec![("enforce_status_transitions", "false")];
    if strict {
        fields.push(("enforce_status_transitions", "true"));
    }
    let response = app.post_form("/settings", &fields).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER, "{}", response.body);
}

// ============================================================================
// Settings page
// ============================================================================

#[tokio::test]
async fn test_currency_change_applies_to_next_request() {
    let app = TestApp::new();
    let response = app
        .post_form("/inventory", &[("sku", "S1"), ("item_name", "Cap"), ("purchase_price", "10")])
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);

    // Warm the settings cache.
    assert!(app.get("/inventory").await.body.contains("£10.00"));

    let response = app.post_form("/settings", &[("currency", "eur")]).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location().as_deref(), Some("/settings?success=Settings saved"));

    let list = app.get("/inventory").await;
    assert!(list.body.contains("€10.00"));
    assert!(!list.body.contains("£10.00"));

    let page = app.get("/settings").await;
    assert!(page.body.contains("currency"));
    assert!(page.body.contains("EUR"));
}

#[tokio::test]
async fn test_invalid_settings_rerender() {
    let app = TestApp::new();

    let response = app
        .post_form(
            "/settings",
            &[("currency", "XYZ"), ("vinted_fee_percent", "150"), ("favourite_colour", "red")],
        )
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("must be one of"));
    assert!(response.body.contains("must be between 0 and 100"));
    assert!(response.body.contains("is not a known setting"));

    // Nothing was stored.
    let rows = app.store.list_settings().await.expect("store");
    assert!(rows.iter().all(|row| row.key != "currency"));
}

#[tokio::test]
async fn test_blank_settings_form_changes_nothing() {
    let app = TestApp::new();

    let response = app.post_form("/settings", &[("currency", "  ")]).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location().as_deref(), Some("/settings?success=Nothing to change"));
}

// ============================================================================
// Status-change policy
// ============================================================================

#[tokio::test]
async fn test_entering_done_stamps_completed_date_once() {
    let app = TestApp::new();
    let task = done_task(&app).await;
    assert_eq!(task.status, TaskStatus::Done);
    assert_eq!(task.completed_date, Some(today()));
}

#[tokio::test]
async fn test_advisory_policy_accepts_reopening_done_task() {
    let app = TestApp::new();
    let task = done_task(&app).await;

    let response = app
        .post_form(&format!("/tasks/{}", task.id), &[("status", "Todo")])
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(only_task(&app).await.status, TaskStatus::Todo);
}

#[tokio::test]
async fn test_strict_policy_rejects_reopening_done_task() {
    let app = TestApp::new();
    let task = done_task(&app).await;
    set_strict(&app, true).await;

    let response = app
        .post_form(&format!("/tasks/{}", task.id), &[("status", "Todo")])
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("flash error"));
    assert_eq!(only_task(&app).await.status, TaskStatus::Done);

    // Switching back to advisory lifts the restriction.
    set_strict(&app, false).await;
    let response = app
        .post_form(&format!("/tasks/{}", task.id), &[("status", "Todo")])
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
}
