mod common;

use std::sync::atomic::Ordering;

use axum::http::StatusCode;
use chrono::Duration;
use common::{TestApp, USER_ID};
use premium_server::models::TransactionStatus;
use premium_server::store::TransactionStore;

#[tokio::test]
async fn test_create_persists_pending_row_and_opens_session() {
    let app = TestApp::new().await;

    let response = app
        .request("POST", "/api/v1/transactions", Some(USER_ID), None)
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let data = &response.body["data"];
    let id = data["transaction"]["id"].as_i64().unwrap() as i32;
    assert_eq!(data["transaction"]["status"], "pending");
    assert_eq!(data["session"]["token"], format!("snap-token-{}", id));

    let stored = app.stored(id).await.unwrap();
    assert_eq!(stored.user_id, USER_ID);
    assert_eq!(stored.price, 25000);
    assert_eq!(stored.status, TransactionStatus::Pending);
    assert_eq!(stored.due_date - stored.start_date, Duration::days(30));

    let requests = app.gateway.requests.lock().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].order_id, id.to_string());
    assert_eq!(requests[0].amount, 25000);
    assert_eq!(requests[0].customer_name, "Jane Doe");
}

#[tokio::test]
async fn test_create_requires_identity() {
    let app = TestApp::new().await;

    let missing = app.request("POST", "/api/v1/transactions", None, None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.body["error"]["code"], "AUTH_ERROR");

    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_gateway_failure_keeps_pending_transaction() {
    let app = TestApp::new().await;
    app.gateway.fail.store(true, Ordering::SeqCst);

    let response = app
        .request("POST", "/api/v1/transactions", Some(USER_ID), None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert_eq!(response.body["error"]["code"], "GATEWAY_ERROR");

    let order_id = response.body["error"]["details"]["order_id"].as_i64().unwrap() as i32;
    let kept = app.stored(order_id).await.unwrap();
    assert_eq!(kept.status, TransactionStatus::Pending);

    // Recovery: request a new session for the same order.
    app.gateway.fail.store(false, Ordering::SeqCst);
    let renewed = app
        .request(
            "POST",
            &format!("/api/v1/transactions/{}/session", order_id),
            Some(USER_ID),
            None,
        )
        .await;
    assert_eq!(renewed.status, StatusCode::OK);
    assert_eq!(renewed.body["data"]["transaction"]["id"], order_id);
    assert_eq!(app.store.len().await, 1);
}

#[tokio::test]
async fn test_list_get_and_delete() {
    let app = TestApp::new().await;
    let first = app.create().await;
    let second = app.create().await;

    let list = app
        .request("GET", "/api/v1/transactions", Some(USER_ID), None)
        .await;
    assert_eq!(list.status, StatusCode::OK);
    assert_eq!(list.body["data"].as_array().unwrap().len(), 2);

    let foreign = app
        .request("GET", &format!("/api/v1/transactions/{}", first.id), Some(8), None)
        .await;
    assert_eq!(foreign.status, StatusCode::NOT_FOUND);

    let deleted = app
        .request(
            "DELETE",
            &format!("/api/v1/transactions/{}", first.id),
            Some(USER_ID),
            None,
        )
        .await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["data"]["id"], first.id);

    let gone = app
        .request("GET", &format!("/api/v1/transactions/{}", first.id), Some(USER_ID), None)
        .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);

    let remaining = app
        .request("GET", &format!("/api/v1/transactions/{}", second.id), Some(USER_ID), None)
        .await;
    assert_eq!(remaining.status, StatusCode::OK);

    // The deleted id is still reserved.
    assert!(app.store.exists(first.id).await.unwrap());
}

#[tokio::test]
async fn test_session_for_settled_transaction_conflicts() {
    let app = TestApp::new().await;
    let tx = app.create().await;

    app.notify(common::notification(tx.id, "settlement", None)).await;

    let response = app
        .request(
            "POST",
            &format!("/api/v1/transactions/{}/session", tx.id),
            Some(USER_ID),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let response = app.request("GET", "/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_non_numeric_id_uses_error_envelope() {
    let app = TestApp::new().await;

    let response = app
        .request("GET", "/api/v1/transactions/abc", Some(USER_ID), None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["success"], false);
    assert_eq!(response.body["error"]["code"], "VALIDATION_ERROR");
}
