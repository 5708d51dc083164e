//! API integration tests against a running server
//!
//! Start the server (any storage backend) and run:
//! `cargo test --test integration -- --ignored`

use reqwest::Client;
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

const BASE_URL: &str = "http://localhost:8080";

/// ISBN unique to this run, so tests can be repeated against one database
fn unique_isbn(tag: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    format!("{}-{}", tag, nanos)
}

async fn create_book(client: &Client, isbn: &str) -> Value {
    let response = client
        .post(format!("{}/api/books", BASE_URL))
        .json(&json!({
            "title": "The Name of the Rose",
            "author": "Umberto Eco",
            "isbn": isbn
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    response.json().await.expect("Failed to parse response")
}

async fn create_loan(client: &Client, isbn: &str, customer: &str) -> reqwest::Response {
    client
        .post(format!("{}/api/loans", BASE_URL))
        .json(&json!({
            "isbn": isbn,
            "customer": customer,
            "email": "reader@example.com"
        }))
        .send()
        .await
        .expect("Failed to send request")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_readiness_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_duplicate_isbn_rejected() {
    let client = Client::new();
    let isbn = unique_isbn("dup");
    create_book(&client, &isbn).await;

    let response = client
        .post(format!("{}/api/books", BASE_URL))
        .json(&json!({ "title": "Other", "author": "Someone", "isbn": isbn }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["errors"].is_array());
}

#[tokio::test]
#[ignore]
async fn test_loan_lifecycle() {
    let client = Client::new();
    let isbn = unique_isbn("loan");
    create_book(&client, &isbn).await;

    let response = create_loan(&client, &isbn, "Ana").await;
    assert_eq!(response.status(), 201);
    let loan_id: i64 = response.json().await.expect("Failed to parse loan id");

    let response = create_loan(&client, &isbn, "Ben").await;
    assert_eq!(response.status(), 400);

    let response = client
        .patch(format!("{}/api/loans/{}", BASE_URL, loan_id))
        .json(&json!({ "returned": true }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);

    let response = create_loan(&client, &isbn, "Ben").await;
    assert_eq!(response.status(), 201);

    let response = client
        .get(format!("{}/api/loans?isbn={}", BASE_URL, isbn))
        .send()
        .await
        .expect("Failed to send request");
    let page: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(page["total"], 2);
}

#[tokio::test]
#[ignore]
async fn test_get_unknown_loan() {
    let client = Client::new();

    let response = client
        .get(format!("{}/api/loans/{}", BASE_URL, i64::MAX))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_list_overdue() {
    let client = Client::new();

    let response = client
        .get(format!("{}/api/loans/overdue", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body.is_array());
}
