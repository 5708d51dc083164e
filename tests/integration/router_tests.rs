//! Router tests against the in-memory backend, no server or database needed

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use biblioteca_server::{
    api,
    config::{AppConfig, StorageBackend},
    repository::Repository,
    services::{email::EmailService, Services},
    AppState,
};

fn app() -> Router {
    let mut config = AppConfig::default();
    config.storage.backend = StorageBackend::Memory;
    let notifier = Arc::new(EmailService::new(config.email.clone()));
    let services = Services::new(Repository::in_memory(), notifier, &config.overdue);
    api::router(AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    })
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn add_book(app: &Router, title: &str, author: &str, isbn: &str) -> Value {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/books",
        Some(json!({ "title": title, "author": author, "isbn": isbn })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

async fn lend(app: &Router, isbn: &str, customer: &str) -> (StatusCode, Value) {
    call(
        app,
        Method::POST,
        "/api/loans",
        Some(json!({ "isbn": isbn, "customer": customer, "email": "reader@example.com" })),
    )
    .await
}

#[tokio::test]
async fn test_health_and_ready() {
    let app = app();

    let (status, body) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = call(&app, Method::GET, "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["storage"], "memory");
}

#[tokio::test]
async fn test_add_book_then_duplicate_isbn() {
    let app = app();

    let book = add_book(&app, "Dune", "Frank Herbert", "978-0441013593").await;
    assert_eq!(book["id"], 1);
    assert_eq!(book["isbn"], "978-0441013593");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/books",
        Some(json!({ "title": "Dune (reprint)", "author": "F. Herbert", "isbn": "978-0441013593" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"].as_array().map(Vec::len), Some(1));
    assert!(body["errors"][0].as_str().unwrap().contains("978-0441013593"));

    let (_, page) = call(&app, Method::GET, "/api/books?isbn=978-0441013593", None).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["title"], "Dune");
}

#[tokio::test]
async fn test_book_validation_reports_every_field() {
    let app = app();

    let (status, body) = call(&app, Method::POST, "/api/books", Some(json!({ "isbn": "1" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().any(|e| e.as_str().unwrap().contains("title")));
    assert!(errors.iter().any(|e| e.as_str().unwrap().contains("author")));
}

#[tokio::test]
async fn test_blank_book_fields_are_rejected() {
    let app = app();

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/books",
        Some(json!({ "title": "   ", "author": " ", "isbn": "9" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"].as_array().map(Vec::len), Some(2));

    let (_, page) = call(&app, Method::GET, "/api/books", None).await;
    assert_eq!(page["total"], 0);

    add_book(&app, "Dune", "Frank Herbert", "9").await;
    let (status, _) = call(
        &app,
        Method::PUT,
        "/api/books/1",
        Some(json!({ "title": "  ", "author": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, book) = call(&app, Method::GET, "/api/books/1", None).await;
    assert_eq!(book["title"], "Dune");
    assert_eq!(book["author"], "Frank Herbert");
}

#[tokio::test]
async fn test_huge_page_number_returns_empty_page() {
    let app = app();
    add_book(&app, "Dune", "Frank Herbert", "9").await;

    let uri = format!("/api/books?page={}", i64::MAX);
    let (status, page) = call(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"], json!([]));

    let uri = format!("/api/loans?customer=Ana&page={}", i64::MAX);
    let (status, _) = call(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_lend_return_lend_again() {
    let app = app();
    add_book(&app, "Emma", "Jane Austen", "111").await;

    let (status, id) = lend(&app, "111", "Ana").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(id, json!(1));

    let (status, body) = lend(&app, "111", "Ben").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"][0].as_str().unwrap().contains("111"));

    let (status, body) = call(
        &app,
        Method::PATCH,
        "/api/loans/1",
        Some(json!({ "returned": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);

    let (_, loan) = call(&app, Method::GET, "/api/loans/1", None).await;
    assert_eq!(loan["returned"], true);
    assert_eq!(loan["isbn"], "111");

    let (status, id) = lend(&app, "111", "Ben").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(id, json!(2));

    let (_, history) = call(&app, Method::GET, "/api/books/1/loans", None).await;
    assert_eq!(history["total"], 2);
}

#[tokio::test]
async fn test_returning_twice_is_a_conflict() {
    let app = app();
    add_book(&app, "Emma", "Jane Austen", "111").await;
    lend(&app, "111", "Ana").await;

    let patch = Some(json!({ "returned": true }));
    let (status, _) = call(&app, Method::PATCH, "/api/loans/1", patch.clone()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, Method::PATCH, "/api/loans/1", patch).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let app = app();

    let (status, _) = call(&app, Method::GET, "/api/books/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, Method::GET, "/api/loans/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = lend(&app, "no-such-isbn", "Ana").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_loan_search_matches_isbn_or_customer() {
    let app = app();
    add_book(&app, "Emma", "Jane Austen", "111").await;
    add_book(&app, "Ulysses", "James Joyce", "222").await;
    add_book(&app, "Walden", "Henry Thoreau", "333").await;
    lend(&app, "111", "Ana").await;
    lend(&app, "222", "Ben").await;
    lend(&app, "333", "Ana").await;

    let (status, page) = call(&app, Method::GET, "/api/loans?isbn=222&customer=Ana", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 3);

    let (_, page) = call(&app, Method::GET, "/api/loans?customer=Ben", None).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["isbn"], "222");

    let (_, page) = call(&app, Method::GET, "/api/loans?customer=Ana&size=1&page=1", None).await;
    assert_eq!(page["total"], 2);
    assert_eq!(page["page"], 1);
    assert_eq!(page["items"][0]["isbn"], "333");
}

#[tokio::test]
async fn test_loan_validation_errors() {
    let app = app();

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/loans",
        Some(json!({ "isbn": "", "customer": "", "email": "not-an-email" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn test_delete_book_blocked_while_loaned() {
    let app = app();
    add_book(&app, "Emma", "Jane Austen", "111").await;
    lend(&app, "111", "Ana").await;

    let (status, _) = call(&app, Method::DELETE, "/api/books/1", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    call(&app, Method::PATCH, "/api/loans/1", Some(json!({ "returned": true }))).await;

    let (status, _) = call(&app, Method::DELETE, "/api/books/1", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(&app, Method::GET, "/api/loans/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_fresh_loans_are_not_overdue() {
    let app = app();
    add_book(&app, "Emma", "Jane Austen", "111").await;
    lend(&app, "111", "Ana").await;

    let (status, body) = call(&app, Method::GET, "/api/loans/overdue", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = app();

    let (status, doc) = call(&app, Method::GET, "/api-docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/loans/{id}"].is_object());
}
