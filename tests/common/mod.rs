#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use bookstore_db::{MemoryStore, SharedStore};
use bookstore_kernel::settings::{DatabaseBackend, Settings};
use serde_json::Value;
use tower::ServiceExt;

/// Application over a fresh in-memory store, plus the store for direct seeding.
pub async fn app() -> (Router, SharedStore) {
    let mut settings = Settings::default();
    settings.database.backend = DatabaseBackend::Memory;

    let store: SharedStore = Arc::new(MemoryStore::new());
    let router = bookstore_app::build_app(&settings, store.clone())
        .await
        .expect("application should assemble");
    (router, store)
}

/// Sends one request and returns the status with the body parsed as JSON
/// (`Value::Null` when the body is empty).
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

pub async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn put(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::PUT, uri, Some(body)).await
}

pub async fn delete(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::DELETE, uri, None).await
}

/// Creates a resource and returns its id.
pub async fn create(app: &Router, uri: &str, body: Value) -> String {
    let (status, created) = post(app, uri, body).await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    created["_id"].as_str().unwrap().to_string()
}
