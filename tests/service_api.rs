mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use tower::ServiceExt;

use common::{app, get};

#[tokio::test]
async fn health_check_answers() {
    let (app, _) = app().await;

    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn openapi_document_lists_every_resource() {
    let (app, _) = app().await;

    let (status, doc) = get(&app, "/docs/openapi.json").await;
    assert_eq!(status, StatusCode::OK);

    let paths = doc["paths"].as_object().unwrap();
    for path in [
        "/books",
        "/books/{id}",
        "/authors",
        "/users/{id}/purchaseHistory/{pid}",
    ] {
        assert!(paths.contains_key(path), "missing {}", path);
    }
    let schemas = doc["components"]["schemas"].as_object().unwrap();
    for schema in ["Book", "User", "Purchase", "Author", "ErrorResponse"] {
        assert!(schemas.contains_key(schema), "missing {}", schema);
    }
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let (app, _) = app().await;

    let (status, _) = get(&app, "/magazines").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
