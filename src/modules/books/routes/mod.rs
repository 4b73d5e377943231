//! HTTP handlers of the books resource.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, RawQuery, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use bookstore_db::document_to_json;
use bookstore_http::{AppError, AppResult};
use bookstore_query::QueryTranslator;
use serde_json::{json, Value};

use super::{
    models::{Book, BookPage},
    repository::BookRepository,
};
use crate::utils::parse_id;

#[derive(Clone)]
pub struct BooksState {
    pub repository: BookRepository,
    pub translator: Arc<QueryTranslator>,
    /// Absolute collection URL pagination links point at
    pub base_url: Arc<str>,
}

pub fn router(state: BooksState) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/{id}", get(get_book))
        .with_state(state)
}

/// `GET /books?<query>`
async fn list_books(
    State(state): State<BooksState>,
    RawQuery(raw): RawQuery,
) -> AppResult<Json<BookPage>> {
    let query = state.translator.translate(raw.as_deref().unwrap_or_default())?;
    let (total, books) = state.repository.list_with_authors(&query).await?;

    tracing::debug!(total, returned = books.len(), "listed books");

    Ok(Json(BookPage {
        links: query.links(&state.base_url, total),
        total,
        total_pages: query.total_pages(total),
        books: books.into_iter().map(document_to_json).collect(),
    }))
}

/// `POST /books`
async fn create_book(
    State(state): State<BooksState>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let Json(body) = body?;
    let book = Book::from_payload(&body)?;
    let id = state.repository.insert(&book).await?;

    tracing::info!(book_id = %id, asin = %book.asin, "book created");
    Ok((StatusCode::CREATED, Json(json!({ "_id": id.to_hex() }))))
}

/// `GET /books/{id}`
async fn get_book(
    State(state): State<BooksState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let book_id = parse_id(&id, "Book")?;
    let book = state
        .repository
        .get_by_id(&book_id)
        .await?
        .ok_or_else(|| AppError::resource_not_found("Book", &id))?;

    Ok(Json(document_to_json(book)))
}
