//! HTTP handlers of the authors resource.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use bookstore_db::document_to_json;
use bookstore_http::{AppError, AppResult};
use serde_json::{json, Value};

use super::{models::Author, repository::AuthorRepository};
use crate::utils::parse_id;

pub fn router(repository: AuthorRepository) -> Router {
    Router::new()
        .route("/", get(list_authors).post(create_author))
        .route("/{id}", get(get_author))
        .with_state(repository)
}

async fn list_authors(State(repository): State<AuthorRepository>) -> AppResult<Json<Vec<Value>>> {
    let authors = repository.list().await?;
    Ok(Json(authors.into_iter().map(document_to_json).collect()))
}

async fn create_author(
    State(repository): State<AuthorRepository>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let Json(body) = body?;
    let author = Author::from_payload(&body)?;
    let id = repository.insert(&author).await?;

    tracing::info!(author_id = %id, "author created");
    Ok((StatusCode::CREATED, Json(json!({ "_id": id.to_hex() }))))
}

async fn get_author(
    State(repository): State<AuthorRepository>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let author_id = parse_id(&id, "Author")?;
    let author = repository
        .get_by_id(&author_id)
        .await?
        .ok_or_else(|| AppError::resource_not_found("Author", &id))?;

    Ok(Json(document_to_json(author)))
}
