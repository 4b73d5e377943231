//! HTTP handlers of the users resource.

mod purchases;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use bookstore_db::document_to_json;
use bookstore_http::{AppError, AppResult};
use bson::oid::ObjectId;
use serde_json::{json, Value};

use super::{models::User, repository::UserRepository};
use crate::{
    modules::books::repository::BookRepository,
    utils::{parse_id, render},
};

#[derive(Clone)]
pub struct UsersState {
    pub users: UserRepository,
    pub books: BookRepository,
}

impl UsersState {
    /// The stored user, or a not-found error naming the id as given.
    async fn user(&self, raw_id: &str) -> AppResult<(ObjectId, User)> {
        let id = parse_id(raw_id, "User")?;
        let user = self
            .users
            .get_by_id(&id)
            .await?
            .ok_or_else(|| AppError::resource_not_found("User", raw_id))?;
        Ok((id, user))
    }
}

pub fn router(state: UsersState) -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
        .route(
            "/{id}/purchaseHistory",
            get(purchases::list_purchases).post(purchases::append_purchase),
        )
        .route(
            "/{id}/purchaseHistory/{pid}",
            get(purchases::get_purchase)
                .put(purchases::update_purchase)
                .delete(purchases::delete_purchase),
        )
        .with_state(state)
}

/// `GET /users`
async fn list_users(State(state): State<UsersState>) -> AppResult<Json<Vec<Value>>> {
    let users = state.users.list().await?;
    Ok(Json(users.into_iter().map(document_to_json).collect()))
}

/// `POST /users`
async fn create_user(
    State(state): State<UsersState>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let Json(body) = body?;
    let user = User::from_payload(&body)?;
    let id = state.users.insert(&user).await?;

    tracing::info!(user_id = %id, "user created");
    Ok((StatusCode::CREATED, Json(json!({ "_id": id.to_hex() }))))
}

/// `GET /users/{id}`
async fn get_user(
    State(state): State<UsersState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let (_, user) = state.user(&id).await?;
    Ok(Json(render(&user)?))
}

/// `PUT /users/{id}`
async fn update_user(
    State(state): State<UsersState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let Json(patch) = body?;
    let (user_id, stored) = state.user(&id).await?;
    let merged = stored.merge(&patch)?;

    let updated = state
        .users
        .update(&user_id, &merged)
        .await?
        .ok_or_else(|| AppError::resource_not_found("User", &id))?;

    tracing::info!(user_id = %user_id, "user updated");
    Ok(Json(render(&updated)?))
}

/// `DELETE /users/{id}`
async fn delete_user(
    State(state): State<UsersState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let user_id = parse_id(&id, "User")?;
    if !state.users.delete(&user_id).await? {
        return Err(AppError::resource_not_found("User", &id));
    }

    tracing::info!(user_id = %user_id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
