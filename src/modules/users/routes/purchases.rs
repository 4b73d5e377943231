//! Handlers of the purchase history embedded in a user.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use bookstore_http::{AppError, AppResult};
use bson::{oid::ObjectId, DateTime};
use serde_json::Value;

use super::UsersState;
use crate::{
    modules::users::models::{Purchase, PurchaseRequest},
    utils::{parse_id, render},
    validation::validated,
};

/// `GET /users/{id}/purchaseHistory`
pub(super) async fn list_purchases(
    State(state): State<UsersState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<Value>>> {
    let (_, user) = state.user(&id).await?;
    let purchases = user
        .purchase_history
        .iter()
        .map(render)
        .collect::<AppResult<Vec<_>>>()?;
    Ok(Json(purchases))
}

/// `POST /users/{id}/purchaseHistory` with `{"bookId": ..}`: copies the book into a
/// new purchase. The book lookup and the append are two separate writes.
pub(super) async fn append_purchase(
    State(state): State<UsersState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let Json(body) = body?;
    let user_id = parse_id(&id, "User")?;

    let request: PurchaseRequest = validated(&body)?;
    let raw_book_id = request.book_id.unwrap_or_default();
    let book_id = parse_id(&raw_book_id, "Book")?;

    let book = state
        .books
        .find(&book_id)
        .await?
        .ok_or_else(|| AppError::resource_not_found("Book", &raw_book_id))?;
    let purchase = Purchase::of_book(&book, DateTime::now());

    let user = state
        .users
        .append_purchase(&user_id, &purchase)
        .await?
        .ok_or_else(|| AppError::resource_not_found("User", &id))?;

    tracing::info!(
        user_id = %user_id,
        book_id = %book_id,
        purchase_id = %purchase.id,
        "purchase recorded"
    );
    Ok(Json(render(&user)?))
}

/// `GET /users/{id}/purchaseHistory/{pid}`
pub(super) async fn get_purchase(
    State(state): State<UsersState>,
    Path((id, pid)): Path<(String, String)>,
) -> AppResult<Json<Value>> {
    let (_, user) = state.user(&id).await?;
    let purchase_id = parse_id(&pid, "Purchase")?;
    let purchase = user
        .purchase(&purchase_id)
        .ok_or_else(|| AppError::resource_not_found("Purchase", &pid))?;

    Ok(Json(render(purchase)?))
}

/// `PUT /users/{id}/purchaseHistory/{pid}`: rewrites the whole user with the patched
/// purchase in place.
pub(super) async fn update_purchase(
    State(state): State<UsersState>,
    Path((id, pid)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let Json(patch) = body?;
    let (user_id, mut user) = state.user(&id).await?;
    let purchase_id = parse_id(&pid, "Purchase")?;

    let purchase = user
        .purchase_mut(&purchase_id)
        .ok_or_else(|| AppError::resource_not_found("Purchase", &pid))?;
    *purchase = purchase.merge(&patch)?;

    let updated = state
        .users
        .update(&user_id, &user)
        .await?
        .ok_or_else(|| AppError::resource_not_found("User", &id))?;

    tracing::info!(user_id = %user_id, purchase_id = %purchase_id, "purchase updated");
    Ok(Json(render(&updated)?))
}

/// `DELETE /users/{id}/purchaseHistory/{pid}`: succeeds with the user even when no
/// purchase has that id.
pub(super) async fn delete_purchase(
    State(state): State<UsersState>,
    Path((id, pid)): Path<(String, String)>,
) -> AppResult<Json<Value>> {
    let user_id = parse_id(&id, "User")?;

    let Ok(purchase_id) = ObjectId::parse_str(&pid) else {
        // No stored purchase can carry a malformed id.
        let (_, user) = state.user(&id).await?;
        return Ok(Json(render(&user)?));
    };

    let user = state
        .users
        .remove_purchase(&user_id, &purchase_id)
        .await?
        .ok_or_else(|| AppError::resource_not_found("User", &id))?;

    tracing::info!(user_id = %user_id, purchase_id = %purchase_id, "purchase removed");
    Ok(Json(render(&user)?))
}
