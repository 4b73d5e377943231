use std::borrow::Cow;

use bookstore_http::{AppError, AppResult};
use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::validation::{object_ids, parse_ids, validated};

/// Shelf a book is sold under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    History,
    Fantasy,
    Romance,
    Horror,
}

impl Category {
    pub const NAMES: [&'static str; 4] = ["history", "fantasy", "romance", "horror"];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "history" => Some(Category::History),
            "fantasy" => Some(Category::Fantasy),
            "romance" => Some(Category::Romance),
            "horror" => Some(Category::Horror),
            _ => None,
        }
    }
}

/// Book as stored in the `books` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub id: Option<ObjectId>,
    pub asin: String,
    pub title: String,
    pub price: f64,
    pub category: Category,
    pub img: String,
    /// Ids of the book's authors, expanded to names on reads
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub authors: Vec<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub created_at: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub updated_at: Option<DateTime>,
}

/// Body of `POST /books`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    #[validate(required, length(min = 1))]
    pub asin: Option<String>,
    #[validate(required, length(min = 1))]
    pub title: Option<String>,
    #[validate(required, range(exclusive_min = 0.0))]
    pub price: Option<f64>,
    #[validate(required, custom(function = "known_category"))]
    pub category: Option<String>,
    #[validate(required, length(min = 1))]
    pub img: Option<String>,
    #[validate(custom(function = "object_ids"))]
    pub authors: Option<Vec<String>>,
}

impl NewBook {
    fn into_book(self) -> Option<Book> {
        Some(Book {
            id: None,
            asin: self.asin?,
            title: self.title?,
            price: self.price?,
            category: Category::from_name(&self.category?)?,
            img: self.img?,
            authors: parse_ids(&self.authors.unwrap_or_default())?,
            created_at: None,
            updated_at: None,
        })
    }
}

/// Rejects names outside [`Category::NAMES`].
pub fn known_category(name: &str) -> Result<(), ValidationError> {
    match Category::from_name(name) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("enum").with_message(Cow::Owned(format!(
            "`{}` is not a valid enum value for path `category`.",
            name
        )))),
    }
}

impl Book {
    /// Validates a `POST /books` body.
    pub fn from_payload(body: &Value) -> AppResult<Self> {
        validated::<NewBook>(body)?
            .into_book()
            .ok_or_else(|| AppError::bad_request("incomplete book"))
    }
}

/// Author names a book read expands its `authors` ids into.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthorName {
    #[serde(rename = "_id")]
    #[schema(value_type = String)]
    pub id: ObjectId,
    pub first_name: String,
    pub last_name: String,
}

/// One page of `GET /books`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookPage {
    #[schema(value_type = Object)]
    pub links: bookstore_query::Links,
    pub total: u64,
    pub total_pages: u64,
    #[schema(value_type = Vec<Object>)]
    pub books: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body() -> Value {
        json!({
            "asin": "B000FC0SIM",
            "title": "The Hobbit",
            "price": 12.99,
            "category": "fantasy",
            "img": "https://img.example/hobbit.jpg",
        })
    }

    #[test]
    fn a_complete_body_is_a_book() {
        let book = Book::from_payload(&body()).unwrap();
        assert_eq!(book.category, Category::Fantasy);
        assert!(book.authors.is_empty());
        assert!(book.id.is_none());
    }

    #[test]
    fn every_violation_is_reported() {
        let mut body = body();
        body["price"] = json!(-1);
        body["category"] = json!("poetry");
        body.as_object_mut().unwrap().remove("img");

        match Book::from_payload(&body).unwrap_err() {
            bookstore_http::AppError::Validation { details, .. } => {
                let fields: Vec<_> = details.iter().map(|d| d["field"].clone()).collect();
                assert_eq!(fields, vec![json!("category"), json!("img"), json!("price")]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn author_ids_are_parsed() {
        let mut body = body();
        body["authors"] = json!(["64b7f0c2a1b2c3d4e5f60718"]);
        let book = Book::from_payload(&body).unwrap();
        assert_eq!(
            book.authors,
            vec![ObjectId::parse_str("64b7f0c2a1b2c3d4e5f60718").unwrap()]
        );

        body["authors"] = json!(["64b7f0c2a1b2c3d4e5f60718", "tolkien"]);
        assert!(matches!(
            Book::from_payload(&body),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn serialized_book_omits_unset_system_fields() {
        let book = Book::from_payload(&body()).unwrap();
        let document = bookstore_db::to_document(&book).unwrap();
        assert!(!document.contains_key("_id"));
        assert!(!document.contains_key("createdAt"));
        assert_eq!(document.get_str("category").unwrap(), "fantasy");
    }
}
