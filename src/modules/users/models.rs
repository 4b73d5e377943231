use bookstore_http::{AppError, AppResult};
use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    modules::books::models::{known_category, Book, Category},
    utils::render,
    validation::{iso_date, parse_date, validated},
};

/// Fields a client can never set through a body.
const SYSTEM_FIELDS: [&str; 4] = ["_id", "createdAt", "updatedAt", "purchaseHistory"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<i64>,
}

/// Snapshot of a book taken when it was bought. Later edits to the book do not reach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    #[serde(rename = "_id")]
    #[schema(value_type = String)]
    pub id: ObjectId,
    pub title: String,
    pub category: Category,
    pub asin: String,
    pub price: f64,
    #[schema(value_type = String, format = DateTime)]
    pub purchase_date: DateTime,
}

impl Purchase {
    /// Copies the sold fields of `book` under a fresh id.
    pub fn of_book(book: &Book, purchase_date: DateTime) -> Self {
        Self {
            id: ObjectId::new(),
            title: book.title.clone(),
            category: book.category,
            asin: book.asin.clone(),
            price: book.price,
            purchase_date,
        }
    }

    /// Applies a `PUT` patch and re-validates the record. The id never changes.
    pub fn merge(&self, patch: &Value) -> AppResult<Self> {
        let merged = overlay(render(self)?, patch, &["_id"])?;

        validated::<PurchaseFields>(&merged)?
            .into_purchase(self.id)
            .ok_or_else(|| AppError::bad_request("incomplete purchase"))
    }
}

/// Purchase fields a `PUT` may change, checked after the patch is applied.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct PurchaseFields {
    #[validate(required, length(min = 1))]
    title: Option<String>,
    #[validate(required, custom(function = "known_category"))]
    category: Option<String>,
    #[validate(required, length(min = 1))]
    asin: Option<String>,
    #[validate(required, range(exclusive_min = 0.0))]
    price: Option<f64>,
    #[validate(required, custom(function = "iso_date"))]
    purchase_date: Option<String>,
}

impl PurchaseFields {
    fn into_purchase(self, id: ObjectId) -> Option<Purchase> {
        Some(Purchase {
            id,
            title: self.title?,
            category: Category::from_name(&self.category?)?,
            asin: self.asin?,
            price: self.price?,
            purchase_date: parse_date(&self.purchase_date?)?,
        })
    }
}

/// Body of `POST /users`, and of `PUT /users/{id}` once merged onto the stored user.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct UserFields {
    #[validate(required, length(min = 1))]
    first_name: Option<String>,
    #[validate(required, length(min = 1))]
    last_name: Option<String>,
    #[validate(required, length(min = 1))]
    email: Option<String>,
    #[validate(required, custom(function = "iso_date"))]
    date_of_birth: Option<String>,
    #[validate(required, range(min = 18, max = 65))]
    age: Option<i64>,
    professions: Option<Vec<String>>,
    address: Option<Address>,
}

impl UserFields {
    fn into_user(self) -> Option<User> {
        Some(User {
            id: None,
            first_name: self.first_name?,
            last_name: self.last_name?,
            email: self.email?,
            date_of_birth: parse_date(&self.date_of_birth?)?,
            age: self.age?,
            professions: self.professions.unwrap_or_default(),
            address: self.address,
            purchase_history: Vec::new(),
            created_at: None,
            updated_at: None,
        })
    }
}

/// Body of `POST /users/{id}/purchaseHistory`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    #[validate(required, length(min = 1))]
    pub book_id: Option<String>,
}

/// User as stored in the `users` collection, purchases embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub id: Option<ObjectId>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[schema(value_type = String, format = DateTime)]
    pub date_of_birth: DateTime,
    pub age: i64,
    #[serde(default)]
    pub professions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default)]
    pub purchase_history: Vec<Purchase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub created_at: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub updated_at: Option<DateTime>,
}

impl User {
    /// Validates a `POST /users` body. Purchases are only added through their own
    /// endpoint, so a `purchaseHistory` in the body is ignored.
    pub fn from_payload(body: &Value) -> AppResult<Self> {
        validated::<UserFields>(body)?
            .into_user()
            .ok_or_else(|| AppError::bad_request("incomplete user"))
    }

    /// Applies a `PUT` patch onto the stored user and re-runs every validator on the
    /// result. Identity, timestamps and purchases are kept from the stored user.
    pub fn merge(&self, patch: &Value) -> AppResult<Self> {
        let merged = overlay(render(self)?, patch, &SYSTEM_FIELDS)?;

        let mut user = User::from_payload(&merged)?;
        user.id = self.id;
        user.purchase_history = self.purchase_history.clone();
        user.created_at = self.created_at;
        user.updated_at = self.updated_at;
        Ok(user)
    }

    pub fn purchase(&self, id: &ObjectId) -> Option<&Purchase> {
        self.purchase_history
            .iter()
            .find(|purchase| &purchase.id == id)
    }

    pub fn purchase_mut(&mut self, id: &ObjectId) -> Option<&mut Purchase> {
        self.purchase_history
            .iter_mut()
            .find(|purchase| &purchase.id == id)
    }
}

/// Copies the top-level keys of `patch` over `base`, skipping `protected` ones.
fn overlay(base: Value, patch: &Value, protected: &[&str]) -> AppResult<Value> {
    let Value::Object(patch) = patch else {
        return Err(AppError::bad_request("request body must be a JSON object"));
    };
    let mut merged = match base {
        Value::Object(base) => base,
        _ => Map::new(),
    };
    for (key, value) in patch {
        if !protected.contains(&key.as_str()) {
            merged.insert(key.clone(), value.clone());
        }
    }
    Ok(Value::Object(merged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body() -> Value {
        json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@example.com",
            "dateOfBirth": "1990-12-10",
            "age": 33,
            "professions": ["mathematician"],
            "address": { "street": "St James's Square", "number": 12 },
        })
    }

    fn book() -> Book {
        Book {
            id: Some(ObjectId::new()),
            asin: "B0000".to_string(),
            title: "Notes".to_string(),
            price: 9.5,
            category: Category::History,
            img: "https://img.example/notes.jpg".to_string(),
            authors: vec![],
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn age_is_bounded() {
        for (age, valid) in [(17, false), (18, true), (65, true), (66, false)] {
            let mut body = body();
            body["age"] = json!(age);
            assert_eq!(User::from_payload(&body).is_ok(), valid, "age {}", age);
        }
    }

    #[test]
    fn optional_fields_may_be_left_out() {
        let mut body = body();
        let object = body.as_object_mut().unwrap();
        object.remove("professions");
        object.remove("address");

        let user = User::from_payload(&body).unwrap();
        assert!(user.professions.is_empty());
        assert!(user.address.is_none());
    }

    #[test]
    fn merge_revalidates_and_keeps_identity() {
        let mut user = User::from_payload(&body()).unwrap();
        user.id = Some(ObjectId::new());
        user.purchase_history.push(Purchase::of_book(&book(), DateTime::now()));

        let renamed = user
            .merge(&json!({ "lastName": "King", "_id": "64b7f0c2a1b2c3d4e5f60718", "purchaseHistory": [] }))
            .unwrap();
        assert_eq!(renamed.last_name, "King");
        assert_eq!(renamed.id, user.id);
        assert_eq!(renamed.purchase_history.len(), 1);
        assert_eq!(renamed.date_of_birth, user.date_of_birth);

        assert!(user.merge(&json!({ "age": 70 })).is_err());
    }

    #[test]
    fn purchases_are_snapshots_with_their_own_id() {
        let book = book();
        let bought_at = DateTime::now();
        let purchase = Purchase::of_book(&book, bought_at);
        assert_ne!(Some(purchase.id), book.id);
        assert_eq!(purchase.title, book.title);
        assert_eq!(purchase.price, book.price);
        assert_eq!(purchase.purchase_date, bought_at);
    }

    #[test]
    fn violations_use_body_field_names() {
        let mut body = body();
        let object = body.as_object_mut().unwrap();
        object.remove("dateOfBirth");
        object.insert("firstName".to_string(), json!(""));

        let Err(AppError::Validation { details, .. }) = User::from_payload(&body) else {
            panic!("expected validation error");
        };
        let fields: Vec<_> = details.iter().map(|d| d["field"].as_str().unwrap()).collect();
        assert_eq!(fields, vec!["dateOfBirth", "firstName"]);
    }

    #[test]
    fn purchase_merge_ignores_the_id() {
        let purchase = Purchase::of_book(&book(), DateTime::from_millis(0));
        let merged = purchase
            .merge(&json!({ "_id": "64b7f0c2a1b2c3d4e5f60718", "price": 4.5 }))
            .unwrap();
        assert_eq!(merged.id, purchase.id);
        assert_eq!(merged.price, 4.5);
        assert_eq!(merged.purchase_date, purchase.purchase_date);

        assert!(purchase.merge(&json!({ "category": "cookbooks" })).is_err());
    }
}
