use bookstore_http::{AppError, AppResult};
use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use validator::Validate;

use crate::validation::validated;

/// Author as stored in the `authors` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub id: Option<ObjectId>,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub created_at: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub updated_at: Option<DateTime>,
}

/// Body of `POST /authors`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewAuthor {
    #[validate(required, length(min = 1))]
    pub first_name: Option<String>,
    #[validate(required, length(min = 1))]
    pub last_name: Option<String>,
}

impl Author {
    /// Validates a `POST /authors` body.
    pub fn from_payload(body: &Value) -> AppResult<Self> {
        let request: NewAuthor = validated(body)?;
        request
            .first_name
            .zip(request.last_name)
            .map(|(first_name, last_name)| Author {
                id: None,
                first_name,
                last_name,
                created_at: None,
                updated_at: None,
            })
            .ok_or_else(|| AppError::bad_request("incomplete author"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn both_names_are_required() {
        assert!(Author::from_payload(&json!({ "firstName": "Ursula" })).is_err());

        let author =
            Author::from_payload(&json!({ "firstName": "Ursula", "lastName": "Le Guin" })).unwrap();
        assert_eq!(author.last_name, "Le Guin");
    }
}
