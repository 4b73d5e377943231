//! Helpers shared by the resource modules.

use bookstore_db::{document_to_json, to_document};
use bookstore_http::{AppError, AppResult};
use bson::oid::ObjectId;
use serde::Serialize;

/// Parses a path id. Anything that is not a 24-hex id cannot name a stored document,
/// so it is reported as not found for `resource`.
pub fn parse_id(raw: &str, resource: &str) -> AppResult<ObjectId> {
    ObjectId::parse_str(raw).map_err(|_| AppError::resource_not_found(resource, raw))
}

/// Response JSON of a typed model: hex ids and RFC 3339 dates.
pub fn render<T: Serialize>(value: &T) -> AppResult<serde_json::Value> {
    Ok(document_to_json(to_document(value)?))
}

/// JSON form of a model's OpenAPI schema, for the module fragments.
pub fn schema_of<T: utoipa::PartialSchema>() -> serde_json::Value {
    serde_json::to_value(T::schema()).unwrap_or(serde_json::Value::Null)
}

/// `{"$ref": "#/components/schemas/<name>"}`
pub fn schema_ref(name: &str) -> serde_json::Value {
    serde_json::json!({ "$ref": format!("#/components/schemas/{}", name) })
}

/// OpenAPI response object carrying the shared error body.
pub fn error_response(description: &str) -> serde_json::Value {
    serde_json::json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": schema_ref("ErrorResponse")
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn malformed_ids_are_not_found() {
        let err = parse_id("not-an-id", "User").unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "not found: User with id not-an-id not found!");
    }

    #[test]
    fn well_formed_ids_parse() {
        let id = ObjectId::new();
        assert_eq!(parse_id(&id.to_hex(), "Book").unwrap(), id);
    }
}
