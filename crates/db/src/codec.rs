//! Conversions between typed models and stored documents.

use bson::Document;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::StoreResult;

pub fn to_document<T: Serialize>(value: &T) -> StoreResult<Document> {
    Ok(bson::to_document(value)?)
}

pub fn from_document<T: DeserializeOwned>(document: Document) -> StoreResult<T> {
    Ok(bson::from_document(document)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use bson::{doc, oid::ObjectId};
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Author {
        #[serde(rename = "_id")]
        id: ObjectId,
        first_name: String,
    }

    #[test]
    fn typed_values_map_to_camel_case_documents() {
        let author = Author {
            id: ObjectId::new(),
            first_name: "Ursula".to_string(),
        };
        let document = to_document(&author).unwrap();
        assert_eq!(document, doc! { "_id": author.id, "firstName": "Ursula" });
        assert_eq!(from_document::<Author>(document).unwrap(), author);
    }

    #[test]
    fn shape_mismatches_are_serialization_errors() {
        let err = from_document::<Author>(doc! { "firstName": 3 }).unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
