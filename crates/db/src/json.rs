//! Rendering of stored documents as API JSON.
//!
//! Extended JSON would expose `{"$oid": ..}` and `{"$date": ..}` wrappers; responses
//! use plain hex ids and RFC 3339 timestamps instead.

use bson::{Bson, Document};
use serde_json::{Map, Number, Value};

pub fn document_to_json(document: Document) -> Value {
    Value::Object(
        document
            .into_iter()
            .map(|(key, value)| (key, bson_to_json(value)))
            .collect::<Map<_, _>>(),
    )
}

pub fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(flag) => Value::Bool(flag),
        Bson::Int32(number) => Value::from(number),
        Bson::Int64(number) => Value::from(number),
        Bson::Double(number) => Number::from_f64(number).map_or(Value::Null, Value::Number),
        Bson::String(text) | Bson::Symbol(text) => Value::String(text),
        Bson::ObjectId(id) => Value::String(id.to_hex()),
        Bson::DateTime(at) => match at.try_to_rfc3339_string() {
            Ok(text) => Value::String(text),
            Err(_) => Value::from(at.timestamp_millis()),
        },
        Bson::RegularExpression(re) => Value::String(format!("/{}/{}", re.pattern, re.options)),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::Document(document) => document_to_json(document),
        other => other.into_relaxed_extjson(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, oid::ObjectId, DateTime};
    use serde_json::json;

    #[test]
    fn ids_and_dates_render_as_plain_strings() {
        let id = ObjectId::parse_str("64b7f0c2a1b2c3d4e5f60718").unwrap();
        let document = doc! {
            "_id": id,
            "createdAt": DateTime::from_millis(0),
            "price": 9.5,
            "age": 30_i64,
            "authors": [ { "_id": id, "firstName": "Frank" } ],
            "img": Bson::Null,
        };

        assert_eq!(
            document_to_json(document),
            json!({
                "_id": "64b7f0c2a1b2c3d4e5f60718",
                "createdAt": "1970-01-01T00:00:00Z",
                "price": 9.5,
                "age": 30,
                "authors": [ { "_id": "64b7f0c2a1b2c3d4e5f60718", "firstName": "Frank" } ],
                "img": null,
            })
        );
    }

    #[test]
    fn non_finite_doubles_become_null() {
        assert_eq!(bson_to_json(Bson::Double(f64::NAN)), Value::Null);
    }
}
