//! Validation of JSON request bodies.
//!
//! Bodies deserialize into request structs whose fields are all optional, so a missing
//! field is reported by `#[validate(required)]` alongside every other violated
//! constraint and a single 400 response can list them all.

use std::borrow::Cow;

use bookstore_http::{AppError, AppResult};
use bson::{oid::ObjectId, DateTime};
use chrono::{DateTime as ChronoDateTime, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError, ValidationErrors};

/// One violated constraint, rendered in the `details` of a validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub field: String,
    pub constraint: String,
    pub message: String,
}

/// Deserializes `body` into `T` and runs its validators.
pub fn validated<T: DeserializeOwned + Validate>(body: &Value) -> AppResult<T> {
    if !body.is_object() {
        return Err(AppError::bad_request("request body must be a JSON object"));
    }
    let request: T = serde_json::from_value(body.clone())
        .map_err(|err| AppError::bad_request(format!("invalid request body: {}", err)))?;
    request.validate().map_err(|errors| validation_error(&errors))?;
    Ok(request)
}

/// Violations sorted by field, named as the JSON body names them.
pub fn violations(errors: &ValidationErrors) -> Vec<Violation> {
    let mut found: Vec<Violation> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errors)| {
            let field = camel_case(&field);
            errors.iter().map(move |error| Violation {
                field: field.clone(),
                constraint: error.code.to_string(),
                message: describe(&field, error),
            })
        })
        .collect();
    found.sort_by(|a, b| a.field.cmp(&b.field));
    found
}

pub fn validation_error(errors: &ValidationErrors) -> AppError {
    let details = violations(errors)
        .iter()
        .map(|violation| serde_json::to_value(violation).unwrap_or(Value::Null))
        .collect();
    AppError::validation(details, "Validation failed")
}

fn describe(field: &str, error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }
    let param = |name: &str| error.params.get(name).map(Value::to_string);

    match &*error.code {
        "required" => format!("Path `{}` is required.", field),
        "length" => format!("Path `{}` must not be empty.", field),
        "range" => {
            let bounds: Vec<String> = ["min", "exclusive_min", "max"]
                .into_iter()
                .filter_map(|name| {
                    param(name).map(|bound| format!("{} {}", name.replace('_', " "), bound))
                })
                .collect();
            format!(
                "Path `{}` ({}) is outside the allowed range ({}).",
                field,
                param("value").unwrap_or_default(),
                bounds.join(", ")
            )
        }
        _ => format!("Path `{}` is invalid.", field),
    }
}

fn camel_case(name: &str) -> String {
    let mut camel = String::with_capacity(name.len());
    let mut upper = false;
    for ch in name.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            camel.extend(ch.to_uppercase());
            upper = false;
        } else {
            camel.push(ch);
        }
    }
    camel
}

/// RFC 3339 timestamp or `YYYY-MM-DD` day.
pub fn iso_date(text: &str) -> Result<(), ValidationError> {
    match parse_date(text) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("date").with_message(Cow::Owned(format!(
            "`{}` is not an ISO-8601 date.",
            text
        )))),
    }
}

/// Every entry is a 24-hex document id.
pub fn object_ids(ids: &[String]) -> Result<(), ValidationError> {
    match ids.iter().find(|id| ObjectId::parse_str(id.as_str()).is_err()) {
        None => Ok(()),
        Some(bad) => Err(ValidationError::new("objectId")
            .with_message(Cow::Owned(format!("`{}` is not a valid id.", bad)))),
    }
}

pub fn parse_date(text: &str) -> Option<DateTime> {
    if let Ok(parsed) = ChronoDateTime::parse_from_rfc3339(text) {
        return Some(DateTime::from_chrono(parsed.with_timezone(&Utc)));
    }
    let day = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
    Some(DateTime::from_chrono(day.and_hms_opt(0, 0, 0)?.and_utc()))
}

pub fn parse_ids(ids: &[String]) -> Option<Vec<ObjectId>> {
    ids.iter().map(|id| ObjectId::parse_str(id).ok()).collect()
}
