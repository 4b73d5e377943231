//! Store-managed `createdAt` / `updatedAt` fields.

use bson::{oid::ObjectId, Bson, DateTime, Document};

pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";

/// Prepares a document for insertion: ensures an `_id` and stamps both timestamps.
pub fn stamp_insert(document: &mut Document, now: DateTime) -> ObjectId {
    let id = match document.get("_id") {
        Some(Bson::ObjectId(id)) => *id,
        _ => {
            let id = ObjectId::new();
            document.insert("_id", id);
            id
        }
    };
    document.insert(CREATED_AT, now);
    document.insert(UPDATED_AT, now);
    id
}

/// Prepares a replacement: pins `_id`, keeps `createdAt` from the stored document when
/// the replacement lacks one, and re-stamps `updatedAt`.
pub fn stamp_replace(
    document: &mut Document,
    id: ObjectId,
    created_at: Option<&Bson>,
    now: DateTime,
) {
    document.insert("_id", id);
    if !document.contains_key(CREATED_AT) {
        if let Some(created_at) = created_at {
            document.insert(CREATED_AT, created_at.clone());
        }
    }
    document.insert(UPDATED_AT, now);
}
