//! The document store seam shared by every backend.

use std::sync::Arc;

use async_trait::async_trait;
use bson::{oid::ObjectId, Document};
use bookstore_query::{Expr, FindOptions, Projection, SortKey};

use crate::error::StoreResult;

/// Store handle shared across modules and request handlers.
pub type SharedStore = Arc<dyn DocumentStore>;

/// Index declared by a module and created at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub collection: &'static str,
    pub keys: Vec<SortKey>,
    pub unique: bool,
}

impl IndexSpec {
    pub fn ascending(collection: &'static str, field: &str) -> Self {
        Self {
            collection,
            keys: vec![SortKey::asc(field)],
            unique: false,
        }
    }

    /// Conventional index name, `field_1` / `field_-1` joined with `_`.
    pub fn name(&self) -> String {
        self.keys
            .iter()
            .map(|key| format!("{}_{}", key.field, key.direction.as_i32()))
            .collect::<Vec<_>>()
            .join("_")
    }
}

/// Collection-level operations over BSON documents identified by an ObjectId `_id`.
///
/// Writes manage timestamps: `insert` stamps `createdAt` and `updatedAt`, every other
/// write re-stamps `updatedAt`. Operations addressing a single document return
/// `None` / `false` when no document has the given id.
#[async_trait]
pub trait DocumentStore: Send + Sync + std::fmt::Debug {
    /// Backend name used in logs.
    fn kind(&self) -> &'static str;

    /// Verifies the backend is reachable.
    async fn ping(&self) -> StoreResult<()>;

    /// Number of documents matching `criteria`, ignoring any pagination.
    async fn count(&self, collection: &str, criteria: Option<&Expr>) -> StoreResult<u64>;

    /// Matching documents, sorted, then skipped, then limited.
    async fn find(
        &self,
        collection: &str,
        criteria: Option<&Expr>,
        options: &FindOptions,
    ) -> StoreResult<Vec<Document>>;

    async fn find_by_id(
        &self,
        collection: &str,
        id: &ObjectId,
        projection: &Projection,
    ) -> StoreResult<Option<Document>>;

    /// Documents whose id is in `ids`, in no particular order. Unknown ids are skipped.
    async fn find_by_ids(
        &self,
        collection: &str,
        ids: &[ObjectId],
        projection: &Projection,
    ) -> StoreResult<Vec<Document>>;

    /// Inserts `document`, generating an `_id` when it has none.
    async fn insert(&self, collection: &str, document: Document) -> StoreResult<ObjectId>;

    /// Replaces the whole document and returns it as stored.
    async fn replace(
        &self,
        collection: &str,
        id: &ObjectId,
        document: Document,
    ) -> StoreResult<Option<Document>>;

    /// Removes the document, reporting whether one existed.
    async fn delete(&self, collection: &str, id: &ObjectId) -> StoreResult<bool>;

    /// Appends `element` to the array `field` and returns the updated document.
    async fn push(
        &self,
        collection: &str,
        id: &ObjectId,
        field: &str,
        element: Document,
    ) -> StoreResult<Option<Document>>;

    /// Removes every element of the array `field` whose `_id` is `element_id` and returns
    /// the updated document. Removing nothing is not an error.
    async fn pull(
        &self,
        collection: &str,
        id: &ObjectId,
        field: &str,
        element_id: &ObjectId,
    ) -> StoreResult<Option<Document>>;

    async fn ensure_index(&self, index: &IndexSpec) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookstore_query::SortKey;

    #[test]
    fn index_names_follow_the_mongo_convention() {
        let index = IndexSpec {
            collection: "books",
            keys: vec![SortKey::asc("category"), SortKey::desc("price")],
            unique: false,
        };
        assert_eq!(index.name(), "category_1_price_-1");
        assert_eq!(IndexSpec::ascending("users", "email").name(), "email_1");
    }
}
