//! Access to the `authors` collection.

use bookstore_db::{to_document, SharedStore, StoreResult};
use bookstore_query::{FindOptions, Projection};
use bson::{oid::ObjectId, Document};

use super::models::Author;

pub const COLLECTION: &str = "authors";

#[derive(Debug, Clone)]
pub struct AuthorRepository {
    store: SharedStore,
}

impl AuthorRepository {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn insert(&self, author: &Author) -> StoreResult<ObjectId> {
        self.store.insert(COLLECTION, to_document(author)?).await
    }

    /// Every author, oldest first.
    pub async fn list(&self) -> StoreResult<Vec<Document>> {
        let options = FindOptions {
            limit: None,
            ..FindOptions::default()
        }
        .with_tiebreak("_id");
        self.store.find(COLLECTION, None, &options).await
    }

    pub async fn get_by_id(&self, id: &ObjectId) -> StoreResult<Option<Document>> {
        self.store
            .find_by_id(COLLECTION, id, &Projection::all())
            .await
    }
}
