//! In-process backend used for tests and local runs without a MongoDB server.

mod evaluator;

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bson::{oid::ObjectId, Bson, DateTime, Document};
use bookstore_query::{Expr, FindOptions, Projection};
use tokio::sync::RwLock;

use crate::{
    error::{StoreError, StoreResult},
    store::{DocumentStore, IndexSpec},
    timestamps::{stamp_insert, stamp_replace, CREATED_AT, UPDATED_AT},
};

use self::evaluator::{compare_documents, project, DocumentEvaluator};

type Collections = HashMap<String, Vec<Document>>;

/// Documents kept per collection in insertion order, which is also the natural order
/// of unsorted reads.
///
/// Clones share the same data. Queries scan the whole collection; indexes are
/// accepted but not maintained, so unique constraints are not enforced.
#[derive(Default, Clone, Debug)]
pub struct MemoryStore {
    collections: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn has_id(document: &Document, id: &ObjectId) -> bool {
    matches!(document.get("_id"), Some(Bson::ObjectId(stored)) if stored == id)
}

fn position(documents: &[Document], id: &ObjectId) -> Option<usize> {
    documents.iter().position(|document| has_id(document, id))
}

fn locate_mut<'a>(
    collections: &'a mut Collections,
    collection: &str,
    id: &ObjectId,
) -> Option<&'a mut Document> {
    let documents = collections.get_mut(collection)?;
    let index = position(documents, id)?;
    documents.get_mut(index)
}

fn filter(documents: &[Document], criteria: Option<&Expr>) -> StoreResult<Vec<Document>> {
    let mut matched = Vec::new();
    for document in documents {
        if DocumentEvaluator::matches(document, criteria)? {
            matched.push(document.clone());
        }
    }
    Ok(matched)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn count(&self, collection: &str, criteria: Option<&Expr>) -> StoreResult<u64> {
        let collections = self.collections.read().await;
        let Some(documents) = collections.get(collection) else {
            return Ok(0);
        };
        Ok(filter(documents, criteria)?.len() as u64)
    }

    async fn find(
        &self,
        collection: &str,
        criteria: Option<&Expr>,
        options: &FindOptions,
    ) -> StoreResult<Vec<Document>> {
        let mut matched = {
            let collections = self.collections.read().await;
            match collections.get(collection) {
                Some(documents) => filter(documents, criteria)?,
                None => return Ok(Vec::new()),
            }
        };

        if !options.sort.is_empty() {
            // `sort_by` is stable, so ties keep insertion order.
            matched.sort_by(|a, b| compare_documents(a, b, &options.sort));
        }

        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .map(|limit| usize::try_from(limit).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        Ok(matched
            .iter()
            .skip(skip)
            .take(limit)
            .map(|document| project(document, &options.projection))
            .collect())
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &ObjectId,
        projection: &Projection,
    ) -> StoreResult<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|documents| {
            position(documents, id).map(|index| project(&documents[index], projection))
        }))
    }

    async fn find_by_ids(
        &self,
        collection: &str,
        ids: &[ObjectId],
        projection: &Projection,
    ) -> StoreResult<Vec<Document>> {
        let collections = self.collections.read().await;
        let Some(documents) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(documents
            .iter()
            .filter(|document| {
                matches!(document.get("_id"), Some(Bson::ObjectId(id)) if ids.contains(id))
            })
            .map(|document| project(document, projection))
            .collect())
    }

    async fn insert(&self, collection: &str, mut document: Document) -> StoreResult<ObjectId> {
        let id = stamp_insert(&mut document, DateTime::now());
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();

        if position(documents, &id).is_some() {
            return Err(StoreError::InvalidDocument(format!(
                "duplicate _id {id} in {collection}"
            )));
        }
        documents.push(document);
        Ok(id)
    }

    async fn replace(
        &self,
        collection: &str,
        id: &ObjectId,
        mut document: Document,
    ) -> StoreResult<Option<Document>> {
        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(None);
        };
        let Some(index) = position(documents, id) else {
            return Ok(None);
        };

        let created_at = documents[index].get(CREATED_AT).cloned();
        stamp_replace(&mut document, *id, created_at.as_ref(), DateTime::now());
        documents[index] = document.clone();
        Ok(Some(document))
    }

    async fn delete(&self, collection: &str, id: &ObjectId) -> StoreResult<bool> {
        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(false);
        };
        match position(documents, id) {
            Some(index) => {
                documents.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn push(
        &self,
        collection: &str,
        id: &ObjectId,
        field: &str,
        element: Document,
    ) -> StoreResult<Option<Document>> {
        let mut collections = self.collections.write().await;
        let Some(document) = locate_mut(&mut collections, collection, id) else {
            return Ok(None);
        };

        match document
            .entry(field.to_string())
            .or_insert_with(|| Bson::Array(Vec::new()))
        {
            Bson::Array(items) => items.push(Bson::Document(element)),
            other => {
                return Err(StoreError::InvalidDocument(format!(
                    "cannot push to {field}: not an array but {:?}",
                    other.element_type()
                )))
            }
        }
        document.insert(UPDATED_AT, DateTime::now());
        Ok(Some(document.clone()))
    }

    async fn pull(
        &self,
        collection: &str,
        id: &ObjectId,
        field: &str,
        element_id: &ObjectId,
    ) -> StoreResult<Option<Document>> {
        let mut collections = self.collections.write().await;
        let Some(document) = locate_mut(&mut collections, collection, id) else {
            return Ok(None);
        };

        if let Ok(items) = document.get_array_mut(field) {
            items.retain(|item| !matches!(item, Bson::Document(element) if has_id(element, element_id)));
        }
        document.insert(UPDATED_AT, DateTime::now());
        Ok(Some(document.clone()))
    }

    async fn ensure_index(&self, index: &IndexSpec) -> StoreResult<()> {
        tracing::debug!(
            target: "bookstore-db",
            collection = index.collection,
            index = %index.name(),
            "memory store does not maintain indexes"
        );
        Ok(())
    }
}
