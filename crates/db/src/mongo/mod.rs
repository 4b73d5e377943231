//! MongoDB backend.

mod query;

use std::time::Duration;

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, DateTime, Document};
use bookstore_query::{Expr, FindOptions, Projection};
use futures::TryStreamExt;
use mongodb::{
    options::{
        ClientOptions, FindOneOptions, FindOptions as MongoFindOptions, IndexOptions,
        ReturnDocument,
    },
    Client, Collection, Database, IndexModel,
};

use crate::{
    error::{StoreError, StoreResult},
    store::{DocumentStore, IndexSpec},
    timestamps::{stamp_insert, stamp_replace, CREATED_AT, UPDATED_AT},
};

use self::query::{projection_document, sort_document, MongoFilterTranslator};

/// Connection parameters for [`MongoStore::connect`].
#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    pub app_name: String,
    pub connect_timeout: Duration,
    pub max_pool_size: u32,
}

#[derive(Debug, Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    /// Parses the connection string, applies pool and timeout settings, and checks the
    /// server answers before handing the store out.
    pub async fn connect(config: &MongoConfig) -> StoreResult<Self> {
        let mut options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|e| StoreError::Initialization(e.to_string()))?;
        options.app_name = Some(config.app_name.clone());
        options.max_pool_size = Some(config.max_pool_size);
        options.connect_timeout = Some(config.connect_timeout);
        options.server_selection_timeout = Some(config.connect_timeout);

        let client =
            Client::with_options(options).map_err(|e| StoreError::Initialization(e.to_string()))?;
        let store = Self {
            db: client.database(&config.database),
            client,
        };

        store
            .ping()
            .await
            .map_err(|e| StoreError::Initialization(e.to_string()))?;
        tracing::info!(
            target: "bookstore-db",
            database = %config.database,
            "connected to MongoDB"
        );

        Ok(store)
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection(name)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn kind(&self) -> &'static str {
        "mongodb"
    }

    async fn ping(&self) -> StoreResult<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn count(&self, collection: &str, criteria: Option<&Expr>) -> StoreResult<u64> {
        let filter = MongoFilterTranslator::criteria(criteria)?;
        Ok(self.collection(collection).count_documents(filter).await?)
    }

    async fn find(
        &self,
        collection: &str,
        criteria: Option<&Expr>,
        options: &FindOptions,
    ) -> StoreResult<Vec<Document>> {
        let filter = MongoFilterTranslator::criteria(criteria)?;

        let mut find_options = MongoFindOptions::default();
        find_options.projection = projection_document(&options.projection);
        find_options.sort = sort_document(&options.sort);
        find_options.skip = Some(options.skip);
        find_options.limit = options
            .limit
            .map(|limit| i64::try_from(limit).unwrap_or(i64::MAX));

        let cursor = self
            .collection(collection)
            .find(filter)
            .with_options(find_options)
            .await?;

        Ok(cursor.try_collect().await?)
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: &ObjectId,
        projection: &Projection,
    ) -> StoreResult<Option<Document>> {
        let mut options = FindOneOptions::default();
        options.projection = projection_document(projection);

        Ok(self
            .collection(collection)
            .find_one(doc! { "_id": *id })
            .with_options(options)
            .await?)
    }

    async fn find_by_ids(
        &self,
        collection: &str,
        ids: &[ObjectId],
        projection: &Projection,
    ) -> StoreResult<Vec<Document>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut options = MongoFindOptions::default();
        options.projection = projection_document(projection);

        let cursor = self
            .collection(collection)
            .find(doc! { "_id": { "$in": ids.to_vec() } })
            .with_options(options)
            .await?;

        Ok(cursor.try_collect().await?)
    }

    async fn insert(&self, collection: &str, mut document: Document) -> StoreResult<ObjectId> {
        let id = stamp_insert(&mut document, DateTime::now());
        self.collection(collection).insert_one(document).await?;
        Ok(id)
    }

    async fn replace(
        &self,
        collection: &str,
        id: &ObjectId,
        mut document: Document,
    ) -> StoreResult<Option<Document>> {
        // Replacements built from a freshly read document already carry `createdAt`.
        let created_at = if document.contains_key(CREATED_AT) {
            None
        } else {
            self.find_by_id(collection, id, &Projection::include([CREATED_AT]))
                .await?
                .and_then(|stored| stored.get(CREATED_AT).cloned())
        };
        stamp_replace(&mut document, *id, created_at.as_ref(), DateTime::now());

        Ok(self
            .collection(collection)
            .find_one_and_replace(doc! { "_id": *id }, document)
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn delete(&self, collection: &str, id: &ObjectId) -> StoreResult<bool> {
        let result = self
            .collection(collection)
            .delete_one(doc! { "_id": *id })
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn push(
        &self,
        collection: &str,
        id: &ObjectId,
        field: &str,
        element: Document,
    ) -> StoreResult<Option<Document>> {
        Ok(self
            .collection(collection)
            .find_one_and_update(
                doc! { "_id": *id },
                doc! {
                    "$push": { field: element },
                    "$set": { UPDATED_AT: DateTime::now() },
                },
            )
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn pull(
        &self,
        collection: &str,
        id: &ObjectId,
        field: &str,
        element_id: &ObjectId,
    ) -> StoreResult<Option<Document>> {
        Ok(self
            .collection(collection)
            .find_one_and_update(
                doc! { "_id": *id },
                doc! {
                    "$pull": { field: { "_id": *element_id } },
                    "$set": { UPDATED_AT: DateTime::now() },
                },
            )
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn ensure_index(&self, index: &IndexSpec) -> StoreResult<()> {
        let keys = sort_document(&index.keys)
            .ok_or_else(|| StoreError::InvalidQuery("index without keys".to_string()))?;
        let model = IndexModel::builder()
            .keys(keys)
            .options(
                IndexOptions::builder()
                    .name(index.name())
                    .unique(index.unique)
                    .build(),
            )
            .build();

        self.collection(index.collection).create_index(model).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MongoConfig {
        MongoConfig {
            uri: std::env::var("BOOKSTORE_TEST_MONGO_URI")
                .unwrap_or_else(|_| "mongodb://127.0.0.1:27017".to_string()),
            database: "bookstore_test".to_string(),
            app_name: "bookstore-tests".to_string(),
            connect_timeout: Duration::from_secs(2),
            max_pool_size: 4,
        }
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn round_trip_against_a_live_server() {
        let store = MongoStore::connect(&config()).await.unwrap();
        let id = store
            .insert("books", doc! { "title": "Dune", "price": 9.5 })
            .await
            .unwrap();

        let found = store
            .find_by_id("books", &id, &Projection::all())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.get_str("title").unwrap(), "Dune");
        assert!(found.get_datetime(CREATED_AT).is_ok());

        assert!(store.delete("books", &id).await.unwrap());
        assert!(!store.delete("books", &id).await.unwrap());
    }
}
