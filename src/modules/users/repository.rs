//! Access to the `users` collection and the purchases embedded in it.

use bookstore_db::{from_document, to_document, SharedStore, StoreResult};
use bookstore_query::{FindOptions, Projection};
use bson::{oid::ObjectId, Document};

use super::models::{Purchase, User};

pub const COLLECTION: &str = "users";
pub const PURCHASES_FIELD: &str = "purchaseHistory";

#[derive(Debug, Clone)]
pub struct UserRepository {
    store: SharedStore,
}

impl UserRepository {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn insert(&self, user: &User) -> StoreResult<ObjectId> {
        self.store.insert(COLLECTION, to_document(user)?).await
    }

    /// Every user as `{_id, firstName}`, oldest first.
    pub async fn list(&self) -> StoreResult<Vec<Document>> {
        let options = FindOptions {
            projection: Projection::include(["firstName"]),
            limit: None,
            ..FindOptions::default()
        }
        .with_tiebreak("_id");
        self.store.find(COLLECTION, None, &options).await
    }

    pub async fn get_by_id(&self, id: &ObjectId) -> StoreResult<Option<User>> {
        self.store
            .find_by_id(COLLECTION, id, &Projection::all())
            .await?
            .map(from_document::<User>)
            .transpose()
    }

    /// Writes the whole user back, embedded purchases included, and returns what was
    /// stored.
    pub async fn update(&self, id: &ObjectId, user: &User) -> StoreResult<Option<User>> {
        self.store
            .replace(COLLECTION, id, to_document(user)?)
            .await?
            .map(from_document::<User>)
            .transpose()
    }

    pub async fn delete(&self, id: &ObjectId) -> StoreResult<bool> {
        self.store.delete(COLLECTION, id).await
    }

    pub async fn append_purchase(
        &self,
        id: &ObjectId,
        purchase: &Purchase,
    ) -> StoreResult<Option<User>> {
        self.store
            .push(COLLECTION, id, PURCHASES_FIELD, to_document(purchase)?)
            .await?
            .map(from_document::<User>)
            .transpose()
    }

    /// Removes the purchase if present. Returns `None` only when the user is missing.
    pub async fn remove_purchase(
        &self,
        id: &ObjectId,
        purchase_id: &ObjectId,
    ) -> StoreResult<Option<User>> {
        self.store
            .pull(COLLECTION, id, PURCHASES_FIELD, purchase_id)
            .await?
            .map(from_document::<User>)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::models::{Book, Category};
    use bookstore_db::MemoryStore;
    use bson::DateTime;
    use std::sync::Arc;

    fn user(first_name: &str) -> User {
        User {
            id: None,
            first_name: first_name.to_string(),
            last_name: "Tester".to_string(),
            email: format!("{}@example.com", first_name.to_lowercase()),
            date_of_birth: DateTime::from_millis(0),
            age: 30,
            professions: vec![],
            address: None,
            purchase_history: vec![],
            created_at: None,
            updated_at: None,
        }
    }

    fn purchase() -> Purchase {
        let book = Book {
            id: Some(ObjectId::new()),
            asin: "B01".to_string(),
            title: "Emma".to_string(),
            price: 3.0,
            category: Category::Romance,
            img: "https://img.example/emma.jpg".to_string(),
            authors: vec![],
            created_at: None,
            updated_at: None,
        };
        Purchase::of_book(&book, DateTime::now())
    }

    #[tokio::test]
    async fn list_only_exposes_first_names() {
        let repository = UserRepository::new(Arc::new(MemoryStore::new()));
        repository.insert(&user("Ada")).await.unwrap();
        repository.insert(&user("Grace")).await.unwrap();

        let users = repository.list().await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].keys().collect::<Vec<_>>(), vec!["_id", "firstName"]);
        assert_eq!(users[1].get_str("firstName").unwrap(), "Grace");
    }

    #[tokio::test]
    async fn purchases_round_trip_through_the_store() {
        let repository = UserRepository::new(Arc::new(MemoryStore::new()));
        let id = repository.insert(&user("Ada")).await.unwrap();
        let purchase = purchase();

        let updated = repository
            .append_purchase(&id, &purchase)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.purchase_history, vec![purchase.clone()]);

        let unchanged = repository
            .remove_purchase(&id, &ObjectId::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged.purchase_history.len(), 1);

        let emptied = repository
            .remove_purchase(&id, &purchase.id)
            .await
            .unwrap()
            .unwrap();
        assert!(emptied.purchase_history.is_empty());

        assert!(repository
            .append_purchase(&ObjectId::new(), &purchase)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn update_keeps_creation_time() {
        let repository = UserRepository::new(Arc::new(MemoryStore::new()));
        let id = repository.insert(&user("Ada")).await.unwrap();
        let mut stored = repository.get_by_id(&id).await.unwrap().unwrap();

        stored.age = 40;
        let updated = repository.update(&id, &stored).await.unwrap().unwrap();
        assert_eq!(updated.age, 40);
        assert_eq!(updated.created_at, stored.created_at);

        assert!(repository.delete(&id).await.unwrap());
        assert!(repository.get_by_id(&id).await.unwrap().is_none());
    }
}
