//! Access to the `books` collection, with author expansion on reads.

use std::collections::HashMap;

use bookstore_db::{from_document, to_document, SharedStore, StoreResult};
use bookstore_query::{Expr, Projection, TranslatedQuery};
use bson::{oid::ObjectId, Bson, Document};

use super::models::Book;
use crate::modules::authors::repository::COLLECTION as AUTHORS;

pub const COLLECTION: &str = "books";
const AUTHORS_FIELD: &str = "authors";

#[derive(Debug, Clone)]
pub struct BookRepository {
    store: SharedStore,
}

impl BookRepository {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn count(&self, criteria: Option<&Expr>) -> StoreResult<u64> {
        self.store.count(COLLECTION, criteria).await
    }

    /// Pre-pagination total and the requested page, authors expanded. Ties in the
    /// requested sort are broken by `_id` so pages never overlap.
    pub async fn list_with_authors(
        &self,
        query: &TranslatedQuery,
    ) -> StoreResult<(u64, Vec<Document>)> {
        let criteria = query.criteria.as_ref();
        let options = query.options.clone().with_tiebreak("_id");

        let (total, mut books) = tokio::try_join!(
            self.count(criteria),
            self.store.find(COLLECTION, criteria, &options),
        )?;
        self.expand_authors(&mut books).await?;

        Ok((total, books))
    }

    /// The book with its authors expanded.
    pub async fn get_by_id(&self, id: &ObjectId) -> StoreResult<Option<Document>> {
        let Some(book) = self
            .store
            .find_by_id(COLLECTION, id, &Projection::all())
            .await?
        else {
            return Ok(None);
        };

        let mut books = vec![book];
        self.expand_authors(&mut books).await?;
        Ok(books.pop())
    }

    /// The book as stored, authors left as ids.
    pub async fn find(&self, id: &ObjectId) -> StoreResult<Option<Book>> {
        self.store
            .find_by_id(COLLECTION, id, &Projection::all())
            .await?
            .map(from_document::<Book>)
            .transpose()
    }

    pub async fn insert(&self, book: &Book) -> StoreResult<ObjectId> {
        self.store.insert(COLLECTION, to_document(book)?).await
    }

    /// Replaces author ids with `{_id, firstName, lastName}` documents, keeping their
    /// order. Ids without a stored author are dropped.
    async fn expand_authors(&self, books: &mut [Document]) -> StoreResult<()> {
        let mut ids: Vec<ObjectId> = Vec::new();
        for book in books.iter() {
            if let Ok(authors) = book.get_array(AUTHORS_FIELD) {
                for author in authors {
                    if let Bson::ObjectId(id) = author {
                        if !ids.contains(id) {
                            ids.push(*id);
                        }
                    }
                }
            }
        }
        if ids.is_empty() {
            return Ok(());
        }

        let authors: HashMap<ObjectId, Document> = self
            .store
            .find_by_ids(AUTHORS, &ids, &Projection::include(["firstName", "lastName"]))
            .await?
            .into_iter()
            .filter_map(|author| Some((author.get_object_id("_id").ok()?, author)))
            .collect();

        for book in books.iter_mut() {
            if let Ok(references) = book.get_array_mut(AUTHORS_FIELD) {
                let expanded = references
                    .iter()
                    .filter_map(|reference| match reference {
                        Bson::ObjectId(id) => authors.get(id).cloned().map(Bson::Document),
                        _ => None,
                    })
                    .collect();
                *references = expanded;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::models::Category;
    use bookstore_db::MemoryStore;
    use bookstore_query::QueryTranslator;
    use bson::doc;
    use std::sync::Arc;

    fn book(title: &str, price: f64, authors: Vec<ObjectId>) -> Book {
        Book {
            id: None,
            asin: format!("ASIN-{}", title),
            title: title.to_string(),
            price,
            category: Category::Fantasy,
            img: "https://img.example/cover.jpg".to_string(),
            authors,
            created_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn authors_are_expanded_in_order_and_missing_ones_dropped() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let tolkien = store
            .insert(AUTHORS, doc! { "firstName": "J.R.R.", "lastName": "Tolkien", "born": 1892 })
            .await
            .unwrap();
        let christopher = store
            .insert(AUTHORS, doc! { "firstName": "Christopher", "lastName": "Tolkien" })
            .await
            .unwrap();

        let repository = BookRepository::new(store);
        let id = repository
            .insert(&book("Silmarillion", 20.0, vec![christopher, ObjectId::new(), tolkien]))
            .await
            .unwrap();

        let found = repository.get_by_id(&id).await.unwrap().unwrap();
        let authors = found.get_array("authors").unwrap();
        assert_eq!(authors.len(), 2);
        let first = authors[0].as_document().unwrap();
        assert_eq!(first.get_str("firstName").unwrap(), "Christopher");
        assert!(!authors[1].as_document().unwrap().contains_key("born"));
    }

    #[tokio::test]
    async fn listing_counts_before_paginating() {
        let repository = BookRepository::new(Arc::new(MemoryStore::new()));
        for (title, price) in [("A", 5.0), ("B", 5.0), ("C", 7.0)] {
            repository.insert(&book(title, price, vec![])).await.unwrap();
        }

        let query = QueryTranslator::default()
            .translate("sort=price&limit=2&offset=1")
            .unwrap();
        let (total, page) = repository.list_with_authors(&query).await.unwrap();

        assert_eq!(total, 3);
        let titles: Vec<_> = page.iter().map(|b| b.get_str("title").unwrap()).collect();
        assert_eq!(titles, vec!["B", "C"]);
    }

    #[tokio::test]
    async fn typed_reads_keep_author_ids() {
        let repository = BookRepository::new(Arc::new(MemoryStore::new()));
        let author = ObjectId::new();
        let id = repository.insert(&book("Dune", 9.0, vec![author])).await.unwrap();

        let stored = repository.find(&id).await.unwrap().unwrap();
        assert_eq!(stored.authors, vec![author]);
        assert_eq!(stored.id, Some(id));
        assert!(stored.created_at.is_some());
    }
}
