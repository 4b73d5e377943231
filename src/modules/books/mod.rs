pub mod models;
pub mod repository;
pub mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookstore_db::{IndexSpec, SharedStore};
use bookstore_kernel::{settings::Settings, InitCtx, Module};
use bookstore_query::{QueryTranslator, TranslatorOptions};
use serde_json::json;

use self::{
    models::{AuthorName, Book, BookPage, Category},
    repository::{BookRepository, COLLECTION},
    routes::BooksState,
};
use crate::utils::{error_response, schema_of, schema_ref};

/// Fields `q=` searches on books
pub const TEXT_FIELDS: [&str; 3] = ["title", "asin", "category"];

/// Books catalogue: filtered, paginated listing and author expansion
pub struct BooksModule {
    state: BooksState,
}

impl BooksModule {
    pub fn new(settings: &Settings, store: SharedStore) -> Self {
        let translator = QueryTranslator::new(TranslatorOptions {
            default_limit: settings.query.default_limit,
            max_limit: settings.query.max_limit,
            text_fields: TEXT_FIELDS.iter().map(|field| field.to_string()).collect(),
        });

        Self {
            state: BooksState {
                repository: BookRepository::new(store),
                translator: Arc::new(translator),
                base_url: settings.server.resource_url("books").into(),
            },
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            store = ctx.store.kind(),
            links_base = %self.state.base_url,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.state.clone())
    }

    fn indexes(&self) -> Vec<IndexSpec> {
        vec![
            IndexSpec::ascending(COLLECTION, "category"),
            IndexSpec::ascending(COLLECTION, "price"),
        ]
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let query_parameters: Vec<_> = [
            ("fields", "Comma separated fields to return; `-field` excludes"),
            ("omit", "Comma separated fields to leave out"),
            ("sort", "Comma separated sort keys; `-field` sorts descending"),
            ("offset", "Number of books to skip"),
            ("limit", "Page size, capped by the server"),
            ("q", "Case-insensitive search over title, asin and category"),
        ]
        .into_iter()
        .map(|(name, description)| {
            json!({
                "name": name,
                "in": "query",
                "required": false,
                "description": description,
                "schema": { "type": "string" }
            })
        })
        .collect();

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books",
                        "description": "Any other query parameter filters on the field it names: `field=value`, `field!=value`, `field>n`, `field<=date`, `field=a,b`, `field=/re/i`, `field`, `!field`.",
                        "tags": ["Books"],
                        "parameters": query_parameters,
                        "responses": {
                            "200": {
                                "description": "One page of books with pagination links",
                                "content": {
                                    "application/json": { "schema": schema_ref("BookPage") }
                                }
                            },
                            "400": error_response("Malformed query string"),
                            "500": error_response("Internal server error")
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": { "schema": schema_ref("Book") }
                            }
                        },
                        "responses": {
                            "201": {
                                "description": "Id of the created book",
                                "content": {
                                    "application/json": { "schema": schema_ref("CreatedId") }
                                }
                            },
                            "400": error_response("Validation failed")
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get a book with its authors",
                        "tags": ["Books"],
                        "parameters": [{
                            "name": "id",
                            "in": "path",
                            "required": true,
                            "schema": { "type": "string" }
                        }],
                        "responses": {
                            "200": {
                                "description": "The book, authors expanded to names",
                                "content": {
                                    "application/json": { "schema": schema_ref("Book") }
                                }
                            },
                            "404": error_response("Book not found")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": schema_of::<Book>(),
                    "BookPage": schema_of::<BookPage>(),
                    "Category": schema_of::<Category>(),
                    "AuthorName": schema_of::<AuthorName>(),
                    "CreatedId": {
                        "type": "object",
                        "properties": { "_id": { "type": "string" } },
                        "required": ["_id"]
                    }
                }
            }
        }))
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module(settings: &Settings, store: SharedStore) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(settings, store))
}
