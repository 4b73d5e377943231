pub mod models;
pub mod repository;
pub mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookstore_db::SharedStore;
use bookstore_kernel::Module;
use serde_json::json;

use self::{models::Author, repository::AuthorRepository};
use crate::utils::{error_response, schema_of, schema_ref};

/// Authors referenced by books
pub struct AuthorsModule {
    repository: AuthorRepository,
}

impl AuthorsModule {
    pub fn new(store: SharedStore) -> Self {
        Self {
            repository: AuthorRepository::new(store),
        }
    }
}

#[async_trait]
impl Module for AuthorsModule {
    fn name(&self) -> &'static str {
        "authors"
    }

    fn routes(&self) -> Router {
        routes::router(self.repository.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List authors",
                        "tags": ["Authors"],
                        "responses": {
                            "200": {
                                "description": "Every author",
                                "content": {
                                    "application/json": {
                                        "schema": { "type": "array", "items": schema_ref("Author") }
                                    }
                                }
                            }
                        }
                    },
                    "post": {
                        "summary": "Create an author",
                        "tags": ["Authors"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": { "schema": schema_ref("Author") }
                            }
                        },
                        "responses": {
                            "201": {
                                "description": "Id of the created author",
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
                        "summary": "Get an author",
                        "tags": ["Authors"],
                        "parameters": [{
                            "name": "id",
                            "in": "path",
                            "required": true,
                            "schema": { "type": "string" }
                        }],
                        "responses": {
                            "200": {
                                "description": "The author",
                                "content": {
                                    "application/json": { "schema": schema_ref("Author") }
                                }
                            },
                            "404": error_response("Author not found")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Author": schema_of::<Author>()
                }
            }
        }))
    }
}

/// Create a new instance of the authors module
pub fn create_module(store: SharedStore) -> Arc<dyn Module> {
    Arc::new(AuthorsModule::new(store))
}
