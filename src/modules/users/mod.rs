pub mod models;
pub mod repository;
pub mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookstore_db::{IndexSpec, SharedStore};
use bookstore_kernel::{InitCtx, Module};
use serde_json::{json, Value};

use self::{
    models::{Address, Purchase, User},
    repository::{UserRepository, COLLECTION},
    routes::UsersState,
};
use crate::{
    modules::books::repository::BookRepository,
    utils::{error_response, schema_of, schema_ref},
};

/// Users and their embedded purchase history
pub struct UsersModule {
    state: UsersState,
}

impl UsersModule {
    pub fn new(store: SharedStore) -> Self {
        Self {
            state: UsersState {
                users: UserRepository::new(store.clone()),
                books: BookRepository::new(store),
            },
        }
    }
}

fn id_parameter(name: &str) -> Value {
    json!({
        "name": name,
        "in": "path",
        "required": true,
        "schema": { "type": "string" }
    })
}

fn json_response(description: &str, schema: Value) -> Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": schema } }
    })
}

fn json_body(schema: Value) -> Value {
    json!({
        "required": true,
        "content": { "application/json": { "schema": schema } }
    })
}

#[async_trait]
impl Module for UsersModule {
    fn name(&self) -> &'static str {
        "users"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "users module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.state.clone())
    }

    fn indexes(&self) -> Vec<IndexSpec> {
        vec![IndexSpec::ascending(COLLECTION, "email")]
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let user = schema_ref("User");
        let purchase = schema_ref("Purchase");
        let user_id = id_parameter("id");
        let purchase_id = id_parameter("pid");

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List users",
                        "tags": ["Users"],
                        "responses": {
                            "200": json_response("Users as `{_id, firstName}`", json!({
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "_id": { "type": "string" },
                                        "firstName": { "type": "string" }
                                    }
                                }
                            }))
                        }
                    },
                    "post": {
                        "summary": "Create a user",
                        "tags": ["Users"],
                        "requestBody": json_body(user.clone()),
                        "responses": {
                            "201": json_response("Id of the created user", schema_ref("CreatedId")),
                            "400": error_response("Validation failed")
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get a user",
                        "tags": ["Users"],
                        "parameters": [user_id.clone()],
                        "responses": {
                            "200": json_response("The user", user.clone()),
                            "404": error_response("User not found")
                        }
                    },
                    "put": {
                        "summary": "Update a user",
                        "description": "Fields in the body replace stored ones; the result is validated as a whole.",
                        "tags": ["Users"],
                        "parameters": [user_id.clone()],
                        "requestBody": json_body(json!({ "type": "object" })),
                        "responses": {
                            "200": json_response("The updated user", user.clone()),
                            "400": error_response("Validation failed"),
                            "404": error_response("User not found")
                        }
                    },
                    "delete": {
                        "summary": "Delete a user",
                        "tags": ["Users"],
                        "parameters": [user_id.clone()],
                        "responses": {
                            "204": { "description": "Deleted" },
                            "404": error_response("User not found")
                        }
                    }
                },
                "/{id}/purchaseHistory": {
                    "get": {
                        "summary": "List a user's purchases",
                        "tags": ["Purchases"],
                        "parameters": [user_id.clone()],
                        "responses": {
                            "200": json_response("Purchases", json!({ "type": "array", "items": purchase.clone() })),
                            "404": error_response("User not found")
                        }
                    },
                    "post": {
                        "summary": "Buy a book",
                        "description": "Copies title, category, asin and price of the book into a new purchase.",
                        "tags": ["Purchases"],
                        "parameters": [user_id.clone()],
                        "requestBody": json_body(json!({
                            "type": "object",
                            "properties": { "bookId": { "type": "string" } },
                            "required": ["bookId"]
                        })),
                        "responses": {
                            "200": json_response("The updated user", user.clone()),
                            "404": error_response("User or book not found")
                        }
                    }
                },
                "/{id}/purchaseHistory/{pid}": {
                    "get": {
                        "summary": "Get a purchase",
                        "tags": ["Purchases"],
                        "parameters": [user_id.clone(), purchase_id.clone()],
                        "responses": {
                            "200": json_response("The purchase", purchase.clone()),
                            "404": error_response("User or purchase not found")
                        }
                    },
                    "put": {
                        "summary": "Update a purchase",
                        "tags": ["Purchases"],
                        "parameters": [user_id.clone(), purchase_id.clone()],
                        "requestBody": json_body(json!({ "type": "object" })),
                        "responses": {
                            "200": json_response("The updated user", user.clone()),
                            "400": error_response("Validation failed"),
                            "404": error_response("User or purchase not found")
                        }
                    },
                    "delete": {
                        "summary": "Remove a purchase",
                        "description": "Succeeds with the unchanged user when no purchase has the id.",
                        "tags": ["Purchases"],
                        "parameters": [user_id, purchase_id],
                        "responses": {
                            "200": json_response("The updated user", user),
                            "404": error_response("User not found")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "User": schema_of::<User>(),
                    "Address": schema_of::<Address>(),
                    "Purchase": schema_of::<Purchase>()
                }
            }
        }))
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "users module stopped");
        Ok(())
    }
}

/// Create a new instance of the users module
pub fn create_module(store: SharedStore) -> Arc<dyn Module> {
    Arc::new(UsersModule::new(store))
}
