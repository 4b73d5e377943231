//! Document persistence for the bookstore.
//!
//! Modules talk to a [`DocumentStore`] trait object; [`MongoStore`] backs it in
//! production and [`MemoryStore`] in tests or when `database.backend = "memory"`.

pub mod codec;
pub mod error;
pub mod json;
pub mod memory;
pub mod mongo;
pub mod store;
pub mod timestamps;

pub use codec::{from_document, to_document};
pub use error::{StoreError, StoreResult};
pub use json::{bson_to_json, document_to_json};
pub use memory::MemoryStore;
pub use mongo::{MongoConfig, MongoStore};
pub use store::{DocumentStore, IndexSpec, SharedStore};
pub use timestamps::{CREATED_AT, UPDATED_AT};
