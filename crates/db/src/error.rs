//! Errors surfaced by document store backends.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// A document could not be converted between BSON and a typed value.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// The store could not be reached or configured.
    #[error("initialization error: {0}")]
    Initialization(String),
    /// A document handed to the store is not usable as is.
    #[error("invalid document: {0}")]
    InvalidDocument(String),
    /// The filter tree cannot be executed by the backend.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    /// Failure reported by the underlying database.
    #[error("backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<bson::ser::Error> for StoreError {
    fn from(err: bson::ser::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<bson::de::Error> for StoreError {
    fn from(err: bson::de::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}
