//! Error types for the Folio document store.

use thiserror::Error;

/// Result type alias for document store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during document store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open database: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("collection {0:?} does not exist")]
    CollectionNotFound(String),

    #[error("collection {0:?} already exists")]
    CollectionExists(String),

    #[error("document {id} already exists in {collection:?}")]
    DuplicateId { collection: String, id: String },

    #[error("invalid collection name {0:?}")]
    InvalidName(String),

    #[error(transparent)]
    InvalidId(#[from] folio_core::InvalidId),
}
