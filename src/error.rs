//! Error types for the store and its middlewares.

use thiserror::Error;

/// Errors raised by the store itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// `update` was called on a key that was never `set`.
    #[error("Cannot update \"{key}\": no initial value")]
    MissingValue { key: String },

    /// The stored payload is not of the type the caller asked for.
    #[error("Cannot update \"{key}\": stored value is {found}, not {expected}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Errors from a [`Storage`](crate::middleware::Storage) backend.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt storage file: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Errors that can occur while persisting or restoring a value.
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("No codec registered for type {type_name}")]
    Unregistered { type_name: &'static str },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
