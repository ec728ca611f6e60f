//! Error types for the persistence layer.

use thiserror::Error;

/// Errors that can occur in the persistence layer.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// A general error occurred during a data store operation.
    #[error("a data store operation failed: {0}")]
    OperationFailed(String),

    /// The requested item was not found in the data store.
    #[error("the requested item was not found: {0}")]
    NotFound(String),

    /// An error occurred during serialization or deserialization.
    #[error("failed to serialize or deserialize data: {0}")]
    SerializationError(String),

    /// An error occurred during a database migration.
    #[error("a data migration failed: {0}")]
    MigrationError(String),

    /// An invalid configuration or input was provided.
    #[error("an invalid configuration or input was provided: {0}")]
    InvalidInput(String),
}

impl PersistenceError {
    /// True iff this is a [`PersistenceError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, PersistenceError::NotFound(_))
    }
}
