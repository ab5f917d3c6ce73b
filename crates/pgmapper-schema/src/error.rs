//! Error types for pgmapper-schema

use thiserror::Error;

/// Result type for pgmapper-schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Error type for pgmapper-schema operations.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Database error from tokio-postgres.
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),
    /// Invalid schema description (e.g., a primary key column that does not exist).
    #[error("Validation error: {0}")]
    Validation(String),
    /// Decode error when reading a catalog column.
    #[error("Decode error for column '{column}': {message}")]
    Decode { column: String, message: String },
}

impl SchemaError {
    /// Create a decode error.
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        SchemaError::Decode {
            column: column.into(),
            message: message.into(),
        }
    }
}
