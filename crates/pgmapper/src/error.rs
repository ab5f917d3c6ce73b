//! Error types for pgmapper

use thiserror::Error;

/// Result type alias for pgmapper operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for mapping and database operations.
///
/// Absence of rows is never an error: lookups return `Option`/`Vec`.
#[derive(Debug, Error)]
pub enum OrmError {
    /// A required argument was empty or malformed (empty row/filter, bad identifier, bad setup)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An object or target type is not handled by this mapper
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// A storage type could not be resolved, or a value does not fit it
    #[error("Conversion error for type '{type_name}': {message}")]
    Conversion { type_name: String, message: String },

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Schema introspection error
    #[error("Schema error: {0}")]
    Schema(#[from] pgmapper_schema::SchemaError),

    /// Failure reported by a non-PostgreSQL backend, or a rolled back batch
    #[error("Backend error: {0}")]
    Backend(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),
}

impl OrmError {
    /// Create an invalid argument error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create an unsupported type error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedType(message.into())
    }

    /// Create a conversion error for a storage type
    pub fn conversion(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conversion {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Check if this is an invalid argument error
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// Check if this is an unsupported type error
    pub fn is_unsupported_type(&self) -> bool {
        matches!(self, Self::UnsupportedType(_))
    }

    /// Check if this is a conversion error
    pub fn is_conversion(&self) -> bool {
        matches!(self, Self::Conversion { .. })
    }

    /// Check if the error came from the backend (connection, statement or transaction failure)
    pub fn is_backend(&self) -> bool {
        match self {
            Self::Connection(_)
            | Self::Query(_)
            | Self::UniqueViolation(_)
            | Self::Schema(_)
            | Self::Backend(_)
            | Self::Decode { .. } => true,
            #[cfg(feature = "pool")]
            Self::Pool(_) => true,
            _ => false,
        }
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Parse a tokio_postgres error into a more specific OrmError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            if db_err.code().code() == "23505" {
                let constraint = db_err.constraint().unwrap_or("unknown");
                return Self::UniqueViolation(format!("{}: {}", constraint, db_err.message()));
            }
        }
        if err.is_closed() {
            return Self::Connection(err.to_string());
        }
        Self::Query(err)
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for OrmError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
