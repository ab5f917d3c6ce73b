//! Convenient imports for typical `pgmapper` usage.
//!
//! ```ignore
//! use pgmapper::prelude::*;
//! ```

pub use crate::{
    Backend, Database, DatabaseConfig, Entity, FieldOptions, Filter, FromValue, OrmError, OrmResult,
    QueryOptions, Repository, RowData, Value,
};

#[cfg(feature = "pool")]
pub use crate::{PgBackend, create_pool};
