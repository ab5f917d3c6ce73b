//! Database client trait for pgmapper-schema
//!
//! Introspection only needs to run catalog queries, so this crate works against a
//! minimal trait instead of depending on pgmapper's backend.

use crate::error::{SchemaError, SchemaResult};
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// A trait for types that can run PostgreSQL catalog queries.
///
/// This is implemented for `tokio_postgres::Client` and `tokio_postgres::Transaction`.
/// Pooled clients deref to `tokio_postgres::Client`.
#[async_trait::async_trait]
pub trait SchemaClient: Sync {
    /// Execute a query and return all rows.
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> SchemaResult<Vec<Row>>;
}

#[async_trait::async_trait]
impl SchemaClient for tokio_postgres::Client {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> SchemaResult<Vec<Row>> {
        self.query(sql, params).await.map_err(SchemaError::from)
    }
}

#[async_trait::async_trait]
impl<'a> SchemaClient for tokio_postgres::Transaction<'a> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> SchemaResult<Vec<Row>> {
        self.query(sql, params).await.map_err(SchemaError::from)
    }
}

/// Extension trait for accessing row columns with better error handling.
pub trait RowExt {
    /// Get a column value by name, returning a SchemaError on failure.
    fn try_get_column<'a, T>(&'a self, column: &str) -> SchemaResult<T>
    where
        T: tokio_postgres::types::FromSql<'a>;
}

impl RowExt for Row {
    fn try_get_column<'a, T>(&'a self, column: &str) -> SchemaResult<T>
    where
        T: tokio_postgres::types::FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| SchemaError::decode(column, e.to_string()))
    }
}
