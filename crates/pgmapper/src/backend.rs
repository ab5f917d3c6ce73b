//! The storage collaborator behind [`Database`](crate::Database).
//!
//! A backend runs rendered [`Statement`]s, reports live table schemas and applies
//! schema-sync batches atomically. Rows come back as storage-form [`RowData`]; the
//! database converts them to application form.

use pgmapper_schema::{TableSchema, diff_table};
use std::future::Future;
use std::sync::Arc;

use crate::error::OrmResult;
use crate::qb::Statement;
use crate::value::RowData;

#[cfg(feature = "pool")]
pub mod postgres;

pub trait Backend: Send + Sync {
    /// Run a statement and return its rows.
    fn query(&self, stmt: &Statement) -> impl Future<Output = OrmResult<Vec<RowData>>> + Send;

    /// Run a statement and return the affected row count.
    fn execute(&self, stmt: &Statement) -> impl Future<Output = OrmResult<u64>> + Send;

    /// Live schema of `table`, or `None` when it does not exist.
    fn table_schema(
        &self,
        table: &str,
    ) -> impl Future<Output = OrmResult<Option<TableSchema>>> + Send;

    /// Statements that turn `current` into `desired`.
    fn diff_schema(&self, desired: &TableSchema, current: Option<&TableSchema>) -> Vec<String> {
        diff_table(desired, current)
    }

    /// Run all statements in one transaction: all apply or none do.
    fn execute_batch(&self, statements: &[String]) -> impl Future<Output = OrmResult<()>> + Send;
}

impl<B: Backend> Backend for Arc<B> {
    fn query(&self, stmt: &Statement) -> impl Future<Output = OrmResult<Vec<RowData>>> + Send {
        (**self).query(stmt)
    }

    fn execute(&self, stmt: &Statement) -> impl Future<Output = OrmResult<u64>> + Send {
        (**self).execute(stmt)
    }

    fn table_schema(
        &self,
        table: &str,
    ) -> impl Future<Output = OrmResult<Option<TableSchema>>> + Send {
        (**self).table_schema(table)
    }

    fn diff_schema(&self, desired: &TableSchema, current: Option<&TableSchema>) -> Vec<String> {
        (**self).diff_schema(desired, current)
    }

    fn execute_batch(&self, statements: &[String]) -> impl Future<Output = OrmResult<()>> + Send {
        (**self).execute_batch(statements)
    }
}
