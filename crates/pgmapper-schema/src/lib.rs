//! pgmapper-schema
//!
//! Table schema descriptions for pgmapper, plus the two schema collaborators the
//! repository layer relies on:
//!
//! - **Introspection**: read one table's live shape (columns, types, nullability,
//!   primary key) from `pg_catalog`.
//! - **Diff**: compare a desired table description with the live one and produce the
//!   ordered DDL statements that reconcile them.
//!
//! # Example
//!
//! ```ignore
//! use pgmapper_schema::{ColumnSchema, TableSchema, diff_table};
//!
//! let desired = TableSchema::new("users")
//!     .with_column(ColumnSchema::new("id", "bigint").nullable(false))
//!     .with_column(ColumnSchema::new("email", "text"))
//!     .with_primary_key(["id"]);
//!
//! // Table missing: a single CREATE TABLE.
//! let stmts = diff_table(&desired, None);
//! assert_eq!(stmts.len(), 1);
//! ```

pub mod client;
pub mod diff;
pub mod error;
pub mod ident;
pub mod introspect;
pub mod schema;

pub use client::{RowExt, SchemaClient};
pub use diff::{DiffOptions, create_table_sql, diff_table, diff_table_with};
pub use ident::{base_name, name_parts, pkey_name, quote_ident, quote_part};
pub use error::{SchemaError, SchemaResult};
pub use introspect::load_table_schema;
pub use schema::{ColumnSchema, TableSchema, canonical_type};
