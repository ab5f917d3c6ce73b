//! # pgmapper
//!
//! Object/row mapping for PostgreSQL with explicit SQL and a live-schema type codec.
//!
//! ## Features
//!
//! - Table-scoped CRUD through [`Database`], with filters and query options
//! - Per-entity field maps and a [`Repository`] that (de)normalizes entities
//! - Column types resolved by name through a [`TypeRegistry`]
//! - Schema sync: diff declared fields against the live table and apply in one transaction
//! - Pluggable [`Backend`]; [`PgBackend`] runs on a `deadpool-postgres` pool
//!
//! ## Example
//!
//! ```ignore
//! use pgmapper::prelude::*;
//!
//! #[derive(Debug, Default, Entity)]
//! struct User {
//!     id: i64,
//!     email: String,
//! }
//!
//! let database = Database::new(PgBackend::connect(&DatabaseConfig::from_env()?)?);
//! let users = Repository::<User, _>::builder("users")
//!     .field("id", "bigint", FieldOptions::new())
//!     .field("email", "string", FieldOptions::new())
//!     .primary("id")
//!     .build(database)?;
//!
//! users.create().await?;
//! users.insert(&User { id: 1, email: "a@x.com".into() }).await?;
//! let found = users.select(&Filter::new().eq("email", "a@x.com"), &QueryOptions::new()).await?;
//! ```

extern crate self as pgmapper;

pub mod backend;
pub mod codec;
pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod field_map;
pub mod ident;
pub mod options;
#[cfg(feature = "pool")]
pub mod pool;
pub mod prelude;
pub mod qb;
pub mod repository;
pub mod serializer;
pub mod types;
pub mod value;

pub use backend::Backend;
pub use codec::{ConvertOptions, TypeOverrides, ValueCodec};
pub use config::DatabaseConfig;
pub use database::Database;
pub use entity::Entity;
pub use error::{OrmError, OrmResult};
pub use field_map::{FieldDescriptor, FieldMap, FieldMapBuilder, FieldOptions, Mapper};
pub use options::{Filter, OrderBy, Predicate, QueryOptions};
pub use qb::{Param, SqlQb, Statement};
pub use repository::{DenormalizeContext, Repository, RepositoryBuilder};
pub use serializer::{Denormalizer, Normalizer, Serializer, SerializerContext};
pub use types::{BuiltinType, ColumnType, TypeRegistry};
pub use value::{FromValue, RowData, Value};

// Re-export schema types used in public signatures
pub use pgmapper_schema::{ColumnSchema, TableSchema};

#[cfg(feature = "pool")]
pub use backend::postgres::PgBackend;
#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_config};

// Re-export derive macros
#[cfg(feature = "derive")]
pub use pgmapper_derive::Entity;
