//! Query builders.
//!
//! One builder per statement kind. Each accumulates a single statement's intent and
//! renders a [`Statement`] with `$n` placeholders whose indices are computed at build
//! time. Identifiers are validated while building; any invalid table, column or sort
//! direction fails with `InvalidArgument` instead of reaching the backend.
//!
//! # Usage
//!
//! ```ignore
//! use pgmapper::qb::{self, SqlQb};
//!
//! let stmt = qb::select("users")
//!     .eq("status", "active")
//!     .order_by_dir("created_at", "desc")
//!     .limit(20)
//!     .build()?;
//!
//! let stmt = qb::update("users")
//!     .set("status", "inactive")
//!     .eq("id", user_id)
//!     .build()?;
//! ```

mod delete;
mod expr;
mod insert;
mod param;
mod select;
mod statement;
mod traits;
mod update;

pub use delete::DeleteQb;
pub use expr::{Expr, ExprGroup};
pub use insert::InsertQb;
pub use param::{Param, ParamList};
pub use select::SelectQb;
pub use statement::Statement;
pub use traits::SqlQb;
pub use update::UpdateQb;

/// Create a SELECT query builder for the given table.
pub fn select(table: &str) -> SelectQb {
    SelectQb::new(table)
}

/// Create a `SELECT COUNT(*) AS count` query builder for the given table.
pub fn count(table: &str) -> SelectQb {
    SelectQb::count(table)
}

/// Create an INSERT query builder for the given table.
pub fn insert(table: &str) -> InsertQb {
    InsertQb::new(table)
}

/// Create an UPDATE query builder for the given table.
pub fn update(table: &str) -> UpdateQb {
    UpdateQb::new(table)
}

/// Create a DELETE query builder for the given table.
///
/// A delete without WHERE conditions fails to build.
pub fn delete(table: &str) -> DeleteQb {
    DeleteQb::new(table)
}
