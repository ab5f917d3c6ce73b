//! Trait definitions for query builders.

use crate::error::OrmResult;
use crate::qb::statement::Statement;

/// Base trait for all query builders.
pub trait SqlQb {
    /// Validate the accumulated intent and render the statement.
    fn build(&self) -> OrmResult<Statement>;

    /// Debug helper to get the SQL string.
    fn to_sql(&self) -> OrmResult<String> {
        self.build().map(|stmt| stmt.sql)
    }
}
