//! DELETE query builder.

use crate::error::{OrmError, OrmResult};
use crate::ident;
use crate::qb::expr::ExprGroup;
use crate::qb::param::{Param, ParamList};
use crate::qb::statement::Statement;
use crate::qb::traits::SqlQb;
use crate::value::Value;

/// DELETE query builder. Building without a WHERE condition fails; there is no
/// way to delete every row through it.
#[derive(Clone, Debug)]
pub struct DeleteQb {
    table: String,
    where_group: ExprGroup,
}

impl DeleteQb {
    /// Create a new DELETE query builder.
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            where_group: ExprGroup::new(),
        }
    }

    /// Add WHERE: column = value (untyped parameter)
    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.where_group.eq(column, Param::new(value));
        self
    }

    /// Add a WHERE template with `?` placeholders.
    pub fn where_template(mut self, sql: &str, params: Vec<Param>) -> Self {
        self.where_group.template(sql, params);
        self
    }

    /// Replace the WHERE conditions.
    pub fn where_group(mut self, group: ExprGroup) -> Self {
        self.where_group = group;
        self
    }
}

impl SqlQb for DeleteQb {
    fn build(&self) -> OrmResult<Statement> {
        if self.where_group.is_empty() {
            return Err(OrmError::invalid(format!(
                "delete from '{}' requires a non-empty filter",
                self.table
            )));
        }

        let mut params = ParamList::new();
        let where_sql = self.where_group.build(&mut params)?;
        let sql = format!("DELETE FROM {} WHERE {}", ident::quote(&self.table)?, where_sql);
        Ok(Statement::new(sql, params.into_vec()))
    }
}
