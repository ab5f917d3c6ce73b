//! UPDATE query builder.

use crate::error::{OrmError, OrmResult};
use crate::ident;
use crate::qb::expr::ExprGroup;
use crate::qb::param::{Param, ParamList};
use crate::qb::statement::Statement;
use crate::qb::traits::SqlQb;
use crate::value::Value;

/// UPDATE query builder.
///
/// `Null` values are left out of the SET clause. Building without a non-null SET
/// value or without a WHERE condition fails with `InvalidArgument`.
#[derive(Clone, Debug)]
pub struct UpdateQb {
    table: String,
    set_fields: Vec<(String, Param)>,
    where_group: ExprGroup,
}

impl UpdateQb {
    /// Create a new UPDATE query builder.
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            set_fields: Vec::new(),
            where_group: ExprGroup::new(),
        }
    }

    /// SET column = value (untyped parameter)
    pub fn set(self, column: &str, value: impl Into<Value>) -> Self {
        self.set_param(column, Param::new(value))
    }

    /// SET column = value with a prepared parameter
    pub fn set_param(mut self, column: &str, param: Param) -> Self {
        self.set_fields.push((column.to_string(), param));
        self
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

impl SqlQb for UpdateQb {
    fn build(&self) -> OrmResult<Statement> {
        if self.where_group.is_empty() {
            return Err(OrmError::invalid(format!(
                "update of '{}' requires a non-empty filter",
                self.table
            )));
        }

        let mut params = ParamList::new();
        let mut set_parts = Vec::with_capacity(self.set_fields.len());
        for (column, param) in self.set_fields.iter().filter(|(_, p)| !p.is_null()) {
            let column = ident::quote(column)?;
            let idx = params.push(param.clone());
            set_parts.push(format!("{column} = ${idx}"));
        }

        if set_parts.is_empty() {
            return Err(OrmError::invalid(format!(
                "update of '{}' has no non-null values",
                self.table
            )));
        }

        let where_sql = self.where_group.build(&mut params)?;
        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            ident::quote(&self.table)?,
            set_parts.join(", "),
            where_sql
        );
        Ok(Statement::new(sql, params.into_vec()))
    }
}
