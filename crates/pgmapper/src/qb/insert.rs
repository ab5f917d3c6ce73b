//! INSERT query builder.

use crate::error::{OrmError, OrmResult};
use crate::ident;
use crate::qb::param::{Param, ParamList};
use crate::qb::statement::Statement;
use crate::qb::traits::SqlQb;
use crate::value::Value;

/// INSERT query builder. `Null` values are omitted from the column list.
#[derive(Clone, Debug)]
pub struct InsertQb {
    table: String,
    columns: Vec<(String, Param)>,
}

impl InsertQb {
    /// Create a new INSERT query builder.
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
        }
    }

    /// Set a column to an untyped value.
    pub fn set(self, column: &str, value: impl Into<Value>) -> Self {
        self.set_param(column, Param::new(value))
    }

    /// Set a column to a prepared parameter.
    pub fn set_param(mut self, column: &str, param: Param) -> Self {
        self.columns.push((column.to_string(), param));
        self
    }
}

impl SqlQb for InsertQb {
    fn build(&self) -> OrmResult<Statement> {
        let mut params = ParamList::new();
        let mut columns = Vec::with_capacity(self.columns.len());
        let mut placeholders = Vec::with_capacity(self.columns.len());

        for (column, param) in self.columns.iter().filter(|(_, p)| !p.is_null()) {
            columns.push(ident::quote(column)?);
            let idx = params.push(param.clone());
            placeholders.push(format!("${idx}"));
        }

        if columns.is_empty() {
            return Err(OrmError::invalid(format!(
                "insert into '{}' has no non-null values",
                self.table
            )));
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            ident::quote(&self.table)?,
            columns.join(", "),
            placeholders.join(", ")
        );
        Ok(Statement::new(sql, params.into_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_basic() {
        let stmt = InsertQb::new("users")
            .set("username", "alice")
            .set("email", "alice@example.com")
            .build()
            .unwrap();
        assert_eq!(stmt.sql, "INSERT INTO users (username, email) VALUES ($1, $2)");
        assert_eq!(stmt.params[0].value, Value::Text("alice".into()));
    }

    #[test]
    fn test_insert_skips_nulls() {
        let qb = InsertQb::new("users")
            .set("id", 1)
            .set("nickname", Value::Null)
            .set("email", "a@x.com");
        assert_eq!(
            qb.to_sql().unwrap(),
            "INSERT INTO users (id, email) VALUES ($1, $2)"
        );
    }

    #[test]
    fn test_insert_all_null_is_rejected() {
        let err = InsertQb::new("users").set("nickname", Value::Null).build().unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(InsertQb::new("users").build().unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_insert_rejects_bad_column() {
        let err = InsertQb::new("users").set("id) VALUES (1); --", 1).build().unwrap_err();
        assert!(err.is_invalid_argument());
    }
}
