//! Rendered statements.

use tokio_postgres::types::{ToSql, Type};

use crate::qb::param::Param;

/// SQL text with `$1..$n` placeholders and its ordered parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Param>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<Param>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Get parameters as references for tokio-postgres.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(Param::as_ref).collect()
    }

    /// Declared parameter types, when every parameter carries one.
    pub fn param_types(&self) -> Option<Vec<Type>> {
        self.params.iter().map(Param::pg_type).collect()
    }
}
