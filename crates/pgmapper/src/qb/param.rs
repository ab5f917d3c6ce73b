//! Bound statement parameters.

use std::fmt;
use std::sync::Arc;
use tokio_postgres::types::{ToSql, Type};

use crate::types::ColumnType;
use crate::value::Value;

/// A bound parameter: a storage value, optionally tagged with the column type it
/// was converted with so the backend can declare the parameter type.
#[derive(Clone)]
pub struct Param {
    pub value: Value,
    pub column_type: Option<Arc<dyn ColumnType>>,
}

impl Param {
    /// An untyped parameter. The server infers its type.
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            column_type: None,
        }
    }

    /// A parameter bound with the given column type.
    pub fn typed(value: impl Into<Value>, column_type: Arc<dyn ColumnType>) -> Self {
        Self {
            value: value.into(),
            column_type: Some(column_type),
        }
    }

    /// Whether the value is `Null`.
    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    /// Declared PostgreSQL type, when the parameter is typed.
    pub fn pg_type(&self) -> Option<Type> {
        self.column_type.as_ref().map(|ty| ty.pg_type())
    }

    /// Get a reference to the value as a ToSql trait object.
    pub fn as_ref(&self) -> &(dyn ToSql + Sync) {
        &self.value
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Param");
        s.field("value", &self.value);
        s.field("type", &self.column_type.as_ref().map(|ty| ty.name()));
        s.finish()
    }
}

impl PartialEq for Param {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
            && self.column_type.as_ref().map(|ty| ty.name())
                == other.column_type.as_ref().map(|ty| ty.name())
    }
}

/// Ordered parameters of a statement being built.
#[derive(Clone, Debug, Default)]
pub struct ParamList {
    params: Vec<Param>,
}

impl ParamList {
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Add a parameter and return its 1-based index.
    pub fn push(&mut self, param: Param) -> usize {
        self.params.push(param);
        self.params.len()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn into_vec(self) -> Vec<Param> {
        self.params
    }
}
