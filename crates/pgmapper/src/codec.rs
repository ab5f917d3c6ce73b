//! Conversion between application values and storage values.
//!
//! Whole-row conversion consults the live [`TableSchema`]: only columns the table
//! actually has are converted. Anything else passes through unchanged and untyped,
//! so extra data reaches the backend (which reports the problem) instead of being
//! dropped or bound with a guessed type.

use indexmap::IndexMap;
use pgmapper_schema::TableSchema;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::OrmResult;
use crate::qb::Param;
use crate::types::{ColumnType, TypeRegistry};
use crate::value::{RowData, Value};

/// Column name → logical type name, taking precedence over the live column type.
pub type TypeOverrides = HashMap<String, String>;

/// Options for whole-row conversion.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertOptions<'a> {
    pub type_overrides: Option<&'a TypeOverrides>,
    /// Tag each converted [`Param`] with its resolved column type.
    pub include_type: bool,
}

impl<'a> ConvertOptions<'a> {
    pub fn with_overrides(type_overrides: &'a TypeOverrides) -> Self {
        Self {
            type_overrides: Some(type_overrides),
            include_type: false,
        }
    }

    pub fn include_type(mut self, include_type: bool) -> Self {
        self.include_type = include_type;
        self
    }
}

/// Value and row converter backed by a [`TypeRegistry`].
#[derive(Debug, Clone)]
pub struct ValueCodec {
    registry: Arc<TypeRegistry>,
}

impl ValueCodec {
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Convert one application value to its storage form.
    pub fn to_storage(&self, value: &Value, type_name: &str) -> OrmResult<Value> {
        self.registry.resolve(type_name)?.to_storage(value)
    }

    /// Convert one storage value to its application form.
    pub fn to_application(&self, value: &Value, type_name: &str) -> OrmResult<Value> {
        self.registry.resolve(type_name)?.to_application(value)
    }

    /// Resolve the type a column converts with: the override when one is given,
    /// else the live column type. `None` when the column is not in the live schema.
    pub fn column_type(
        &self,
        schema: Option<&TableSchema>,
        column: &str,
        type_overrides: Option<&TypeOverrides>,
    ) -> OrmResult<Option<Arc<dyn ColumnType>>> {
        let Some(live) = schema.and_then(|s| s.column(column)) else {
            return Ok(None);
        };
        let type_name = type_overrides
            .and_then(|o| o.get(column))
            .map(String::as_str)
            .unwrap_or(&live.data_type);
        self.registry.resolve(type_name).map(Some)
    }

    /// Convert one value bound against `column` into a parameter.
    pub fn param(
        &self,
        schema: Option<&TableSchema>,
        column: &str,
        value: &Value,
        opts: &ConvertOptions<'_>,
    ) -> OrmResult<Param> {
        match self.column_type(schema, column, opts.type_overrides)? {
            Some(ty) => {
                let stored = ty.to_storage(value)?;
                if opts.include_type {
                    Ok(Param::typed(stored, ty))
                } else {
                    Ok(Param::new(stored))
                }
            }
            None => Ok(Param::new(value.clone())),
        }
    }

    /// Convert a row to storage form, keeping the row's column order.
    pub fn row_to_storage(
        &self,
        schema: Option<&TableSchema>,
        row: &RowData,
        opts: &ConvertOptions<'_>,
    ) -> OrmResult<IndexMap<String, Param>> {
        row.iter()
            .map(|(column, value)| {
                let param = self.param(schema, column, value, opts)?;
                Ok((column.clone(), param))
            })
            .collect()
    }

    /// Convert a row read from the backend to application form.
    pub fn row_to_application(
        &self,
        schema: Option<&TableSchema>,
        row: &RowData,
        type_overrides: Option<&TypeOverrides>,
    ) -> OrmResult<RowData> {
        row.iter()
            .map(|(column, value)| {
                let converted = match self.column_type(schema, column, type_overrides)? {
                    Some(ty) => ty.to_application(value)?,
                    None => value.clone(),
                };
                Ok((column.clone(), converted))
            })
            .collect()
    }
}

impl Default for ValueCodec {
    fn default() -> Self {
        Self::new(TypeRegistry::new())
    }
}
