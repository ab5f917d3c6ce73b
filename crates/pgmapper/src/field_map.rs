//! Per-entity field declarations.
//!
//! A [`FieldMapBuilder`] collects declarations and validates them once; the
//! resulting [`FieldMap`] has no mutating methods.

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

use crate::codec::TypeOverrides;
use crate::error::{OrmError, OrmResult};
use crate::ident;
use crate::types::{ColumnType, TypeRegistry};
use crate::value::Value;

/// A value transformer applied on normalize or denormalize.
pub type Mapper = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Options for one declared field.
#[derive(Clone, Default)]
pub struct FieldOptions {
    accessor: Option<String>,
    normalize: Option<Mapper>,
    denormalize: Option<Mapper>,
    nullable: Option<bool>,
}

impl FieldOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Property path read and written for this field. Defaults to the field name.
    pub fn accessor(mut self, path: impl Into<String>) -> Self {
        self.accessor = Some(path.into());
        self
    }

    /// Transform the property value before it is written to the row.
    pub fn normalize_with(mut self, f: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.normalize = Some(Arc::new(f));
        self
    }

    /// Transform the row value before it is written to the property.
    pub fn denormalize_with(mut self, f: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.denormalize = Some(Arc::new(f));
        self
    }

    /// Column nullability in the desired schema. Non-primary fields default to nullable.
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }
}

impl fmt::Debug for FieldOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldOptions")
            .field("accessor", &self.accessor)
            .field("normalize", &self.normalize.is_some())
            .field("denormalize", &self.denormalize.is_some())
            .field("nullable", &self.nullable)
            .finish()
    }
}

/// One validated field: column name, storage type and accessor.
#[derive(Clone)]
pub struct FieldDescriptor {
    name: String,
    storage_type: String,
    column_type: Arc<dyn ColumnType>,
    accessor: String,
    normalize: Option<Mapper>,
    denormalize: Option<Mapper>,
    nullable: bool,
}

impl FieldDescriptor {
    /// Field and column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared logical type name.
    pub fn storage_type(&self) -> &str {
        &self.storage_type
    }

    pub fn column_type(&self) -> &Arc<dyn ColumnType> {
        &self.column_type
    }

    pub fn accessor(&self) -> &str {
        &self.accessor
    }

    pub fn nullable(&self) -> bool {
        self.nullable
    }

    /// Apply the normalize transformer, if any.
    pub fn normalize(&self, value: Value) -> Value {
        match &self.normalize {
            Some(f) => f(value),
            None => value,
        }
    }

    /// Apply the denormalize transformer, if any.
    pub fn denormalize(&self, value: Value) -> Value {
        match &self.denormalize {
            Some(f) => f(value),
            None => value,
        }
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("storage_type", &self.storage_type)
            .field("accessor", &self.accessor)
            .field("nullable", &self.nullable)
            .finish()
    }
}

/// Declared fields in declaration order plus the primary key.
#[derive(Debug, Clone)]
pub struct FieldMap {
    fields: IndexMap<String, FieldDescriptor>,
    primary_key: Vec<String>,
}

impl FieldMap {
    pub fn builder() -> FieldMapBuilder {
        FieldMapBuilder::default()
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.values()
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Primary key field names, in declaration order of `primary` calls.
    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    pub fn is_primary(&self, name: &str) -> bool {
        self.primary_key.iter().any(|p| p == name)
    }

    /// Declared type of every field, used to convert values regardless of the
    /// live column type.
    pub fn type_overrides(&self) -> TypeOverrides {
        self.fields
            .values()
            .map(|f| (f.name.clone(), f.storage_type.clone()))
            .collect()
    }
}

/// Collects field declarations; [`build`](Self::build) validates them.
#[derive(Debug, Clone, Default)]
pub struct FieldMapBuilder {
    fields: Vec<(String, String, FieldOptions)>,
    primary_key: Vec<String>,
}

impl FieldMapBuilder {
    /// Declare a field stored as `storage_type`.
    pub fn field(
        mut self,
        name: impl Into<String>,
        storage_type: impl Into<String>,
        options: FieldOptions,
    ) -> Self {
        self.fields.push((name.into(), storage_type.into(), options));
        self
    }

    /// Add a declared field to the primary key. Repeat for composite keys.
    pub fn primary(mut self, name: impl Into<String>) -> Self {
        self.primary_key.push(name.into());
        self
    }

    /// Validate names, types and the primary key.
    pub fn build(self, registry: &TypeRegistry) -> OrmResult<FieldMap> {
        let mut fields = IndexMap::with_capacity(self.fields.len());
        let primary_key = self
            .primary_key
            .iter()
            .map(|name| column_name(name))
            .collect::<OrmResult<Vec<_>>>()?;
        for (name, storage_type, options) in self.fields {
            let name = column_name(&name)?;
            if fields.contains_key(&name) {
                return Err(OrmError::invalid(format!("field '{name}' declared twice")));
            }
            let column_type = registry.resolve(&storage_type)?;
            let primary = primary_key.contains(&name);
            if primary && options.nullable == Some(true) {
                return Err(OrmError::invalid(format!(
                    "primary key field '{name}' cannot be nullable"
                )));
            }
            let descriptor = FieldDescriptor {
                accessor: options.accessor.unwrap_or_else(|| name.clone()),
                name: name.clone(),
                storage_type,
                column_type,
                normalize: options.normalize,
                denormalize: options.denormalize,
                nullable: !primary && options.nullable.unwrap_or(true),
            };
            fields.insert(name, descriptor);
        }

        if primary_key.is_empty() {
            return Err(OrmError::invalid("a primary key is required"));
        }
        for (i, name) in primary_key.iter().enumerate() {
            if !fields.contains_key(name) {
                return Err(OrmError::invalid(format!(
                    "primary key field '{name}' is not declared"
                )));
            }
            if primary_key[..i].contains(name) {
                return Err(OrmError::invalid(format!(
                    "primary key field '{name}' listed twice"
                )));
            }
        }

        Ok(FieldMap {
            fields,
            primary_key,
        })
    }
}

/// A field names exactly one column; `"createdAt"` and `createdAt` are the same field.
fn column_name(name: &str) -> OrmResult<String> {
    ident::Ident::parse(name)?
        .single()
        .map(str::to_string)
        .ok_or_else(|| OrmError::invalid(format!("field '{name}' must be a single column name")))
}
