//! Entity-level CRUD, (de)normalization and schema sync.

use pgmapper_schema::{ColumnSchema, TableSchema};
use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;

use crate::backend::Backend;
use crate::codec::TypeOverrides;
use crate::database::Database;
use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::field_map::{FieldMap, FieldMapBuilder, FieldOptions};
use crate::ident;
use crate::options::{Filter, QueryOptions};
use crate::serializer::{Denormalizer, Normalizer, SerializerContext};
use crate::value::RowData;

/// Options for [`Repository::denormalize`].
#[derive(Debug)]
pub struct DenormalizeContext<E> {
    /// Restrict to these fields. `None` means every declared field.
    pub fields: Option<Vec<String>>,
    /// Populate this object instead of `E::default()`.
    pub object_to_populate: Option<E>,
}

impl<E> Default for DenormalizeContext<E> {
    fn default() -> Self {
        Self {
            fields: None,
            object_to_populate: None,
        }
    }
}

impl<E> DenormalizeContext<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn object_to_populate(mut self, object: E) -> Self {
        self.object_to_populate = Some(object);
        self
    }
}

/// Declares the table and fields of a [`Repository`].
pub struct RepositoryBuilder<E, B> {
    table: String,
    fields: FieldMapBuilder,
    _marker: PhantomData<fn() -> (E, B)>,
}

impl<E: Entity, B: Backend> RepositoryBuilder<E, B> {
    /// Declare a field stored as the logical type `storage_type`.
    pub fn field(
        mut self,
        name: impl Into<String>,
        storage_type: impl Into<String>,
        options: FieldOptions,
    ) -> Self {
        self.fields = self.fields.field(name, storage_type, options);
        self
    }

    /// Add a declared field to the primary key. Repeat for composite keys.
    pub fn primary(mut self, name: impl Into<String>) -> Self {
        self.fields = self.fields.primary(name);
        self
    }

    /// Validate the declarations against the database's type registry.
    pub fn build(self, database: Database<B>) -> OrmResult<Repository<E, B>> {
        ident::quote(&self.table)?;
        let field_map = self.fields.build(database.registry())?;
        let type_overrides = field_map.type_overrides();
        Ok(Repository {
            table: self.table,
            field_map,
            type_overrides,
            database,
            _entity: PhantomData,
        })
    }
}

impl<E, B> fmt::Debug for RepositoryBuilder<E, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryBuilder")
            .field("table", &self.table)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Maps entities of type `E` to rows of one table.
///
/// ```ignore
/// let users = Repository::<User, _>::builder("users")
///     .field("id", "bigint", FieldOptions::new())
///     .field("email", "string", FieldOptions::new())
///     .primary("id")
///     .build(database)?;
///
/// users.create().await?;
/// users.insert(&User { id: 1, email: "a@x.com".into() }).await?;
/// let found = users.select_one(&Filter::new().eq("id", 1), &QueryOptions::new()).await?;
/// ```
pub struct Repository<E, B> {
    table: String,
    field_map: FieldMap,
    type_overrides: TypeOverrides,
    database: Database<B>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity, B: Backend> Repository<E, B> {
    pub fn builder(table: impl Into<String>) -> RepositoryBuilder<E, B> {
        RepositoryBuilder {
            table: table.into(),
            fields: FieldMap::builder(),
            _marker: PhantomData,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn field_map(&self) -> &FieldMap {
        &self.field_map
    }

    pub fn database(&self) -> &Database<B> {
        &self.database
    }

    // ==================== Queries ====================

    pub async fn select(&self, filter: &Filter, options: &QueryOptions) -> OrmResult<Vec<E>> {
        let rows = self
            .database
            .select_with_types(&self.table, filter, options, &self.type_overrides)
            .await?;
        rows.iter()
            .map(|row| self.denormalize(row, DenormalizeContext::new()))
            .collect()
    }

    /// First matching entity, or `None`.
    pub async fn select_one(&self, filter: &Filter, options: &QueryOptions) -> OrmResult<Option<E>> {
        let row = self
            .database
            .select_one_with_types(&self.table, filter, options, &self.type_overrides)
            .await?;
        row.map(|row| self.denormalize(&row, DenormalizeContext::new()))
            .transpose()
    }

    pub async fn count(&self, filter: &Filter) -> OrmResult<u64> {
        self.database
            .count_with_types(&self.table, filter, &self.type_overrides)
            .await
    }

    // ==================== Mutations ====================

    pub async fn insert(&self, entity: &E) -> OrmResult<u64> {
        let row = self.normalize(entity, None)?;
        self.database
            .insert_with_types(&self.table, &row, &self.type_overrides)
            .await
    }

    /// Update the row identified by the entity's primary key.
    pub async fn update(&self, entity: &E) -> OrmResult<u64> {
        let row = self.normalize(entity, None)?;
        let key = self.primary_filter(&row)?;
        self.database
            .update_with_types(&self.table, &row, &key, &self.type_overrides)
            .await
    }

    /// Delete the row identified by the entity's primary key.
    pub async fn delete(&self, entity: &E) -> OrmResult<u64> {
        let row = self.normalize(entity, None)?;
        let key = self.primary_filter(&row)?;
        self.database
            .delete_with_types(&self.table, &key, &self.type_overrides)
            .await
    }

    /// Project a normalized row onto the primary key.
    fn primary_filter(&self, row: &RowData) -> OrmResult<Filter> {
        self.field_map
            .primary_key()
            .iter()
            .try_fold(Filter::new(), |filter, name| match row.get(name) {
                Some(value) => Ok(filter.eq(name.as_str(), value.clone())),
                None => Err(OrmError::invalid(format!(
                    "primary key field '{name}' of '{}' is null",
                    self.table
                ))),
            })
    }

    // ==================== Mapping ====================

    /// Read the declared fields (or the given subset) off `entity`.
    ///
    /// Transformers run before the null check, so a transformer can drop a value
    /// by returning `Null`.
    pub fn normalize(&self, entity: &E, fields: Option<&[&str]>) -> OrmResult<RowData> {
        let mut row = RowData::with_capacity(self.field_map.len());
        for field in self.field_map.fields() {
            if fields.is_some_and(|only| !only.contains(&field.name())) {
                continue;
            }
            let value = field.normalize(entity.get(field.accessor())?);
            if !value.is_null() {
                row.insert(field.name().to_string(), value);
            }
        }
        Ok(row)
    }

    /// Write the row's values for the declared fields (or the given subset) into
    /// an entity. Fields missing from the row keep their current value; columns
    /// that are not declared fields are ignored.
    pub fn denormalize(&self, row: &RowData, context: DenormalizeContext<E>) -> OrmResult<E> {
        let mut entity = context.object_to_populate.unwrap_or_default();
        for field in self.field_map.fields() {
            if context
                .fields
                .as_ref()
                .is_some_and(|only| !only.iter().any(|f| f == field.name()))
            {
                continue;
            }
            if let Some(value) = row.get(field.name()) {
                entity.set(field.accessor(), field.denormalize(value.clone()))?;
            }
        }
        Ok(entity)
    }

    // ==================== Schema ====================

    /// The table the field declarations describe.
    pub fn desired_schema(&self) -> TableSchema {
        self.field_map
            .fields()
            .fold(TableSchema::new(&self.table), |table, field| {
                table.with_column(
                    ColumnSchema::new(field.name(), field.column_type().sql_type())
                        .nullable(field.nullable()),
                )
            })
            .with_primary_key(self.field_map.primary_key().iter().cloned())
    }

    /// Statements that would bring the live table in line with the declarations.
    pub async fn schema_diff(&self) -> OrmResult<Vec<String>> {
        let current = self.database.backend().table_schema(&self.table).await?;
        Ok(self
            .database
            .backend()
            .diff_schema(&self.desired_schema(), current.as_ref()))
    }

    /// Create or alter the table in one transaction. Returns the number of
    /// statements applied; `0` when the table already matches.
    pub async fn create(&self) -> OrmResult<usize> {
        let statements = self.schema_diff().await?;
        if statements.is_empty() {
            tracing::debug!(table = %self.table, "schema up to date");
            return Ok(0);
        }

        self.database.backend().execute_batch(&statements).await?;
        tracing::info!(
            table = %self.table,
            statements = statements.len(),
            "schema synchronized"
        );
        Ok(statements.len())
    }
}

impl<E, B> fmt::Debug for Repository<E, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("entity", &std::any::type_name::<E>())
            .field("table", &self.table)
            .field("field_map", &self.field_map)
            .finish()
    }
}

impl<E: Entity, B: Backend> Normalizer for Repository<E, B> {
    fn supports_normalization(&self, object: &dyn Any, _format: Option<&str>) -> bool {
        object.is::<E>()
    }

    fn normalize(
        &self,
        object: &dyn Any,
        _format: Option<&str>,
        context: &SerializerContext,
    ) -> OrmResult<RowData> {
        let entity = object.downcast_ref::<E>().ok_or_else(|| {
            OrmError::unsupported(format!(
                "{} only normalizes {}",
                self.table,
                std::any::type_name::<E>()
            ))
        })?;
        let fields: Option<Vec<&str>> = context
            .fields
            .as_ref()
            .map(|f| f.iter().map(String::as_str).collect());
        Repository::normalize(self, entity, fields.as_deref())
    }

    fn has_cacheable_support(&self) -> bool {
        true
    }
}

impl<E: Entity, B: Backend> Denormalizer for Repository<E, B> {
    fn supports_denormalization(&self, data: &dyn Any, target: TypeId, _format: Option<&str>) -> bool {
        data.is::<RowData>() && target == TypeId::of::<E>()
    }

    fn denormalize(
        &self,
        data: &dyn Any,
        target: TypeId,
        _format: Option<&str>,
        context: SerializerContext,
    ) -> OrmResult<Box<dyn Any + Send>> {
        if target != TypeId::of::<E>() {
            return Err(OrmError::unsupported(format!(
                "{} only denormalizes {}",
                self.table,
                std::any::type_name::<E>()
            )));
        }
        let row = data
            .downcast_ref::<RowData>()
            .ok_or_else(|| OrmError::unsupported("denormalization input is not row data"))?;
        let object_to_populate = match context.object_to_populate {
            Some(object) => Some(*object.downcast::<E>().map_err(|_| {
                OrmError::unsupported(format!(
                    "object to populate is not a {}",
                    std::any::type_name::<E>()
                ))
            })?),
            None => None,
        };
        let entity = Repository::denormalize(
            self,
            row,
            DenormalizeContext {
                fields: context.fields,
                object_to_populate,
            },
        )?;
        Ok(Box::new(entity))
    }

    fn has_cacheable_support(&self) -> bool {
        true
    }
}
