//! Table-scoped CRUD over a [`Backend`].

use pgmapper_schema::TableSchema;

use crate::backend::Backend;
use crate::codec::{ConvertOptions, TypeOverrides, ValueCodec};
use crate::error::{OrmError, OrmResult};
use crate::options::{Filter, Predicate, QueryOptions};
use crate::qb::{self, ExprGroup, Param, SqlQb, Statement};
use crate::types::TypeRegistry;
use crate::value::{RowData, Value};

/// Runs select/insert/update/delete against named tables.
///
/// Every call reads the live table schema from the backend first; values for
/// columns the table has are converted with the column's type (or the override
/// for that column), everything else passes through unchanged.
#[derive(Debug, Clone)]
pub struct Database<B> {
    backend: B,
    codec: ValueCodec,
}

impl<B: Backend> Database<B> {
    /// A database using the built-in column types.
    pub fn new(backend: B) -> Self {
        Self::with_registry(backend, TypeRegistry::new())
    }

    /// A database resolving column types through `registry`.
    pub fn with_registry(backend: B, registry: TypeRegistry) -> Self {
        Self {
            backend,
            codec: ValueCodec::new(registry),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn codec(&self) -> &ValueCodec {
        &self.codec
    }

    pub fn registry(&self) -> &TypeRegistry {
        self.codec.registry()
    }

    // ==================== Select ====================

    pub async fn select(
        &self,
        table: &str,
        filter: &Filter,
        options: &QueryOptions,
    ) -> OrmResult<Vec<RowData>> {
        self.select_with_types(table, filter, options, &TypeOverrides::new())
            .await
    }

    /// Select rows; `types` override the live column types during conversion.
    pub async fn select_with_types(
        &self,
        table: &str,
        filter: &Filter,
        options: &QueryOptions,
        types: &TypeOverrides,
    ) -> OrmResult<Vec<RowData>> {
        let schema = self.backend.table_schema(table).await?;
        let stmt = qb::select(table)
            .with_options(options)
            .where_group(self.where_group(schema.as_ref(), filter, types)?)
            .build()?;

        let rows = self.query(table, &stmt).await?;
        rows.iter()
            .map(|row| {
                self.codec
                    .row_to_application(schema.as_ref(), row, Some(types))
            })
            .collect()
    }

    pub async fn select_one(
        &self,
        table: &str,
        filter: &Filter,
        options: &QueryOptions,
    ) -> OrmResult<Option<RowData>> {
        self.select_one_with_types(table, filter, options, &TypeOverrides::new())
            .await
    }

    /// Like [`select_with_types`](Self::select_with_types) with `LIMIT 1`.
    /// `None` when nothing matches.
    pub async fn select_one_with_types(
        &self,
        table: &str,
        filter: &Filter,
        options: &QueryOptions,
        types: &TypeOverrides,
    ) -> OrmResult<Option<RowData>> {
        let options = options.clone().limit(1);
        let rows = self
            .select_with_types(table, filter, &options, types)
            .await?;
        Ok(rows.into_iter().next())
    }

    pub async fn count(&self, table: &str, filter: &Filter) -> OrmResult<u64> {
        self.count_with_types(table, filter, &TypeOverrides::new())
            .await
    }

    /// Number of rows matching `filter`.
    pub async fn count_with_types(
        &self,
        table: &str,
        filter: &Filter,
        types: &TypeOverrides,
    ) -> OrmResult<u64> {
        let schema = self.backend.table_schema(table).await?;
        let stmt = qb::count(table)
            .where_group(self.where_group(schema.as_ref(), filter, types)?)
            .build()?;

        let rows = self.query(table, &stmt).await?;
        let count = rows
            .first()
            .and_then(|row| row.get("count"))
            .and_then(Value::as_i64)
            .ok_or_else(|| OrmError::decode("count", "count query returned no integer"))?;
        u64::try_from(count).map_err(|e| OrmError::decode("count", e.to_string()))
    }

    // ==================== Mutations ====================

    pub async fn insert(&self, table: &str, row: &RowData) -> OrmResult<u64> {
        self.insert_with_types(table, row, &TypeOverrides::new())
            .await
    }

    /// Insert one row. Null entries are not bound.
    pub async fn insert_with_types(
        &self,
        table: &str,
        row: &RowData,
        types: &TypeOverrides,
    ) -> OrmResult<u64> {
        ensure_values(table, "insert", row)?;

        let schema = self.backend.table_schema(table).await?;
        let params = self.row_params(schema.as_ref(), row, types)?;
        let stmt = params
            .into_iter()
            .fold(qb::insert(table), |qb, (column, param)| {
                qb.set_param(&column, param)
            })
            .build()?;

        self.execute(table, &stmt).await
    }

    pub async fn update(&self, table: &str, row: &RowData, key_filter: &Filter) -> OrmResult<u64> {
        self.update_with_types(table, row, key_filter, &TypeOverrides::new())
            .await
    }

    /// Update the rows matching `key_filter`. Null entries are not bound.
    pub async fn update_with_types(
        &self,
        table: &str,
        row: &RowData,
        key_filter: &Filter,
        types: &TypeOverrides,
    ) -> OrmResult<u64> {
        ensure_values(table, "update", row)?;
        ensure_filter(table, "update", key_filter)?;

        let schema = self.backend.table_schema(table).await?;
        let params = self.row_params(schema.as_ref(), row, types)?;
        let stmt = params
            .into_iter()
            .fold(qb::update(table), |qb, (column, param)| {
                qb.set_param(&column, param)
            })
            .where_group(self.where_group(schema.as_ref(), key_filter, types)?)
            .build()?;

        self.execute(table, &stmt).await
    }

    pub async fn delete(&self, table: &str, key_filter: &Filter) -> OrmResult<u64> {
        self.delete_with_types(table, key_filter, &TypeOverrides::new())
            .await
    }

    /// Delete the rows matching `key_filter`.
    pub async fn delete_with_types(
        &self,
        table: &str,
        key_filter: &Filter,
        types: &TypeOverrides,
    ) -> OrmResult<u64> {
        ensure_filter(table, "delete", key_filter)?;

        let schema = self.backend.table_schema(table).await?;
        let stmt = qb::delete(table)
            .where_group(self.where_group(schema.as_ref(), key_filter, types)?)
            .build()?;

        self.execute(table, &stmt).await
    }

    // ==================== Helpers ====================

    fn row_params(
        &self,
        schema: Option<&TableSchema>,
        row: &RowData,
        types: &TypeOverrides,
    ) -> OrmResult<indexmap::IndexMap<String, Param>> {
        let opts = ConvertOptions::with_overrides(types).include_type(true);
        self.codec.row_to_storage(schema, row, &opts)
    }

    /// Equality values convert like row values; raw fragment values are bound as given.
    fn where_group(
        &self,
        schema: Option<&TableSchema>,
        filter: &Filter,
        types: &TypeOverrides,
    ) -> OrmResult<ExprGroup> {
        let opts = ConvertOptions::with_overrides(types).include_type(true);
        let mut group = ExprGroup::new();
        for predicate in filter.predicates() {
            match predicate {
                Predicate::Eq { column, value } => {
                    group.eq(column, self.codec.param(schema, column, value, &opts)?);
                }
                Predicate::Raw { sql, values } => {
                    group.template(sql, values.iter().cloned().map(Param::new).collect());
                }
            }
        }
        Ok(group)
    }

    async fn query(&self, table: &str, stmt: &Statement) -> OrmResult<Vec<RowData>> {
        tracing::debug!(
            target: "pgmapper.sql",
            table,
            param_count = stmt.params.len(),
            sql = %stmt.sql,
            "query"
        );
        self.backend.query(stmt).await
    }

    async fn execute(&self, table: &str, stmt: &Statement) -> OrmResult<u64> {
        tracing::debug!(
            target: "pgmapper.sql",
            table,
            param_count = stmt.params.len(),
            sql = %stmt.sql,
            "execute"
        );
        self.backend.execute(stmt).await
    }
}

fn ensure_values(table: &str, op: &str, row: &RowData) -> OrmResult<()> {
    if row.values().all(Value::is_null) {
        return Err(OrmError::invalid(format!(
            "{op} on '{table}' requires at least one non-null value"
        )));
    }
    Ok(())
}

fn ensure_filter(table: &str, op: &str, filter: &Filter) -> OrmResult<()> {
    if filter.is_empty() {
        return Err(OrmError::invalid(format!(
            "{op} on '{table}' requires a non-empty filter"
        )));
    }
    Ok(())
}
