//! PostgreSQL backend over a `deadpool_postgres` pool.

use deadpool_postgres::Pool;
use pgmapper_schema::{TableSchema, load_table_schema, name_parts};
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, Type};

use crate::backend::Backend;
use crate::config::DatabaseConfig;
use crate::error::{OrmError, OrmResult};
use crate::pool::create_pool;
use crate::qb::Statement;
use crate::value::{RowData, Value};

/// [`Backend`] running statements on pooled `tokio_postgres` connections.
///
/// When every parameter of a statement carries a column type, the statement is
/// prepared with those types; otherwise the server infers them.
#[derive(Clone)]
pub struct PgBackend {
    pool: Pool,
    schema: String,
}

impl PgBackend {
    /// Wrap an existing pool. Unqualified tables are looked up in `public`.
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            schema: "public".to_string(),
        }
    }

    /// Build the pool from `config`.
    pub fn connect(config: &DatabaseConfig) -> OrmResult<Self> {
        Ok(Self::new(create_pool(config)?).with_schema(config.schema.clone()))
    }

    /// Schema searched for unqualified table names.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    async fn run_query(&self, stmt: &Statement) -> OrmResult<Vec<Row>> {
        let client = self.pool.get().await?;
        let params = stmt.params_ref();
        let rows = match stmt.param_types() {
            Some(types) if !types.is_empty() => {
                let prepared = client
                    .prepare_typed_cached(&stmt.sql, &types)
                    .await
                    .map_err(OrmError::from_db_error)?;
                client.query(&prepared, &params).await
            }
            _ => client.query(stmt.sql.as_str(), &params).await,
        };
        rows.map_err(OrmError::from_db_error)
    }

    fn split_table(&self, table: &str) -> (String, String) {
        let mut parts = name_parts(table);
        let name = parts.pop().unwrap_or_default();
        match parts.pop() {
            Some(schema) => (schema, name),
            None => (self.schema.clone(), name),
        }
    }
}

impl std::fmt::Debug for PgBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgBackend")
            .field("schema", &self.schema)
            .field("pool", &self.pool.status())
            .finish()
    }
}

impl Backend for PgBackend {
    async fn query(&self, stmt: &Statement) -> OrmResult<Vec<RowData>> {
        let rows = self.run_query(stmt).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn execute(&self, stmt: &Statement) -> OrmResult<u64> {
        let client = self.pool.get().await?;
        let params = stmt.params_ref();
        let affected = match stmt.param_types() {
            Some(types) if !types.is_empty() => {
                let prepared = client
                    .prepare_typed_cached(&stmt.sql, &types)
                    .await
                    .map_err(OrmError::from_db_error)?;
                client.execute(&prepared, &params).await
            }
            _ => client.execute(stmt.sql.as_str(), &params).await,
        };
        affected.map_err(OrmError::from_db_error)
    }

    async fn table_schema(&self, table: &str) -> OrmResult<Option<TableSchema>> {
        let (schema, name) = self.split_table(table);
        let client = self.pool.get().await?;
        let mut found = load_table_schema(&**client, &schema, &name).await?;
        if let Some(ref mut t) = found {
            t.name = table.to_string();
        }
        Ok(found)
    }

    async fn execute_batch(&self, statements: &[String]) -> OrmResult<()> {
        if statements.is_empty() {
            return Ok(());
        }
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await.map_err(OrmError::from_db_error)?;
        for sql in statements {
            if let Err(error) = tx.batch_execute(sql).await {
                let message = format!("batch failed on `{sql}`: {error}");
                return match tx.rollback().await {
                    Ok(()) => Err(OrmError::Backend(message)),
                    Err(rollback_err) => Err(OrmError::Backend(format!(
                        "{message} (rollback failed: {rollback_err})"
                    ))),
                };
            }
        }
        tx.commit().await.map_err(OrmError::from_db_error)
    }
}

fn get<'a, T: FromSql<'a>>(row: &'a Row, idx: usize, column: &str) -> OrmResult<Option<T>> {
    row.try_get(idx)
        .map_err(|e| OrmError::decode(column, e.to_string()))
}

/// Decode a driver row into storage-form values.
fn decode_row(row: &Row) -> OrmResult<RowData> {
    let mut out = RowData::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        let name = column.name();
        let ty = column.type_();
        let value: Value = if *ty == Type::BOOL {
            get::<bool>(row, idx, name)?.into()
        } else if *ty == Type::INT2 {
            get::<i16>(row, idx, name)?.into()
        } else if *ty == Type::INT4 {
            get::<i32>(row, idx, name)?.into()
        } else if *ty == Type::INT8 {
            get::<i64>(row, idx, name)?.into()
        } else if *ty == Type::FLOAT4 {
            get::<f32>(row, idx, name)?.into()
        } else if *ty == Type::FLOAT8 {
            get::<f64>(row, idx, name)?.into()
        } else if *ty == Type::BYTEA {
            get::<Vec<u8>>(row, idx, name)?.into()
        } else if *ty == Type::JSON || *ty == Type::JSONB {
            get::<serde_json::Value>(row, idx, name)?.into()
        } else if *ty == Type::TIMESTAMPTZ {
            get::<chrono::DateTime<chrono::Utc>>(row, idx, name)?.into()
        } else if *ty == Type::TIMESTAMP {
            get::<chrono::NaiveDateTime>(row, idx, name)?
                .map(|t| t.and_utc())
                .into()
        } else if *ty == Type::DATE {
            get::<chrono::NaiveDate>(row, idx, name)?.into()
        } else if *ty == Type::UUID {
            get::<uuid::Uuid>(row, idx, name)?.into()
        } else if <String as FromSql<'_>>::accepts(ty) {
            get::<String>(row, idx, name)?.into()
        } else {
            return Err(OrmError::decode(
                name,
                format!("unsupported column type {ty}"),
            ));
        };
        out.insert(name.to_string(), value);
    }
    Ok(out)
}
