//! Live schema introspection from `pg_catalog`.

use crate::client::{RowExt, SchemaClient};
use crate::error::SchemaResult;
use crate::schema::{ColumnSchema, TableSchema};

const COLUMNS_SQL: &str = r#"
SELECT
  a.attname AS column_name,
  pg_catalog.format_type(a.atttypid, a.atttypmod) AS data_type,
  a.attnotnull AS not_null
FROM pg_catalog.pg_class c
JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
JOIN pg_catalog.pg_attribute a ON a.attrelid = c.oid
WHERE c.relkind IN ('r', 'p')
  AND a.attnum > 0
  AND NOT a.attisdropped
  AND n.nspname = $1
  AND c.relname = $2
ORDER BY a.attnum
"#;

const PRIMARY_KEY_SQL: &str = r#"
SELECT a.attname AS column_name
FROM pg_catalog.pg_index i
JOIN pg_catalog.pg_class c ON c.oid = i.indrelid
JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
JOIN LATERAL unnest(i.indkey) WITH ORDINALITY AS k(attnum, ord) ON TRUE
JOIN pg_catalog.pg_attribute a ON a.attrelid = c.oid AND a.attnum = k.attnum
WHERE i.indisprimary
  AND n.nspname = $1
  AND c.relname = $2
ORDER BY k.ord
"#;

/// Load one table from the live database.
///
/// Returns `Ok(None)` when the table does not exist in `schema`.
pub async fn load_table_schema<C: SchemaClient + ?Sized>(
    client: &C,
    schema: &str,
    table: &str,
) -> SchemaResult<Option<TableSchema>> {
    let rows = client.query(COLUMNS_SQL, &[&schema, &table]).await?;
    if rows.is_empty() {
        return Ok(None);
    }

    let mut out = TableSchema::new(table);
    for row in rows {
        let name: String = row.try_get_column("column_name")?;
        let data_type: String = row.try_get_column("data_type")?;
        let not_null: bool = row.try_get_column("not_null")?;
        out.columns
            .push(ColumnSchema::new(name, data_type).nullable(!not_null));
    }

    let pk_rows = client.query(PRIMARY_KEY_SQL, &[&schema, &table]).await?;
    for row in pk_rows {
        out.primary_key.push(row.try_get_column("column_name")?);
    }

    Ok(Some(out))
}
