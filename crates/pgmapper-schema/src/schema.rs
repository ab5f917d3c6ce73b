//! Table schema descriptions shared by the desired (declared) and live (introspected) side.

use serde::{Deserialize, Serialize};

/// A single column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    /// PostgreSQL type as rendered by `format_type` (e.g. `bigint`, `character varying(255)`).
    pub data_type: String,
    pub nullable: bool,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
        }
    }

    /// Mark the column as `NOT NULL` (or nullable again).
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Whether both columns store the same type, ignoring spelling differences
    /// such as `int8` vs `bigint`.
    pub fn same_type(&self, other: &ColumnSchema) -> bool {
        canonical_type(&self.data_type) == canonical_type(&other.data_type)
    }
}

/// Description of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
    /// Primary key column names, in key order. Empty when the table has no primary key.
    pub primary_key: Vec<String>,
}

impl TableSchema {
    /// Create an empty table schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
        }
    }

    /// Append a column.
    pub fn with_column(mut self, column: ColumnSchema) -> Self {
        self.columns.push(column);
        self
    }

    /// Set the primary key columns.
    pub fn with_primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Check if this table has a column with the given name.
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }
}

/// Normalize a PostgreSQL type name to the spelling used by `format_type`.
///
/// Lowercases, collapses whitespace and maps common aliases (`int8`, `varchar`,
/// `timestamptz`, ...) to their canonical names. Modifiers such as `(255)` are kept
/// and placed where `format_type` puts them, so `timestamptz(3)` and
/// `timestamp(3) with time zone` compare equal.
pub fn canonical_type(data_type: &str) -> String {
    let lowered = data_type.to_ascii_lowercase();
    let (outside, modifier) = match (lowered.find('('), lowered.find(')')) {
        (Some(open), Some(close)) if open < close => (
            format!("{} {}", &lowered[..open], &lowered[close + 1..]),
            lowered[open..=close]
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>(),
        ),
        _ => (lowered.clone(), String::new()),
    };

    let mut base = outside.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut dims = String::new();
    while let Some(stripped) = base.strip_suffix("[]") {
        dims.push_str("[]");
        base = stripped.trim_end().to_string();
    }

    let base = match base.as_str() {
        "int2" => "smallint",
        "int" | "int4" | "serial" | "serial4" => "integer",
        "int8" | "bigserial" | "serial8" => "bigint",
        "float8" | "float" => "double precision",
        "float4" => "real",
        "bool" => "boolean",
        "varchar" => "character varying",
        "char" | "bpchar" => "character",
        "timestamptz" => "timestamp with time zone",
        "timestamp" => "timestamp without time zone",
        "timetz" => "time with time zone",
        "time" => "time without time zone",
        "decimal" => "numeric",
        other => other,
    };

    match base.split_once(" with") {
        Some((head @ ("timestamp" | "time"), zone)) if !modifier.is_empty() => {
            format!("{head}{modifier} with{zone}{dims}")
        }
        _ => format!("{base}{modifier}{dims}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_type_maps_aliases() {
        assert_eq!(canonical_type("INT8"), "bigint");
        assert_eq!(canonical_type("varchar(255)"), "character varying(255)");
        assert_eq!(canonical_type("character  varying( 40 )"), "character varying(40)");
        assert_eq!(canonical_type("timestamptz"), "timestamp with time zone");
        assert_eq!(canonical_type("jsonb"), "jsonb");
    }

    #[test]
    fn precision_sits_where_format_type_puts_it() {
        let spelled = "timestamp(3) with time zone";
        assert_eq!(canonical_type("timestamptz(3)"), spelled);
        assert_eq!(canonical_type("TIMESTAMP (3) WITH TIME ZONE"), spelled);
        assert_eq!(canonical_type("timestamp(6)"), "timestamp(6) without time zone");
        assert_eq!(canonical_type("timetz(2)"), "time(2) with time zone");
        assert_eq!(canonical_type("varchar(20)[]"), "character varying(20)[]");
        assert_eq!(canonical_type("int8[]"), "bigint[]");

        let declared = ColumnSchema::new("at", "timestamptz(3)");
        let live = ColumnSchema::new("at", spelled);
        assert!(declared.same_type(&live));
    }

    #[test]
    fn same_type_ignores_spelling() {
        let a = ColumnSchema::new("id", "int8");
        let b = ColumnSchema::new("id", "bigint");
        let c = ColumnSchema::new("id", "integer");
        assert!(a.same_type(&b));
        assert!(!a.same_type(&c));
    }

    #[test]
    fn table_lookup() {
        let table = TableSchema::new("users")
            .with_column(ColumnSchema::new("id", "bigint").nullable(false))
            .with_column(ColumnSchema::new("email", "text"))
            .with_primary_key(["id"]);

        assert!(table.has_column("email"));
        assert!(!table.has_column("name"));
        assert_eq!(table.column("id").map(|c| c.nullable), Some(false));
    }

    #[test]
    fn serde_roundtrip_keeps_primary_key() {
        let table = TableSchema::new("users")
            .with_column(ColumnSchema::new("id", "bigint").nullable(false))
            .with_primary_key(["id"]);
        let json = serde_json::to_string(&table).unwrap();
        let back: TableSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
    }
}
