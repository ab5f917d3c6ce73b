//! Column types and the registry that resolves them by name.
//!
//! A [`ColumnType`] knows three things about a logical type: the DDL it is created
//! with, the PostgreSQL type its parameters are bound as, and how a [`Value`] moves
//! between its application form and its storage form.
//!
//! The [`TypeRegistry`] resolves both logical names used in field declarations
//! (`"epoch"`, `"string"`) and live PostgreSQL type names reported by introspection
//! (`"int8"`, `"character varying(255)"`).

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio_postgres::types::Type;

use crate::error::{OrmError, OrmResult};
use crate::value::Value;

/// Converter between the application and storage representation of one column type.
pub trait ColumnType: fmt::Debug + Send + Sync {
    /// Logical name used in field declarations.
    fn name(&self) -> &str;

    /// Type used in `CREATE TABLE` / `ALTER TABLE`.
    fn sql_type(&self) -> &str;

    /// PostgreSQL type the parameter is bound as.
    fn pg_type(&self) -> Type;

    /// Application value → value bound to the statement.
    fn to_storage(&self, value: &Value) -> OrmResult<Value>;

    /// Value read from the backend → application value.
    fn to_application(&self, value: &Value) -> OrmResult<Value>;
}

/// The built-in column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinType {
    SmallInt,
    Integer,
    BigInt,
    Float,
    Boolean,
    String,
    Text,
    DateTime,
    Date,
    /// Application timestamp stored as unix seconds in a `bigint`.
    Epoch,
    Json,
    Uuid,
    Binary,
}

impl BuiltinType {
    pub const ALL: [BuiltinType; 13] = [
        BuiltinType::SmallInt,
        BuiltinType::Integer,
        BuiltinType::BigInt,
        BuiltinType::Float,
        BuiltinType::Boolean,
        BuiltinType::String,
        BuiltinType::Text,
        BuiltinType::DateTime,
        BuiltinType::Date,
        BuiltinType::Epoch,
        BuiltinType::Json,
        BuiltinType::Uuid,
        BuiltinType::Binary,
    ];

    /// PostgreSQL spellings that resolve to this type when reading a live schema.
    fn aliases(self) -> &'static [&'static str] {
        match self {
            BuiltinType::SmallInt => &["int2"],
            BuiltinType::Integer => &["int", "int4", "serial"],
            BuiltinType::BigInt => &["int8", "bigserial"],
            BuiltinType::Float => &["double precision", "float8", "real", "float4"],
            BuiltinType::Boolean => &["bool"],
            BuiltinType::String => &["character varying", "varchar", "character", "char", "bpchar"],
            BuiltinType::Text => &["citext", "name"],
            BuiltinType::DateTime => &[
                "timestamp with time zone",
                "timestamptz",
                "timestamp without time zone",
                "timestamp",
            ],
            BuiltinType::Date => &[],
            BuiltinType::Epoch => &[],
            BuiltinType::Json => &["jsonb"],
            BuiltinType::Uuid => &[],
            BuiltinType::Binary => &["bytea"],
        }
    }

    fn coerce_int(self, value: &Value) -> OrmResult<Value> {
        let n = match value {
            Value::Int(v) => *v,
            Value::Bool(v) => i64::from(*v),
            Value::Float(v) if v.fract() == 0.0 && v.is_finite() => *v as i64,
            Value::Text(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|e| self.error(format!("'{s}' is not an integer: {e}")))?,
            other => return Err(self.mismatch(other)),
        };
        let in_range = match self {
            BuiltinType::SmallInt => i16::try_from(n).is_ok(),
            BuiltinType::Integer => i32::try_from(n).is_ok(),
            _ => true,
        };
        if !in_range {
            return Err(self.error(format!("{n} is out of range")));
        }
        Ok(Value::Int(n))
    }

    fn coerce_timestamp(self, value: &Value) -> OrmResult<Value> {
        match value {
            Value::Timestamp(v) => Ok(Value::Timestamp(*v)),
            Value::Int(secs) => DateTime::<Utc>::from_timestamp(*secs, 0)
                .map(Value::Timestamp)
                .ok_or_else(|| self.error(format!("{secs} is not a valid unix timestamp"))),
            Value::Text(s) => DateTime::parse_from_rfc3339(s.trim())
                .map(|dt| Value::Timestamp(dt.with_timezone(&Utc)))
                .map_err(|e| self.error(format!("'{s}' is not an RFC 3339 timestamp: {e}"))),
            Value::Date(d) => Ok(Value::Timestamp(
                d.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc(),
            )),
            other => Err(self.mismatch(other)),
        }
    }

    /// Shared conversion: both directions agree for every type except `epoch` and `json`.
    fn coerce(self, value: &Value) -> OrmResult<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match self {
            BuiltinType::SmallInt | BuiltinType::Integer | BuiltinType::BigInt => {
                self.coerce_int(value)
            }
            BuiltinType::Float => match value {
                Value::Float(v) => Ok(Value::Float(*v)),
                Value::Int(v) => Ok(Value::Float(*v as f64)),
                Value::Text(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|e| self.error(format!("'{s}' is not a number: {e}"))),
                other => Err(self.mismatch(other)),
            },
            BuiltinType::Boolean => match value {
                Value::Bool(v) => Ok(Value::Bool(*v)),
                Value::Int(0) => Ok(Value::Bool(false)),
                Value::Int(1) => Ok(Value::Bool(true)),
                Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "t" | "true" | "1" | "yes" => Ok(Value::Bool(true)),
                    "f" | "false" | "0" | "no" => Ok(Value::Bool(false)),
                    _ => Err(self.error(format!("'{s}' is not a boolean"))),
                },
                other => Err(self.mismatch(other)),
            },
            BuiltinType::String | BuiltinType::Text => match value {
                Value::Text(s) => Ok(Value::Text(s.clone())),
                Value::Int(v) => Ok(Value::Text(v.to_string())),
                Value::Float(v) => Ok(Value::Text(v.to_string())),
                Value::Bool(v) => Ok(Value::Text(v.to_string())),
                Value::Uuid(v) => Ok(Value::Text(v.to_string())),
                Value::Json(serde_json::Value::String(s)) => Ok(Value::Text(s.clone())),
                other => Err(self.mismatch(other)),
            },
            BuiltinType::DateTime | BuiltinType::Epoch => self.coerce_timestamp(value),
            BuiltinType::Date => match value {
                Value::Date(d) => Ok(Value::Date(*d)),
                Value::Timestamp(t) => Ok(Value::Date(t.date_naive())),
                Value::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                    .map(Value::Date)
                    .map_err(|e| self.error(format!("'{s}' is not a date: {e}"))),
                other => Err(self.mismatch(other)),
            },
            BuiltinType::Json => Ok(Value::Json(value.to_json())),
            BuiltinType::Uuid => match value {
                Value::Uuid(u) => Ok(Value::Uuid(*u)),
                Value::Text(s) => uuid::Uuid::parse_str(s.trim())
                    .map(Value::Uuid)
                    .map_err(|e| self.error(format!("'{s}' is not a uuid: {e}"))),
                Value::Bytes(b) => uuid::Uuid::from_slice(b)
                    .map(Value::Uuid)
                    .map_err(|e| self.error(e.to_string())),
                other => Err(self.mismatch(other)),
            },
            BuiltinType::Binary => match value {
                Value::Bytes(b) => Ok(Value::Bytes(b.clone())),
                Value::Text(s) => Ok(Value::Bytes(s.as_bytes().to_vec())),
                other => Err(self.mismatch(other)),
            },
        }
    }

    fn error(self, message: impl Into<String>) -> OrmError {
        OrmError::conversion(self.name(), message)
    }

    fn mismatch(self, value: &Value) -> OrmError {
        self.error(format!("incompatible {} value", value.kind()))
    }
}

impl ColumnType for BuiltinType {
    fn name(&self) -> &str {
        match self {
            BuiltinType::SmallInt => "smallint",
            BuiltinType::Integer => "integer",
            BuiltinType::BigInt => "bigint",
            BuiltinType::Float => "float",
            BuiltinType::Boolean => "boolean",
            BuiltinType::String => "string",
            BuiltinType::Text => "text",
            BuiltinType::DateTime => "datetime",
            BuiltinType::Date => "date",
            BuiltinType::Epoch => "epoch",
            BuiltinType::Json => "json",
            BuiltinType::Uuid => "uuid",
            BuiltinType::Binary => "binary",
        }
    }

    fn sql_type(&self) -> &str {
        match self {
            BuiltinType::SmallInt => "smallint",
            BuiltinType::Integer => "integer",
            BuiltinType::BigInt | BuiltinType::Epoch => "bigint",
            BuiltinType::Float => "double precision",
            BuiltinType::Boolean => "boolean",
            BuiltinType::String => "character varying(255)",
            BuiltinType::Text => "text",
            BuiltinType::DateTime => "timestamp with time zone",
            BuiltinType::Date => "date",
            BuiltinType::Json => "jsonb",
            BuiltinType::Uuid => "uuid",
            BuiltinType::Binary => "bytea",
        }
    }

    fn pg_type(&self) -> Type {
        match self {
            BuiltinType::SmallInt => Type::INT2,
            BuiltinType::Integer => Type::INT4,
            BuiltinType::BigInt | BuiltinType::Epoch => Type::INT8,
            BuiltinType::Float => Type::FLOAT8,
            BuiltinType::Boolean => Type::BOOL,
            BuiltinType::String => Type::VARCHAR,
            BuiltinType::Text => Type::TEXT,
            BuiltinType::DateTime => Type::TIMESTAMPTZ,
            BuiltinType::Date => Type::DATE,
            BuiltinType::Json => Type::JSONB,
            BuiltinType::Uuid => Type::UUID,
            BuiltinType::Binary => Type::BYTEA,
        }
    }

    fn to_storage(&self, value: &Value) -> OrmResult<Value> {
        let app = self.coerce(value)?;
        match (self, app) {
            (BuiltinType::Epoch, Value::Timestamp(t)) => Ok(Value::Int(t.timestamp())),
            (_, other) => Ok(other),
        }
    }

    fn to_application(&self, value: &Value) -> OrmResult<Value> {
        match (self, value) {
            (BuiltinType::Json, Value::Text(s)) => serde_json::from_str(s)
                .map(Value::Json)
                .map_err(|e| self.error(format!("invalid JSON document: {e}"))),
            _ => self.coerce(value),
        }
    }
}

/// Resolves column type names to converters.
///
/// Lookups are case-insensitive and ignore type modifiers, so
/// `"character varying(40)"` resolves the same converter as `"varchar"`.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: HashMap<String, Arc<dyn ColumnType>>,
}

impl TypeRegistry {
    /// A registry with every [`BuiltinType`] and its PostgreSQL aliases.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for builtin in BuiltinType::ALL {
            let ty: Arc<dyn ColumnType> = Arc::new(builtin);
            for alias in builtin.aliases() {
                registry.types.insert((*alias).to_string(), Arc::clone(&ty));
            }
            registry.register(ty);
        }
        registry
    }

    /// A registry without any types.
    pub fn empty() -> Self {
        Self {
            types: HashMap::new(),
        }
    }

    /// Register (or replace) a type under its own name.
    pub fn register(&mut self, ty: Arc<dyn ColumnType>) {
        self.types.insert(normalize_name(ty.name()), ty);
    }

    /// Make `alias` resolve to the already registered type `target`.
    pub fn alias(&mut self, alias: &str, target: &str) -> OrmResult<()> {
        let ty = self.resolve(target)?;
        self.types.insert(normalize_name(alias), ty);
        Ok(())
    }

    /// Resolve a type name. Unknown names are a [`OrmError::Conversion`] error.
    pub fn resolve(&self, name: &str) -> OrmResult<Arc<dyn ColumnType>> {
        self.types
            .get(&normalize_name(name))
            .cloned()
            .ok_or_else(|| OrmError::conversion(name, "unknown column type"))
    }

    /// Check if a type name resolves.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(&normalize_name(name))
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_name(name: &str) -> String {
    let base = match name.find('(') {
        Some(pos) => &name[..pos],
        None => name,
    };
    base.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}
