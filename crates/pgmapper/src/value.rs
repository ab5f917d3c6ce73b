//! Dynamic values exchanged between entities, the codec and the backend.
//!
//! [`Value`] is both the application-side representation (what entities read and
//! write) and the storage-side representation (what gets bound as a statement
//! parameter). Which variant a column uses on each side is decided by its
//! [`ColumnType`](crate::types::ColumnType).

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use std::error::Error;
use tokio_postgres::types::{IsNull, ToSql, Type};
use uuid::Uuid;

use crate::error::{OrmError, OrmResult};

/// Row-shaped data: column name → value, in insertion order.
pub type RowData = IndexMap<String, Value>;

/// A single column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Uuid(Uuid),
}

impl Value {
    /// Whether this is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short variant name, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Json(_) => "json",
            Value::Timestamp(_) => "timestamp",
            Value::Date(_) => "date",
            Value::Uuid(_) => "uuid",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert into a JSON document. Bytes become an array of numbers.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as J;
        match self {
            Value::Null => J::Null,
            Value::Bool(v) => J::Bool(*v),
            Value::Int(v) => J::from(*v),
            Value::Float(v) => J::from(*v),
            Value::Text(v) => J::String(v.clone()),
            Value::Bytes(v) => J::from(v.clone()),
            Value::Json(v) => v.clone(),
            Value::Timestamp(v) => J::String(v.to_rfc3339()),
            Value::Date(v) => J::String(v.format("%Y-%m-%d").to_string()),
            Value::Uuid(v) => J::String(v.to_string()),
        }
    }
}

// ─── Rust → Value ───────────────────────────────────────────────────────────

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Int,
    u16 => Int,
    u32 => Int,
    f32 => Float,
    f64 => Float,
    String => Text,
    &str => Text,
    Vec<u8> => Bytes,
    serde_json::Value => Json,
    DateTime<Utc> => Timestamp,
    NaiveDate => Date,
    Uuid => Uuid,
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// ─── Value → Rust ───────────────────────────────────────────────────────────

/// Extract a Rust value from a [`Value`].
///
/// Used by entity accessors when writing a denormalized value back into a field.
/// `Null` only converts into `Option<T>` (or `Value` itself).
pub trait FromValue: Sized {
    fn from_value(value: Value) -> OrmResult<Self>;
}

fn mismatch<T>(expected: &str, value: &Value) -> OrmResult<T> {
    Err(OrmError::conversion(
        expected,
        format!("cannot read a {} value as {}", value.kind(), expected),
    ))
}

impl FromValue for Value {
    fn from_value(value: Value) -> OrmResult<Self> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Bool(v) => Ok(v),
            other => mismatch("bool", &other),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Int(v) => Ok(v),
            other => mismatch("i64", &other),
        }
    }
}

macro_rules! impl_from_value_int {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> OrmResult<Self> {
                    match value {
                        Value::Int(v) => <$ty>::try_from(v).map_err(|e| {
                            OrmError::conversion(stringify!($ty), format!("{v}: {e}"))
                        }),
                        other => mismatch(stringify!($ty), &other),
                    }
                }
            }
        )*
    };
}

impl_from_value_int!(i16, i32, u8, u16, u32);

impl FromValue for f64 {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as f64),
            other => mismatch("f64", &other),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> OrmResult<Self> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Text(v) => Ok(v),
            other => mismatch("String", &other),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Bytes(v) => Ok(v),
            other => mismatch("Vec<u8>", &other),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Json(v) => Ok(v),
            other => Ok(other.to_json()),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Timestamp(v) => Ok(v),
            other => mismatch("DateTime<Utc>", &other),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Date(v) => Ok(v),
            other => mismatch("NaiveDate", &other),
        }
    }
}

impl FromValue for Uuid {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Uuid(v) => Ok(v),
            other => mismatch("Uuid", &other),
        }
    }
}

// ─── Parameter binding ──────────────────────────────────────────────────────

fn encode<T: ToSql>(
    value: &T,
    kind: &str,
    ty: &Type,
    out: &mut BytesMut,
) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
    if !T::accepts(ty) {
        return Err(format!("cannot bind a {kind} value as {ty}").into());
    }
    value.to_sql(ty, out)
}

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        let kind = self.kind();
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => encode(v, kind, ty, out),
            // Integers are stored widened; narrow them to the parameter's declared width.
            Value::Int(v) => match *ty {
                Type::INT2 => encode(&i16::try_from(*v)?, kind, ty, out),
                Type::INT4 => encode(&i32::try_from(*v)?, kind, ty, out),
                Type::FLOAT8 => encode(&(*v as f64), kind, ty, out),
                Type::TEXT | Type::VARCHAR => encode(&v.to_string(), kind, ty, out),
                _ => encode(v, kind, ty, out),
            },
            Value::Float(v) => match *ty {
                Type::FLOAT4 => encode(&(*v as f32), kind, ty, out),
                _ => encode(v, kind, ty, out),
            },
            Value::Text(v) => encode(v, kind, ty, out),
            Value::Bytes(v) => encode(v, kind, ty, out),
            Value::Json(v) => encode(v, kind, ty, out),
            Value::Timestamp(v) => match *ty {
                Type::TIMESTAMP => encode(&v.naive_utc(), kind, ty, out),
                _ => encode(v, kind, ty, out),
            },
            Value::Date(v) => encode(v, kind, ty, out),
            Value::Uuid(v) => encode(v, kind, ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        // Compatibility is checked per variant in `to_sql`.
        true
    }

    tokio_postgres::types::to_sql_checked!();
}
