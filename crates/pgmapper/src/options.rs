//! Select options and filters accepted by [`Database`](crate::Database) and
//! [`Repository`](crate::Repository).

use crate::error::{OrmError, OrmResult};
use crate::ident;
use crate::value::{RowData, Value};

/// One ORDER BY entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderBy {
    /// A bare column, sorted ascending.
    Column(String),
    /// A column with an explicit `asc`/`desc` direction, rendered as supplied.
    Directed { column: String, direction: String },
}

impl OrderBy {
    pub fn column(&self) -> &str {
        match self {
            OrderBy::Column(column) | OrderBy::Directed { column, .. } => column,
        }
    }

    /// Render the entry, validating the column and the direction.
    pub fn to_sql(&self) -> OrmResult<String> {
        match self {
            OrderBy::Column(column) => Ok(format!("{} ASC", ident::quote(column)?)),
            OrderBy::Directed { column, direction } => {
                let dir = direction.trim();
                if !dir.eq_ignore_ascii_case("asc") && !dir.eq_ignore_ascii_case("desc") {
                    return Err(OrmError::invalid(format!(
                        "invalid sort direction '{direction}' for column '{column}'"
                    )));
                }
                Ok(format!("{} {}", ident::quote(column)?, dir))
            }
        }
    }
}

/// Options for a select: projected fields, ordering, pagination and `DISTINCT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    pub fields: Vec<String>,
    pub order_by: Vec<OrderBy>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
    pub distinct: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            fields: vec!["*".to_string()],
            order_by: Vec::new(),
            offset: None,
            limit: None,
            distinct: false,
        }
    }
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the projected fields.
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Sort ascending by `column`.
    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by.push(OrderBy::Column(column.into()));
        self
    }

    /// Sort by `column` in an explicit direction (`asc`/`desc`, any case).
    pub fn order_by_dir(mut self, column: impl Into<String>, direction: impl Into<String>) -> Self {
        self.order_by.push(OrderBy::Directed {
            column: column.into(),
            direction: direction.into(),
        });
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }
}

/// One filter predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column = value`; a `Null` value matches `IS NULL`.
    Eq { column: String, value: Value },
    /// A SQL boolean expression with `?` placeholders and their values.
    Raw { sql: String, values: Vec<Value> },
}

/// Ordered predicates, ANDed together.
///
/// An empty filter matches every row. Select and count accept it; update and
/// delete reject it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality predicate.
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicates.push(Predicate::Eq {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    /// Add a raw predicate such as `"age > ? OR vip = ?"` or `"id BETWEEN $1 AND $2"`.
    ///
    /// Write `??` for a literal `?` operator: `"tags ?? 'beta'"`.
    pub fn raw(mut self, sql: impl Into<String>, values: Vec<Value>) -> Self {
        self.predicates.push(Predicate::Raw {
            sql: sql.into(),
            values,
        });
        self
    }

    /// One equality predicate per row entry, in row order.
    pub fn from_row(row: &RowData) -> Self {
        row.iter()
            .fold(Self::new(), |filter, (column, value)| {
                filter.eq(column.as_str(), value.clone())
            })
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }
}
