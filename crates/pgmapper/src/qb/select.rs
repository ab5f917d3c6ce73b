//! SELECT query builder.

use crate::error::{OrmError, OrmResult};
use crate::ident;
use crate::options::{OrderBy, QueryOptions};
use crate::qb::expr::ExprGroup;
use crate::qb::param::{Param, ParamList};
use crate::qb::statement::Statement;
use crate::qb::traits::SqlQb;
use crate::value::Value;

/// SELECT query builder.
///
/// Renders `SELECT [DISTINCT] <fields> FROM <table> [WHERE ..] [ORDER BY ..] [LIMIT n] [OFFSET m]`.
#[derive(Clone, Debug)]
pub struct SelectQb {
    table: String,
    /// SELECT columns (default ["*"])
    fields: Vec<String>,
    distinct: bool,
    where_group: ExprGroup,
    order_by: Vec<OrderBy>,
    limit: Option<u64>,
    offset: Option<u64>,
    count: bool,
}

impl SelectQb {
    /// Create a new SELECT query builder for a table.
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            fields: vec!["*".to_string()],
            distinct: false,
            where_group: ExprGroup::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            count: false,
        }
    }

    /// Create a `SELECT COUNT(*) AS count` builder for a table.
    ///
    /// Fields, ordering and pagination are ignored for counts.
    pub fn count(table: &str) -> Self {
        Self {
            count: true,
            ..Self::new(table)
        }
    }

    /// Apply fields, ordering, pagination and `DISTINCT` from `options`.
    pub fn with_options(mut self, options: &QueryOptions) -> Self {
        self.fields = options.fields.clone();
        self.distinct = options.distinct;
        self.order_by = options.order_by.clone();
        self.limit = options.limit;
        self.offset = options.offset;
        self
    }

    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    // ==================== WHERE conditions ====================

    /// Add WHERE: column = value (untyped parameter)
    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.where_group.eq(column, Param::new(value));
        self
    }

    /// Add WHERE: column = value with a prepared parameter
    pub fn eq_param(mut self, column: &str, value: Param) -> Self {
        self.where_group.eq(column, value);
        self
    }

    /// Add a WHERE template with `?` placeholders.
    pub fn where_template(mut self, sql: &str, params: Vec<Param>) -> Self {
        self.where_group.template(sql, params);
        self
    }

    /// Replace the WHERE conditions.
    pub fn where_group(mut self, group: ExprGroup) -> Self {
        self.where_group = group;
        self
    }

    // ==================== ORDER BY / pagination ====================

    /// Add ORDER BY column ASC
    pub fn order_by(mut self, column: &str) -> Self {
        self.order_by.push(OrderBy::Column(column.to_string()));
        self
    }

    /// Add ORDER BY column with an explicit direction
    pub fn order_by_dir(mut self, column: &str, direction: &str) -> Self {
        self.order_by.push(OrderBy::Directed {
            column: column.to_string(),
            direction: direction.to_string(),
        });
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    fn select_list(&self) -> OrmResult<String> {
        if self.count {
            return Ok("COUNT(*) AS count".to_string());
        }
        if self.fields.is_empty() {
            return Err(OrmError::invalid("select needs at least one field"));
        }
        let fields = self
            .fields
            .iter()
            .map(|f| ident::quote_field(f))
            .collect::<OrmResult<Vec<_>>>()?;
        Ok(fields.join(", "))
    }
}

impl SqlQb for SelectQb {
    fn build(&self) -> OrmResult<Statement> {
        let mut params = ParamList::new();

        let mut sql = String::from("SELECT ");
        if self.distinct && !self.count {
            sql.push_str("DISTINCT ");
        }
        sql.push_str(&self.select_list()?);
        sql.push_str(" FROM ");
        sql.push_str(&ident::quote(&self.table)?);

        if !self.where_group.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_group.build(&mut params)?);
        }

        if !self.count {
            if !self.order_by.is_empty() {
                let clauses = self
                    .order_by
                    .iter()
                    .map(OrderBy::to_sql)
                    .collect::<OrmResult<Vec<_>>>()?;
                sql.push_str(" ORDER BY ");
                sql.push_str(&clauses.join(", "));
            }

            if let Some(limit) = self.limit {
                sql.push_str(&format!(" LIMIT {limit}"));
            }

            if let Some(offset) = self.offset {
                sql.push_str(&format!(" OFFSET {offset}"));
            }
        }

        Ok(Statement::new(sql, params.into_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_select() {
        let qb = SelectQb::new("users");
        assert_eq!(qb.to_sql().unwrap(), "SELECT * FROM users");
    }

    #[test]
    fn test_select_with_columns_and_distinct() {
        let qb = SelectQb::new("users").fields(&["id", "email"]).distinct(true);
        assert_eq!(qb.to_sql().unwrap(), "SELECT DISTINCT id, email FROM users");
    }

    #[test]
    fn test_select_with_where() {
        let stmt = SelectQb::new("users")
            .eq("status", "active")
            .eq("age", 18)
            .build()
            .unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM users WHERE status = $1 AND age = $2");
        assert_eq!(stmt.params.len(), 2);
        assert_eq!(stmt.params[1].value, Value::Int(18));
    }

    #[test]
    fn test_null_equality_is_not_bound() {
        let stmt = SelectQb::new("users")
            .eq("deleted_at", Value::Null)
            .eq("id", 1)
            .build()
            .unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM users WHERE deleted_at IS NULL AND id = $1");
        assert_eq!(stmt.params.len(), 1);
    }

    #[test]
    fn test_template_renumbered_after_eq() {
        let stmt = SelectQb::new("users")
            .eq("tenant", 7)
            .where_template("age > ? OR vip = ?", vec![Param::new(18), Param::new(true)])
            .build()
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT * FROM users WHERE tenant = $1 AND (age > $2 OR vip = $3)"
        );
        assert_eq!(stmt.params.len(), 3);
    }

    #[test]
    fn test_single_template_not_wrapped() {
        let qb = SelectQb::new("users").where_template("name LIKE '?%' AND id > ?", vec![Param::new(3)]);
        assert_eq!(
            qb.to_sql().unwrap(),
            "SELECT * FROM users WHERE name LIKE '?%' AND id > $1"
        );
    }

    #[test]
    fn test_template_placeholder_mismatch() {
        let err = SelectQb::new("users")
            .where_template("a = ? AND b = ?", vec![Param::new(1)])
            .build()
            .unwrap_err();
        assert!(err.is_invalid_argument());

        let err = SelectQb::new("users")
            .where_template("a = ?", vec![Param::new(1), Param::new(2)])
            .build()
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_template_escaped_question_mark_is_jsonb_operator() {
        let stmt = SelectQb::new("docs")
            .where_template("tags ?? 'a' AND tags ??| ?", vec![Param::new("b")])
            .build()
            .unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM docs WHERE tags ? 'a' AND tags ?| $1");
        assert_eq!(stmt.params.len(), 1);

        let stmt = SelectQb::new("docs")
            .where_template("tags ??& ?", vec![Param::new("c")])
            .build()
            .unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM docs WHERE tags ?& $1");
    }

    #[test]
    fn test_template_skips_quoted_identifiers_and_comments() {
        let qb = SelectQb::new("docs").where_template(
            r#""odd?name" = ? /* why? */ AND body <> $$what?$$ AND note <> $t$ok?$t$ -- fine?"#,
            vec![Param::new(1)],
        );
        assert_eq!(
            qb.to_sql().unwrap(),
            r#"SELECT * FROM docs WHERE "odd?name" = $1 /* why? */ AND body <> $$what?$$ AND note <> $t$ok?$t$ -- fine?"#
        );
    }

    #[test]
    fn test_template_with_numbered_placeholders() {
        let stmt = SelectQb::new("users")
            .eq("tenant", 7)
            .where_template("a = $2 OR b = $1 OR c = $2", vec![Param::new(10), Param::new(20)])
            .build()
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT * FROM users WHERE tenant = $1 AND (a = $2 OR b = $3 OR c = $2)"
        );
        assert_eq!(stmt.params.len(), 3);
        assert_eq!(stmt.params[1].value, crate::value::Value::Int(20));

        let stmt = SelectQb::new("prices")
            .where_template("amount$1 > $1", vec![Param::new(5)])
            .build()
            .unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM prices WHERE amount$1 > $1");
    }

    #[test]
    fn test_template_numbered_placeholder_errors() {
        for (sql, values) in [
            ("a = $3", vec![Param::new(1)]),
            ("a = $0", vec![Param::new(1)]),
            ("a = $1", vec![Param::new(1), Param::new(2)]),
            ("a = $1 OR b = ?", vec![Param::new(1), Param::new(2)]),
            ("tags ? 'a'", vec![]),
        ] {
            let err = SelectQb::new("t")
                .where_template(sql, values)
                .build()
                .unwrap_err();
            assert!(err.is_invalid_argument(), "{sql}: {err}");
        }
    }

    #[test]
    fn test_select_with_order_and_limit() {
        let qb = SelectQb::new("users")
            .order_by("name")
            .order_by_dir("created_at", "desc")
            .limit(10)
            .offset(20);
        assert_eq!(
            qb.to_sql().unwrap(),
            "SELECT * FROM users ORDER BY name ASC, created_at desc LIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn test_with_options() {
        let opts = QueryOptions::new()
            .fields(["id"])
            .order_by_dir("id", "DESC")
            .limit(1)
            .distinct(true);
        let qb = SelectQb::new("users").eq("email", "a@x.com").with_options(&opts);
        assert_eq!(
            qb.to_sql().unwrap(),
            "SELECT DISTINCT id FROM users WHERE email = $1 ORDER BY id DESC LIMIT 1"
        );
    }

    #[test]
    fn test_count_sql() {
        let qb = SelectQb::count("users").eq("status", "active").order_by("id").limit(5);
        assert_eq!(
            qb.to_sql().unwrap(),
            "SELECT COUNT(*) AS count FROM users WHERE status = $1"
        );
    }

    #[test]
    fn test_rejects_bad_identifiers() {
        assert!(SelectQb::new("users; DROP TABLE users").build().is_err());
        assert!(SelectQb::new("users").fields(&["id, password"]).build().is_err());
        assert!(SelectQb::new("users").order_by("id DESC").build().is_err());
        assert!(SelectQb::new("users").order_by_dir("id", "sideways").build().is_err());
        assert!(SelectQb::new("users").eq("1=1 OR id", 1).build().is_err());
    }

    #[test]
    fn test_quoted_identifiers_pass_through() {
        let qb = SelectQb::new(r#"public."Users""#).fields(&[r#""Email""#]);
        assert_eq!(
            qb.to_sql().unwrap(),
            r#"SELECT "Email" FROM public."Users""#
        );
    }
}
