//! WHERE clause expressions.
//!
//! `Expr::build()` generates SQL with correct `$n` placeholders: indices are
//! computed at build time from the shared [`ParamList`], never by string replacement
//! on the finished statement.

use crate::error::{OrmError, OrmResult};
use crate::ident;
use crate::qb::param::{Param, ParamList};

/// A single WHERE predicate.
#[derive(Clone, Debug)]
pub enum Expr {
    /// `column = $n`, or `column IS NULL` when the value is `Null`.
    Eq { column: String, value: Param },

    /// SQL boolean expression with `?` (or fragment-local `$n`) placeholders that
    /// get renumbered into the statement.
    /// Example: `Template { sql: "a = ? OR b = ?", params: [1, 2] }` -> `a = $1 OR b = $2`
    Template { sql: String, params: Vec<Param> },
}

impl Expr {
    /// Create an equality condition: column = value
    pub fn eq(column: impl Into<String>, value: Param) -> Self {
        Expr::Eq {
            column: column.into(),
            value,
        }
    }

    /// Create a template expression with `?` placeholders.
    pub fn template(sql: impl Into<String>, params: Vec<Param>) -> Self {
        Expr::Template {
            sql: sql.into(),
            params,
        }
    }

    /// Build the SQL fragment, collecting parameters into `params`.
    pub fn build(&self, params: &mut ParamList) -> OrmResult<String> {
        match self {
            Expr::Eq { column, value } => {
                let column = ident::quote(column)?;
                if value.is_null() {
                    return Ok(format!("{column} IS NULL"));
                }
                let idx = params.push(value.clone());
                Ok(format!("{column} = ${idx}"))
            }
            Expr::Template {
                sql,
                params: template_params,
            } => {
                if sql.trim().is_empty() {
                    return Err(OrmError::invalid("raw predicate cannot be empty"));
                }
                render_template(sql, template_params, params)
            }
        }
    }
}

/// Copy a raw predicate, moving its placeholders to statement positions.
///
/// A fragment uses either positional `?` or numbered `$1..$n` placeholders, the
/// latter counted within the fragment. `??` is a literal `?` (jsonb `?`, `?|`, `?&`).
/// Quoted literals, quoted identifiers, dollar-quoted strings and comments are
/// copied untouched.
fn render_template(sql: &str, values: &[Param], params: &mut ParamList) -> OrmResult<String> {
    let mut out = String::with_capacity(sql.len());
    let mut positional = 0;
    let mut numbered: Vec<Option<usize>> = vec![None; values.len()];
    let mut rest = sql;

    while let Some(ch) = rest.chars().next() {
        let after_word = out
            .chars()
            .next_back()
            .is_some_and(|c| c == '_' || c == '$' || c.is_alphanumeric());

        if let Some(len) = opaque_len(rest, after_word) {
            out.push_str(&rest[..len]);
            rest = &rest[len..];
            continue;
        }
        if let Some(tail) = rest.strip_prefix("??") {
            out.push('?');
            rest = tail;
            continue;
        }
        if let Some(tail) = rest.strip_prefix('?') {
            let value = values.get(positional).ok_or_else(|| {
                OrmError::invalid(format!(
                    "raw predicate '{sql}' has more placeholders than values"
                ))
            })?;
            positional += 1;
            let idx = params.push(value.clone());
            out.push_str(&format!("${idx}"));
            rest = tail;
            continue;
        }
        if let Some(tail) = rest.strip_prefix('$').filter(|_| !after_word) {
            let digits = tail.len() - tail.trim_start_matches(|c: char| c.is_ascii_digit()).len();
            if digits > 0 {
                let number = &tail[..digits];
                let slot = number
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .filter(|&i| i < values.len())
                    .ok_or_else(|| {
                        OrmError::invalid(format!("raw predicate '{sql}' has no value for ${number}"))
                    })?;
                let idx = *numbered[slot].get_or_insert_with(|| params.push(values[slot].clone()));
                out.push_str(&format!("${idx}"));
                rest = &tail[digits..];
                continue;
            }
        }
        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }

    let uses_numbered = numbered.iter().any(Option::is_some);
    if uses_numbered && positional > 0 {
        return Err(OrmError::invalid(format!(
            "raw predicate '{sql}' mixes ? and $n placeholders"
        )));
    }
    let unused = if uses_numbered {
        numbered.iter().any(Option::is_none)
    } else {
        positional < values.len()
    };
    if unused {
        return Err(OrmError::invalid(format!(
            "raw predicate '{sql}' has more values than placeholders"
        )));
    }
    Ok(out)
}

/// Length of a quoted literal, quoted identifier, dollar-quoted string or comment
/// starting at `rest`. Unterminated ones run to the end of the fragment.
fn opaque_len(rest: &str, after_word: bool) -> Option<usize> {
    let closing = |open: usize, close: &str| {
        rest[open..]
            .find(close)
            .map_or(rest.len(), |i| open + i + close.len())
    };
    if rest.starts_with('\'') {
        return Some(closing(1, "'"));
    }
    if rest.starts_with('"') {
        return Some(closing(1, "\""));
    }
    if rest.starts_with("--") {
        return Some(rest.find('\n').unwrap_or(rest.len()));
    }
    if rest.starts_with("/*") {
        return Some(closing(2, "*/"));
    }
    if rest.starts_with('$') && !after_word {
        let tag_len = rest[1..].find('$')?;
        let tag = &rest[1..=tag_len];
        let mut chars = tag.chars();
        let valid = match chars.next() {
            None => true,
            Some(first) => {
                (first == '_' || first.is_alphabetic())
                    && chars.all(|c| c == '_' || c.is_alphanumeric())
            }
        };
        if valid {
            let delimiter = &rest[..tag_len + 2];
            return Some(closing(delimiter.len(), delimiter));
        }
    }
    None
}

/// Predicates ANDed together into a WHERE clause.
#[derive(Clone, Debug, Default)]
pub struct ExprGroup {
    exprs: Vec<Expr>,
}

impl ExprGroup {
    pub fn new() -> Self {
        Self { exprs: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    /// Add an expression to be ANDed.
    pub fn and_expr(&mut self, expr: Expr) {
        self.exprs.push(expr);
    }

    /// Add a condition: column = value
    pub fn eq(&mut self, column: &str, value: Param) {
        self.exprs.push(Expr::eq(column, value));
    }

    /// Add a template condition with `?` placeholders.
    pub fn template(&mut self, sql: &str, params: Vec<Param>) {
        self.exprs.push(Expr::template(sql, params));
    }

    /// Build the clause body (without `WHERE`). Raw fragments are parenthesized so
    /// an `OR` inside one cannot escape the conjunction.
    pub fn build(&self, params: &mut ParamList) -> OrmResult<String> {
        let mut parts = Vec::with_capacity(self.exprs.len());
        for expr in &self.exprs {
            let sql = expr.build(params)?;
            if matches!(expr, Expr::Template { .. }) && self.exprs.len() > 1 {
                parts.push(format!("({sql})"));
            } else {
                parts.push(sql);
            }
        }
        Ok(parts.join(" AND "))
    }
}

impl FromIterator<Expr> for ExprGroup {
    fn from_iter<I: IntoIterator<Item = Expr>>(iter: I) -> Self {
        Self {
            exprs: iter.into_iter().collect(),
        }
    }
}
