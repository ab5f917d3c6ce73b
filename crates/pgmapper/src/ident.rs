//! SQL identifier validation.
//!
//! Table and column names cannot be bound as parameters, so every identifier that
//! reaches a statement goes through [`Ident::parse`]:
//!
//! - Unquoted parts must match `[A-Za-z_][A-Za-z0-9_$]*`
//! - Quoted parts (`"CamelCase"`) allow anything except NUL, with `""` as the escape
//! - Parts may be dotted (`public.users`)
//!
//! Rendering is shared with the schema diff ([`pgmapper_schema::quote_part`]), so a
//! table created by schema sync is the table DML statements address. Names are
//! case-exact: `createdAt` and `"createdAt"` are the same column.

use crate::error::{OrmError, OrmResult};
use pgmapper_schema::quote_part;

/// A part of a SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentPart {
    Unquoted(String),
    Quoted(String),
}

/// A validated SQL identifier (column, table, or schema-qualified table).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub parts: Vec<IdentPart>,
}

impl Ident {
    /// Parse an identifier string, supporting dotted and quoted forms.
    pub fn parse(s: &str) -> OrmResult<Self> {
        if s.is_empty() {
            return Err(OrmError::invalid("identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(OrmError::invalid("identifier cannot contain NUL"));
        }

        let mut parts = Vec::new();
        let mut rest = s;
        loop {
            let (part, tail) = parse_part(rest, s)?;
            parts.push(part);
            match tail.strip_prefix('.') {
                Some("") => {
                    return Err(OrmError::invalid(format!("trailing '.' in identifier '{s}'")));
                }
                Some(next) => rest = next,
                None if tail.is_empty() => break,
                None => {
                    return Err(OrmError::invalid(format!("invalid identifier '{s}'")));
                }
            }
        }

        Ok(Self { parts })
    }

    /// Render the identifier as SQL.
    pub fn to_sql(&self) -> String {
        self.parts
            .iter()
            .map(|part| match part {
                IdentPart::Unquoted(name) | IdentPart::Quoted(name) => quote_part(name),
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// The raw name of a single-part identifier.
    pub fn single(&self) -> Option<&str> {
        match self.parts.as_slice() {
            [IdentPart::Unquoted(name) | IdentPart::Quoted(name)] => Some(name),
            _ => None,
        }
    }
}

/// Parse one dot-separated part; returns the part and the unconsumed input.
fn parse_part<'a>(input: &'a str, whole: &str) -> OrmResult<(IdentPart, &'a str)> {
    if let Some(quoted) = input.strip_prefix('"') {
        let mut name = String::new();
        let mut chars = quoted.char_indices().peekable();
        while let Some((idx, ch)) = chars.next() {
            if ch != '"' {
                name.push(ch);
                continue;
            }
            if matches!(chars.peek(), Some((_, '"'))) {
                chars.next();
                name.push('"');
                continue;
            }
            if name.is_empty() {
                return Err(OrmError::invalid("empty quoted identifier"));
            }
            return Ok((IdentPart::Quoted(name), &quoted[idx + 1..]));
        }
        return Err(OrmError::invalid(format!("unclosed quoted identifier '{whole}'")));
    }

    let end = input.find('.').unwrap_or(input.len());
    let name = &input[..end];
    let mut chars = name.chars();
    let valid_start = chars.next().is_some_and(|c| c == '_' || c.is_ascii_alphabetic());
    if !valid_start || !chars.all(|c| c == '_' || c == '$' || c.is_ascii_alphanumeric()) {
        return Err(OrmError::invalid(format!("invalid identifier '{whole}'")));
    }
    Ok((IdentPart::Unquoted(name.to_string()), &input[end..]))
}

/// Validate and render a table or column name.
pub fn quote(name: &str) -> OrmResult<String> {
    Ident::parse(name).map(|i| i.to_sql())
}

/// Validate and render a SELECT list entry: an identifier or `*`.
pub fn quote_field(name: &str) -> OrmResult<String> {
    if name == "*" {
        return Ok("*".to_string());
    }
    quote(name)
}
