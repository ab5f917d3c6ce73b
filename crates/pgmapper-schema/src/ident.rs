//! Identifier rendering shared by DDL and DML.
//!
//! Names are case-exact: `createdAt` names the column `createdAt`, not `createdat`.
//! A part is written bare only when PostgreSQL would not fold it (plain lowercase),
//! otherwise it is double-quoted. Dots separate schema from table unless they sit
//! inside a quoted part.

/// Split a possibly qualified, possibly quoted name into its raw parts.
///
/// `audit.events` gives `["audit", "events"]`, `"a.b"` gives `["a.b"]` and
/// `"say ""hi"""` gives `["say \"hi\""]`.
pub fn name_parts(name: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = name.chars().peekable();
    let mut quoted = false;
    while let Some(ch) = chars.next() {
        match ch {
            '"' if quoted && chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
            }
            '"' => quoted = !quoted,
            '.' if !quoted => parts.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    parts.push(current);
    parts
}

/// Render one raw name part.
pub fn quote_part(part: &str) -> String {
    let mut chars = part.chars();
    let plain = chars
        .next()
        .is_some_and(|c| c == '_' || c.is_ascii_lowercase())
        && chars.all(|c| c == '_' || c.is_ascii_lowercase() || c.is_ascii_digit());
    if plain {
        part.to_string()
    } else {
        format!("\"{}\"", part.replace('"', "\"\""))
    }
}

/// Render a possibly qualified name, part by part.
pub fn quote_ident(name: &str) -> String {
    name_parts(name)
        .iter()
        .map(|part| quote_part(part))
        .collect::<Vec<_>>()
        .join(".")
}

/// The unqualified table name: the last part of `name`.
pub fn base_name(name: &str) -> String {
    name_parts(name).pop().unwrap_or_default()
}

/// Name PostgreSQL gives an unnamed primary key constraint on `table`.
pub fn pkey_name(table: &str) -> String {
    format!("{}_pkey", base_name(table))
}
