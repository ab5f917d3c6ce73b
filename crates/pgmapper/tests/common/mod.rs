//! In-memory backend for integration tests.
//!
//! Understands exactly the statement shapes the query builders render and keeps
//! every statement it was handed, so tests can assert on SQL and on call counts.
//! Identifiers found in SQL text are resolved the way PostgreSQL resolves them:
//! unquoted parts fold to lowercase and dots separate schema from table.

#![allow(dead_code)]

use pgmapper::{Backend, OrmError, OrmResult, RowData, Statement, TableSchema, Value};
use pgmapper_schema::{diff_table, name_parts};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug)]
pub struct Table {
    pub schema: TableSchema,
    pub rows: Vec<RowData>,
}

#[derive(Debug, Default)]
pub struct State {
    /// Keyed by resolved name parts.
    pub tables: HashMap<Vec<String>, Table>,
    pub statements: Vec<Statement>,
    pub batches: Vec<Vec<String>>,
    pub schema_reads: usize,
    /// Desired schemas seen by the last diff, applied by the next batch to the
    /// table its DDL names.
    pending: Vec<(Vec<String>, TableSchema)>,
    pub fail_next_batch: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<State>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Create a table directly, bypassing schema sync.
    pub fn with_table(self, schema: TableSchema) -> Self {
        self.state().tables.insert(
            name_parts(&schema.name),
            Table {
                schema,
                rows: Vec::new(),
            },
        );
        self
    }

    pub fn rows(&self, table: &str) -> Vec<RowData> {
        self.state()
            .tables
            .get(&name_parts(table))
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    pub fn schema(&self, table: &str) -> Option<TableSchema> {
        self.state()
            .tables
            .get(&name_parts(table))
            .map(|t| t.schema.clone())
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.state().statements.clone()
    }

    pub fn last_sql(&self) -> Option<String> {
        self.state().statements.last().map(|s| s.sql.clone())
    }

    /// Number of calls that reached the backend.
    pub fn calls(&self) -> usize {
        let state = self.state();
        state.statements.len() + state.schema_reads + state.batches.len()
    }

    pub fn fail_next_batch(&self) {
        self.state().fail_next_batch = true;
    }
}

impl Backend for MemoryBackend {
    async fn query(&self, stmt: &Statement) -> OrmResult<Vec<RowData>> {
        let mut state = self.state();
        state.statements.push(stmt.clone());
        run_select(&state, stmt)
    }

    async fn execute(&self, stmt: &Statement) -> OrmResult<u64> {
        let mut state = self.state();
        state.statements.push(stmt.clone());
        let sql = stmt.sql.as_str();
        if sql.starts_with("INSERT INTO ") {
            run_insert(&mut state, stmt)
        } else if sql.starts_with("UPDATE ") {
            run_update(&mut state, stmt)
        } else if sql.starts_with("DELETE FROM ") {
            run_delete(&mut state, stmt)
        } else {
            Err(OrmError::Backend(format!("unsupported statement: {sql}")))
        }
    }

    async fn table_schema(&self, table: &str) -> OrmResult<Option<TableSchema>> {
        let mut state = self.state();
        state.schema_reads += 1;
        Ok(state.tables.get(&name_parts(table)).map(|t| t.schema.clone()))
    }

    fn diff_schema(&self, desired: &TableSchema, current: Option<&TableSchema>) -> Vec<String> {
        let statements = diff_table(desired, current);
        if let Some(target) = statements.first().and_then(|sql| ddl_table(sql)) {
            self.state().pending.push((target, desired.clone()));
        }
        statements
    }

    async fn execute_batch(&self, statements: &[String]) -> OrmResult<()> {
        let mut state = self.state();
        state.batches.push(statements.to_vec());
        let pending = std::mem::take(&mut state.pending);
        if std::mem::take(&mut state.fail_next_batch) {
            return Err(OrmError::Backend("batch rolled back".to_string()));
        }
        for (target, mut desired) in pending {
            match state.tables.get_mut(&target) {
                Some(table) => {
                    // Undeclared live columns are kept.
                    for live in &table.schema.columns {
                        if !desired.has_column(&live.name) {
                            desired.columns.push(live.clone());
                        }
                    }
                    table.schema = desired;
                }
                None => {
                    state.tables.insert(
                        target,
                        Table {
                            schema: desired,
                            rows: Vec::new(),
                        },
                    );
                }
            }
        }
        Ok(())
    }
}

// ─── Statement evaluation ───────────────────────────────────────────────────

/// Resolve an identifier as written in SQL into its name parts.
fn resolve_parts(sql: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = sql.chars().peekable();
    let mut quoted = false;
    while let Some(ch) = chars.next() {
        match ch {
            '"' if quoted && chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
            }
            '"' => quoted = !quoted,
            '.' if !quoted => parts.push(std::mem::take(&mut current)),
            _ if quoted => current.push(ch),
            _ => current.push(ch.to_ascii_lowercase()),
        }
    }
    parts.push(current);
    parts
}

/// Resolve a column reference.
fn resolve(sql: &str) -> String {
    resolve_parts(sql).join(".")
}

/// The table named by a `CREATE TABLE` or `ALTER TABLE` statement.
fn ddl_table(sql: &str) -> Option<Vec<String>> {
    let rest = sql
        .strip_prefix("CREATE TABLE ")
        .or_else(|| sql.strip_prefix("ALTER TABLE "))?;
    let mut quoted = false;
    let end = rest
        .char_indices()
        .find(|&(_, ch)| {
            if ch == '"' {
                quoted = !quoted;
            }
            ch == ' ' && !quoted
        })
        .map_or(rest.len(), |(i, _)| i);
    Some(resolve_parts(&rest[..end]))
}

fn param(stmt: &Statement, placeholder: &str) -> OrmResult<Value> {
    placeholder
        .strip_prefix('$')
        .and_then(|n| n.parse::<usize>().ok())
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| stmt.params.get(i))
        .map(|p| p.value.clone())
        .ok_or_else(|| OrmError::Backend(format!("unbound placeholder {placeholder}")))
}

enum Cond {
    Eq(String, Value),
    IsNull(String),
}

impl Cond {
    fn matches(&self, row: &RowData) -> bool {
        match self {
            Cond::Eq(column, value) => row.get(column) == Some(value),
            Cond::IsNull(column) => row.get(column).is_none_or(Value::is_null),
        }
    }
}

fn parse_where(stmt: &Statement, clause: &str) -> OrmResult<Vec<Cond>> {
    clause
        .split(" AND ")
        .map(|part| {
            if let Some(column) = part.strip_suffix(" IS NULL") {
                return Ok(Cond::IsNull(resolve(column)));
            }
            match part.split_once(" = ") {
                Some((column, ph)) if ph.starts_with('$') => {
                    Ok(Cond::Eq(resolve(column), param(stmt, ph)?))
                }
                _ => Err(OrmError::Backend(format!("unsupported condition: {part}"))),
            }
        })
        .collect()
}

fn lookup<'a>(state: &'a State, name: &str) -> OrmResult<&'a Table> {
    state
        .tables
        .get(&resolve_parts(name))
        .ok_or_else(|| OrmError::Backend(format!("relation \"{name}\" does not exist")))
}

fn lookup_mut<'a>(state: &'a mut State, name: &str) -> OrmResult<&'a mut Table> {
    state
        .tables
        .get_mut(&resolve_parts(name))
        .ok_or_else(|| OrmError::Backend(format!("relation \"{name}\" does not exist")))
}

fn check_column(table: &Table, column: &str) -> OrmResult<()> {
    if table.schema.has_column(column) {
        Ok(())
    } else {
        Err(OrmError::Backend(format!(
            "column \"{column}\" of relation \"{}\" does not exist",
            table.schema.name
        )))
    }
}

/// Split `text` at the first of `keywords` that occurs in it.
fn split_at_any<'a>(text: &'a str, keywords: &[&str]) -> (&'a str, &'a str) {
    keywords
        .iter()
        .filter_map(|k| text.find(k))
        .min()
        .map_or((text, ""), |pos| (&text[..pos], &text[pos..]))
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Int(a)), Some(Value::Int(b))) => a.cmp(b),
        (Some(Value::Float(a)), Some(Value::Float(b))) => a.total_cmp(b),
        (Some(Value::Text(a)), Some(Value::Text(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (Some(Value::Timestamp(a)), Some(Value::Timestamp(b))) => a.cmp(b),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        // NULLS LAST
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

fn run_select(state: &State, stmt: &Statement) -> OrmResult<Vec<RowData>> {
    let sql = stmt
        .sql
        .strip_prefix("SELECT ")
        .ok_or_else(|| OrmError::Backend(format!("unsupported query: {}", stmt.sql)))?;
    let (distinct, sql) = match sql.strip_prefix("DISTINCT ") {
        Some(rest) => (true, rest),
        None => (false, sql),
    };
    let (list, rest) = sql
        .split_once(" FROM ")
        .ok_or_else(|| OrmError::Backend(format!("missing FROM: {}", stmt.sql)))?;
    let (name, mut rest) = split_at_any(rest, &[" WHERE ", " ORDER BY ", " LIMIT ", " OFFSET "]);
    let table = lookup(state, name)?;

    let mut conds = Vec::new();
    if let Some(after) = rest.strip_prefix(" WHERE ") {
        let (clause, tail) = split_at_any(after, &[" ORDER BY ", " LIMIT ", " OFFSET "]);
        conds = parse_where(stmt, clause)?;
        rest = tail;
    }
    let matching: Vec<&RowData> = table
        .rows
        .iter()
        .filter(|row| conds.iter().all(|c| c.matches(row)))
        .collect();

    if list == "COUNT(*) AS count" {
        let count = i64::try_from(matching.len()).unwrap_or(i64::MAX);
        return Ok(vec![RowData::from([("count".to_string(), Value::Int(count))])]);
    }

    let mut order = Vec::new();
    if let Some(after) = rest.strip_prefix(" ORDER BY ") {
        let (clause, tail) = split_at_any(after, &[" LIMIT ", " OFFSET "]);
        for entry in clause.split(", ") {
            let (column, dir) = entry
                .rsplit_once(' ')
                .ok_or_else(|| OrmError::Backend(format!("bad ORDER BY entry: {entry}")))?;
            order.push((resolve(column), dir.eq_ignore_ascii_case("desc")));
        }
        rest = tail;
    }
    let mut limit = None;
    if let Some(after) = rest.strip_prefix(" LIMIT ") {
        let (n, tail) = split_at_any(after, &[" OFFSET "]);
        limit = n.parse::<usize>().ok();
        rest = tail;
    }
    let offset = rest
        .strip_prefix(" OFFSET ")
        .and_then(|n| n.parse::<usize>().ok())
        .unwrap_or(0);

    let columns: Vec<String> = if list == "*" {
        table.schema.columns.iter().map(|c| c.name.clone()).collect()
    } else {
        list.split(", ").map(resolve).collect()
    };
    for column in &columns {
        check_column(table, column)?;
    }

    let mut rows = matching;
    rows.sort_by(|a, b| {
        order
            .iter()
            .map(|(column, desc)| {
                let ord = compare(a.get(column), b.get(column));
                if *desc { ord.reverse() } else { ord }
            })
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });

    let mut out: Vec<RowData> = Vec::new();
    for row in rows {
        let projected: RowData = columns
            .iter()
            .map(|c| (c.clone(), row.get(c).cloned().unwrap_or(Value::Null)))
            .collect();
        if !(distinct && out.contains(&projected)) {
            out.push(projected);
        }
    }
    Ok(out
        .into_iter()
        .skip(offset)
        .take(limit.unwrap_or(usize::MAX))
        .collect())
}

fn run_insert(state: &mut State, stmt: &Statement) -> OrmResult<u64> {
    let rest = &stmt.sql["INSERT INTO ".len()..];
    let (name, rest) = rest
        .split_once(" (")
        .ok_or_else(|| OrmError::Backend(format!("bad insert: {}", stmt.sql)))?;
    let (columns, rest) = rest
        .split_once(") VALUES (")
        .ok_or_else(|| OrmError::Backend(format!("bad insert: {}", stmt.sql)))?;
    let placeholders = rest.trim_end_matches(')');

    let table = lookup_mut(state, name)?;
    let mut row = RowData::new();
    for (column, ph) in columns.split(", ").zip(placeholders.split(", ")) {
        let column = resolve(column);
        check_column(table, &column)?;
        row.insert(column, param(stmt, ph)?);
    }

    let key = &table.schema.primary_key;
    if !key.is_empty()
        && table
            .rows
            .iter()
            .any(|existing| key.iter().all(|k| existing.get(k) == row.get(k)))
    {
        return Err(OrmError::UniqueViolation(format!("{name}_pkey")));
    }
    table.rows.push(row);
    Ok(1)
}

fn run_update(state: &mut State, stmt: &Statement) -> OrmResult<u64> {
    let rest = &stmt.sql["UPDATE ".len()..];
    let (name, rest) = rest
        .split_once(" SET ")
        .ok_or_else(|| OrmError::Backend(format!("bad update: {}", stmt.sql)))?;
    let (sets, clause) = rest
        .split_once(" WHERE ")
        .ok_or_else(|| OrmError::Backend(format!("update without WHERE: {}", stmt.sql)))?;
    let conds = parse_where(stmt, clause)?;

    let table = lookup_mut(state, name)?;
    let mut assignments = Vec::new();
    for set in sets.split(", ") {
        let (column, ph) = set
            .split_once(" = ")
            .ok_or_else(|| OrmError::Backend(format!("bad assignment: {set}")))?;
        let column = resolve(column);
        check_column(table, &column)?;
        assignments.push((column, param(stmt, ph)?));
    }

    let mut affected = 0;
    for row in table.rows.iter_mut().filter(|row| conds.iter().all(|c| c.matches(row))) {
        for (column, value) in &assignments {
            row.insert(column.clone(), value.clone());
        }
        affected += 1;
    }
    Ok(affected)
}

fn run_delete(state: &mut State, stmt: &Statement) -> OrmResult<u64> {
    let rest = &stmt.sql["DELETE FROM ".len()..];
    let (name, clause) = rest
        .split_once(" WHERE ")
        .ok_or_else(|| OrmError::Backend(format!("delete without WHERE: {}", stmt.sql)))?;
    let conds = parse_where(stmt, clause)?;

    let table = lookup_mut(state, name)?;
    let before = table.rows.len();
    table.rows.retain(|row| !conds.iter().all(|c| c.matches(row)));
    Ok((before - table.rows.len()) as u64)
}
