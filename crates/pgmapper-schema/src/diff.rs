//! Schema diff: corrective DDL that turns a live table into the desired one.
//!
//! The diff is table-scoped. Other tables in the database are never touched, and
//! columns that exist only in the live table are kept unless
//! [`DiffOptions::drop_columns`] is set.

use crate::ident::{pkey_name, quote_ident, quote_part};
use crate::schema::{ColumnSchema, TableSchema};

/// Knobs for [`diff_table_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffOptions {
    /// Emit `DROP COLUMN` for live columns that are not declared.
    pub drop_columns: bool,
}

/// Compute the statements needed to bring `current` in line with `desired`.
///
/// `current == None` means the table does not exist yet. An empty result means the
/// live table already matches.
pub fn diff_table(desired: &TableSchema, current: Option<&TableSchema>) -> Vec<String> {
    diff_table_with(desired, current, DiffOptions::default())
}

/// [`diff_table`] with explicit options.
pub fn diff_table_with(
    desired: &TableSchema,
    current: Option<&TableSchema>,
    options: DiffOptions,
) -> Vec<String> {
    let Some(current) = current else {
        return vec![create_table_sql(desired)];
    };

    let table = quote_ident(&desired.name);
    let mut out = Vec::new();

    let pk_changed = desired.primary_key != current.primary_key;
    if pk_changed && !current.primary_key.is_empty() {
        out.push(format!(
            "ALTER TABLE {table} DROP CONSTRAINT {}",
            quote_part(&pkey_name(&desired.name))
        ));
    }

    for column in &desired.columns {
        let name = quote_part(&column.name);
        match current.column(&column.name) {
            None => out.push(format!("ALTER TABLE {table} ADD COLUMN {}", column_def(column))),
            Some(live) => {
                if !column.same_type(live) {
                    out.push(format!(
                        "ALTER TABLE {table} ALTER COLUMN {name} TYPE {ty} USING {name}::{ty}",
                        ty = column.data_type
                    ));
                }
                if column.nullable != live.nullable {
                    let action = if column.nullable { "DROP" } else { "SET" };
                    out.push(format!("ALTER TABLE {table} ALTER COLUMN {name} {action} NOT NULL"));
                }
            }
        }
    }

    if options.drop_columns {
        for live in &current.columns {
            if desired.column(&live.name).is_none() {
                out.push(format!(
                    "ALTER TABLE {table} DROP COLUMN {}",
                    quote_part(&live.name)
                ));
            }
        }
    }

    if pk_changed && !desired.primary_key.is_empty() {
        out.push(format!(
            "ALTER TABLE {table} ADD PRIMARY KEY ({})",
            ident_list(&desired.primary_key)
        ));
    }

    out
}

/// Render `CREATE TABLE` for a schema description.
pub fn create_table_sql(table: &TableSchema) -> String {
    let mut parts: Vec<String> = table.columns.iter().map(column_def).collect();
    if !table.primary_key.is_empty() {
        parts.push(format!("PRIMARY KEY ({})", ident_list(&table.primary_key)));
    }
    format!("CREATE TABLE {} ({})", quote_ident(&table.name), parts.join(", "))
}

fn column_def(column: &ColumnSchema) -> String {
    let mut def = format!("{} {}", quote_part(&column.name), column.data_type);
    if !column.nullable {
        def.push_str(" NOT NULL");
    }
    def
}

fn ident_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| quote_part(n))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> TableSchema {
        TableSchema::new("users")
            .with_column(ColumnSchema::new("id", "bigint").nullable(false))
            .with_column(ColumnSchema::new("email", "character varying(255)"))
            .with_primary_key(["id"])
    }

    #[test]
    fn missing_table_is_created() {
        let stmts = diff_table(&users(), None);
        assert_eq!(
            stmts,
            vec![
                "CREATE TABLE users (id bigint NOT NULL, email character varying(255), PRIMARY KEY (id))"
                    .to_string()
            ]
        );
    }

    #[test]
    fn identical_table_has_empty_diff() {
        let live = TableSchema::new("users")
            .with_column(ColumnSchema::new("id", "int8").nullable(false))
            .with_column(ColumnSchema::new("email", "varchar(255)"))
            .with_primary_key(["id"]);
        assert!(diff_table(&users(), Some(&live)).is_empty());
    }

    #[test]
    fn added_and_changed_columns() {
        let desired = users().with_column(ColumnSchema::new("created_at", "timestamp with time zone"));
        let live = TableSchema::new("users")
            .with_column(ColumnSchema::new("id", "integer").nullable(false))
            .with_column(ColumnSchema::new("email", "character varying(255)").nullable(false))
            .with_primary_key(["id"]);

        let stmts = diff_table(&desired, Some(&live));
        assert_eq!(
            stmts,
            vec![
                "ALTER TABLE users ALTER COLUMN id TYPE bigint USING id::bigint".to_string(),
                "ALTER TABLE users ALTER COLUMN email DROP NOT NULL".to_string(),
                "ALTER TABLE users ADD COLUMN created_at timestamp with time zone".to_string(),
            ]
        );
    }

    #[test]
    fn short_type_spellings_do_not_trigger_changes() {
        let desired = TableSchema::new("events")
            .with_column(ColumnSchema::new("at", "timestamptz(3)"))
            .with_column(ColumnSchema::new("tags", "varchar(20)[]"));
        let live = TableSchema::new("events")
            .with_column(ColumnSchema::new("at", "timestamp(3) with time zone"))
            .with_column(ColumnSchema::new("tags", "character varying(20)[]"));
        assert!(diff_table(&desired, Some(&live)).is_empty());
    }

    #[test]
    fn extra_columns_are_kept_by_default() {
        let live = users().with_column(ColumnSchema::new("legacy", "text"));
        assert!(diff_table(&users(), Some(&live)).is_empty());

        let stmts = diff_table_with(
            &users(),
            Some(&live),
            DiffOptions { drop_columns: true },
        );
        assert_eq!(stmts, vec!["ALTER TABLE users DROP COLUMN legacy".to_string()]);
    }

    #[test]
    fn primary_key_change_recreates_constraint() {
        let desired = TableSchema::new("memberships")
            .with_column(ColumnSchema::new("user_id", "bigint").nullable(false))
            .with_column(ColumnSchema::new("group_id", "bigint").nullable(false))
            .with_primary_key(["user_id", "group_id"]);
        let live = TableSchema::new("memberships")
            .with_column(ColumnSchema::new("user_id", "bigint").nullable(false))
            .with_column(ColumnSchema::new("group_id", "bigint").nullable(false))
            .with_primary_key(["user_id"]);

        let stmts = diff_table(&desired, Some(&live));
        assert_eq!(
            stmts,
            vec![
                "ALTER TABLE memberships DROP CONSTRAINT memberships_pkey".to_string(),
                "ALTER TABLE memberships ADD PRIMARY KEY (user_id, group_id)".to_string(),
            ]
        );
    }

    #[test]
    fn mixed_case_names_are_quoted() {
        let desired = TableSchema::new("Events")
            .with_column(ColumnSchema::new("id", "bigint").nullable(false))
            .with_column(ColumnSchema::new("createdAt", "bigint"))
            .with_primary_key(["id"]);
        assert_eq!(
            diff_table(&desired, None),
            vec![
                r#"CREATE TABLE "Events" (id bigint NOT NULL, "createdAt" bigint, PRIMARY KEY (id))"#
                    .to_string()
            ]
        );
    }

    #[test]
    fn qualified_table_keeps_its_schema() {
        let desired = TableSchema::new("audit.events")
            .with_column(ColumnSchema::new("id", "bigint").nullable(false))
            .with_column(ColumnSchema::new("kind", "text").nullable(false))
            .with_primary_key(["id", "kind"]);
        assert_eq!(
            create_table_sql(&desired),
            "CREATE TABLE audit.events (id bigint NOT NULL, kind text NOT NULL, PRIMARY KEY (id, kind))"
        );

        let live = TableSchema::new("audit.events")
            .with_column(ColumnSchema::new("id", "bigint").nullable(false))
            .with_column(ColumnSchema::new("kind", "text").nullable(false))
            .with_primary_key(["id"]);
        assert_eq!(
            diff_table(&desired, Some(&live)),
            vec![
                "ALTER TABLE audit.events DROP CONSTRAINT events_pkey".to_string(),
                "ALTER TABLE audit.events ADD PRIMARY KEY (id, kind)".to_string(),
            ]
        );
    }
}
