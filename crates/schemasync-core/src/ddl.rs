//! Rendering of schema values as MySQL DDL.
//!
//! Identifiers are always backtick-quoted; string literals are single-quoted
//! with backslash escaping. Everything here returns statement text without a
//! trailing semicolon; the planner terminates statements.

use std::sync::LazyLock;

use regex::Regex;

use crate::schema::{Column, ForeignKey, Index, ReferentialAction, Table, TableOptions};

static NUMERIC_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9.]+$").expect("valid literal regex"));

/// Backtick-quotes an identifier.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Escapes a string for a single-quoted MySQL literal.
#[must_use]
pub fn escape_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn quote_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| quote_identifier(n))
        .collect::<Vec<_>>()
        .join(",")
}

/// Renders a column definition as it appears in `CREATE TABLE` and
/// `ADD/MODIFY COLUMN` clauses.
#[must_use]
pub fn render_column(column: &Column) -> String {
    let mut sql = format!("{} {}", quote_identifier(&column.name), column.sql_type);

    if !column.nullable {
        sql.push_str(" NOT NULL");
    }

    match &column.default {
        None => {
            // Dump-style output spells the implicit NULL default out, but
            // only where a NULL default is actually legal.
            if column.nullable {
                sql.push_str(" DEFAULT NULL");
            }
        }
        Some(value) => {
            if value == "NULL" || NUMERIC_LITERAL.is_match(value) {
                sql.push_str(" DEFAULT ");
                sql.push_str(value);
            } else {
                sql.push_str(" DEFAULT '");
                sql.push_str(&escape_string(value));
                sql.push('\'');
            }
        }
    }

    if column.extra == "auto_increment" {
        sql.push_str(" AUTO_INCREMENT");
    }
    if let Some(charset) = &column.charset {
        sql.push_str(" CHARACTER SET ");
        sql.push_str(charset);
    }
    if let Some(collation) = &column.collation {
        sql.push_str(" COLLATE ");
        sql.push_str(collation);
    }
    if let Some(comment) = &column.comment {
        sql.push_str(" COMMENT '");
        sql.push_str(&escape_string(comment));
        sql.push('\'');
    }

    sql
}

/// Renders an index definition: `PRIMARY KEY (...)`, `UNIQUE KEY name (...)`
/// or `KEY name (...)`. Shared by `CREATE TABLE` bodies and `ADD` clauses.
#[must_use]
pub fn render_index(index: &Index) -> String {
    let columns = quote_list(&index.columns);
    let mut sql = if index.is_primary() {
        format!("PRIMARY KEY ({columns})")
    } else if index.index_type == "FULLTEXT" {
        format!("FULLTEXT KEY {} ({columns})", quote_identifier(&index.name))
    } else if index.unique {
        format!("UNIQUE KEY {} ({columns})", quote_identifier(&index.name))
    } else {
        format!("KEY {} ({columns})", quote_identifier(&index.name))
    };

    if index.index_type != "BTREE" && index.index_type != "FULLTEXT" {
        sql.push_str(" USING ");
        sql.push_str(&index.index_type);
    }
    if let Some(comment) = &index.comment {
        sql.push_str(" COMMENT '");
        sql.push_str(&escape_string(comment));
        sql.push('\'');
    }
    sql
}

/// Renders a foreign key constraint definition. RESTRICT actions are
/// left implicit, matching server dump output.
#[must_use]
pub fn render_foreign_key(fk: &ForeignKey) -> String {
    let mut sql = format!(
        "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
        quote_identifier(&fk.name),
        quote_list(&fk.columns),
        quote_identifier(&fk.referenced_table),
        quote_list(&fk.referenced_columns),
    );
    if fk.on_delete != ReferentialAction::Restrict {
        sql.push_str(" ON DELETE ");
        sql.push_str(fk.on_delete.as_sql());
    }
    if fk.on_update != ReferentialAction::Restrict {
        sql.push_str(" ON UPDATE ");
        sql.push_str(fk.on_update.as_sql());
    }
    sql
}

/// Renders the table options clause.
#[must_use]
pub fn render_table_options(options: &TableOptions) -> String {
    let mut sql = format!("ENGINE={}", options.engine);
    if let Some(auto_increment) = options.auto_increment {
        sql.push_str(&format!(" AUTO_INCREMENT={auto_increment}"));
    }
    if let Some(collation) = &options.collation {
        sql.push_str(" COLLATE=");
        sql.push_str(collation);
    }
    if let Some(comment) = &options.comment {
        sql.push_str(" COMMENT='");
        sql.push_str(&escape_string(comment));
        sql.push('\'');
    }
    sql
}

/// Renders a complete `CREATE TABLE` statement for a table: columns in
/// definition order, then the primary key, remaining indexes, and foreign
/// keys.
#[must_use]
pub fn render_create_table(table: &Table) -> String {
    let mut parts: Vec<String> = table.columns.iter().map(render_column).collect();

    if let Some(primary) = table.primary_key() {
        parts.push(render_index(primary));
    }
    for index in table.indexes.values().filter(|i| !i.is_primary()) {
        parts.push(render_index(index));
    }
    for fk in table.foreign_keys.values() {
        parts.push(render_foreign_key(fk));
    }

    format!(
        "CREATE TABLE {} (\n  {}\n) {}",
        quote_identifier(&table.name),
        parts.join(",\n  "),
        render_table_options(&table.options),
    )
}

fn alter_table(table: &str, clause: &str) -> String {
    format!("ALTER TABLE {} {clause}", quote_identifier(table))
}

/// `ALTER TABLE t DROP FOREIGN KEY name`.
#[must_use]
pub fn alter_drop_foreign_key(table: &str, name: &str) -> String {
    alter_table(table, &format!("DROP FOREIGN KEY {}", quote_identifier(name)))
}

/// `ALTER TABLE t DROP INDEX name`, or `DROP PRIMARY KEY` for the primary
/// key.
#[must_use]
pub fn alter_drop_index(table: &str, name: &str) -> String {
    if name == crate::schema::PRIMARY_KEY_NAME {
        alter_table(table, "DROP PRIMARY KEY")
    } else {
        alter_table(table, &format!("DROP INDEX {}", quote_identifier(name)))
    }
}

/// `ALTER TABLE t ADD COLUMN ...`.
#[must_use]
pub fn alter_add_column(table: &str, column: &Column) -> String {
    alter_table(table, &format!("ADD COLUMN {}", render_column(column)))
}

/// `ALTER TABLE t MODIFY COLUMN ...`.
#[must_use]
pub fn alter_modify_column(table: &str, column: &Column) -> String {
    alter_table(table, &format!("MODIFY COLUMN {}", render_column(column)))
}

/// `ALTER TABLE t DROP COLUMN name`.
#[must_use]
pub fn alter_drop_column(table: &str, name: &str) -> String {
    alter_table(table, &format!("DROP COLUMN {}", quote_identifier(name)))
}

/// `ALTER TABLE t ADD PRIMARY KEY/UNIQUE KEY/KEY ...`.
#[must_use]
pub fn alter_add_index(table: &str, index: &Index) -> String {
    alter_table(table, &format!("ADD {}", render_index(index)))
}

/// `ALTER TABLE t ADD CONSTRAINT ... FOREIGN KEY ...`.
#[must_use]
pub fn alter_add_foreign_key(table: &str, fk: &ForeignKey) -> String {
    alter_table(table, &format!("ADD {}", render_foreign_key(fk)))
}

/// `ALTER TABLE t ENGINE=...`.
#[must_use]
pub fn alter_engine(table: &str, engine: &str) -> String {
    alter_table(table, &format!("ENGINE={engine}"))
}

/// `ALTER TABLE t COLLATE=...`.
#[must_use]
pub fn alter_collation(table: &str, collation: &str) -> String {
    alter_table(table, &format!("COLLATE={collation}"))
}
