//! Plan assembly: turning a [`Delta`] into an ordered list of DDL statements.
//!
//! Statement order is the contract here. `CREATE TABLE`s come first, tables
//! in name order; within one table's alters, drops precede adds so that an
//! index or constraint being redefined under the same name never collides
//! with itself:
//!
//! 1. drop foreign keys
//! 2. drop indexes
//! 3. add columns
//! 4. modify columns
//! 5. drop columns (when enabled)
//! 6. add indexes
//! 7. add foreign keys
//! 8. engine / collation changes

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ddl;
use crate::diff::{Delta, DiffOptions, Differ};
use crate::parser::preprocess;
use crate::schema::{Schema, Table};

/// An ordered sequence of DDL statements, each `;`-terminated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// The statements, in application order.
    pub statements: Vec<String>,
}

impl Plan {
    /// Returns true if the database already matches the target ("no
    /// changes").
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Number of statements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Iterates over the statements in application order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.statements.iter().map(String::as_str)
    }

    fn push(&mut self, statement: String) {
        self.statements.push(format!("{statement};"));
    }
}

/// Computes the plan that converges `current` on `desired`.
///
/// Runs the normalized-DDL fast path first: when the full renders of both
/// schemas normalize to the same bytes, the differ is skipped entirely and
/// the plan is empty.
#[must_use]
pub fn synchronize(current: &Schema, desired: &Schema, options: &DiffOptions) -> Plan {
    if normalize_script(&render_schema(current)) == normalize_script(&render_schema(desired)) {
        debug!("normalized schemas are identical, skipping diff");
        return Plan::default();
    }
    let delta = Differ::with_options(options.clone()).diff(current, desired);
    build_plan(&delta, desired, options)
}

/// Renders a delta as an ordered statement plan.
#[must_use]
pub fn build_plan(delta: &Delta, desired: &Schema, options: &DiffOptions) -> Plan {
    let mut plan = Plan::default();

    for name in &delta.tables_to_create {
        let Some(table) = desired.get_table(name) else {
            continue;
        };
        plan.push(ddl::render_create_table(&filter_ignored(table, options)));
    }

    for (name, table_delta) in &delta.tables_to_alter {
        for fk in &table_delta.foreign_keys_to_drop {
            plan.push(ddl::alter_drop_foreign_key(name, fk));
        }
        for index in &table_delta.indexes_to_drop {
            plan.push(ddl::alter_drop_index(name, index));
        }
        for column in &table_delta.columns_to_add {
            plan.push(ddl::alter_add_column(name, column));
        }
        for change in table_delta.columns_to_modify.values() {
            plan.push(ddl::alter_modify_column(name, &change.desired));
        }
        for column in &table_delta.columns_to_drop {
            plan.push(ddl::alter_drop_column(name, column));
        }
        for index in table_delta.indexes_to_add.values() {
            plan.push(ddl::alter_add_index(name, index));
        }
        for fk in table_delta.foreign_keys_to_add.values() {
            plan.push(ddl::alter_add_foreign_key(name, fk));
        }
        if let Some(engine) = &table_delta.engine_change {
            plan.push(ddl::alter_engine(name, engine));
        }
        if let Some(collation) = &table_delta.collation_change {
            plan.push(ddl::alter_collation(name, collation));
        }
    }

    plan
}

/// Renders every table of a schema as `CREATE TABLE` statements, in name
/// order.
#[must_use]
pub fn render_schema(schema: &Schema) -> String {
    let mut out = String::new();
    for table in schema.tables.values() {
        out.push_str(&ddl::render_create_table(table));
        out.push_str(";\n\n");
    }
    out
}

/// Returns a copy of the table without ignored columns, and without indexes
/// or foreign keys that touch an ignored column, so a created table never
/// references one.
fn filter_ignored(table: &Table, options: &DiffOptions) -> Table {
    let ignored =
        |column: &str| options.is_column_ignored(&table.name, column);
    if !table.columns.iter().any(|c| ignored(&c.name)) {
        return table.clone();
    }

    let mut filtered = table.clone();
    filtered.columns.retain(|c| !ignored(&c.name));
    filtered
        .indexes
        .retain(|_, index| !index.columns.iter().any(|c| ignored(c)));
    filtered
        .foreign_keys
        .retain(|_, fk| !fk.columns.iter().any(|c| ignored(c)));
    filtered
}

/// Normalizes a DDL script for byte comparison: comments and `SET`/`DROP
/// TABLE` boilerplate stripped, everything outside quotes lower-cased,
/// whitespace collapsed, and incidental spacing around punctuation removed.
#[must_use]
pub fn normalize_script(input: &str) -> String {
    let stripped = preprocess::strip_directives(&preprocess::strip_comments(input));

    let is_punct = |c: char| matches!(c, '(' | ')' | ',' | ';' | '=');

    let mut out = String::with_capacity(stripped.len());
    let mut quote: Option<char> = None;
    let mut pending_space = false;
    let mut chars = stripped.chars();

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' && q != '`' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => {
                if pending_space && !out.ends_with(|l: char| is_punct(l)) && !out.is_empty() {
                    out.push(' ');
                }
                pending_space = false;
                quote = Some(c);
                out.push(c);
            }
            c if c.is_whitespace() => pending_space = true,
            c => {
                if pending_space
                    && !is_punct(c)
                    && !out.is_empty()
                    && !out.ends_with(|l: char| is_punct(l))
                {
                    out.push(' ');
                }
                pending_space = false;
                out.extend(c.to_lowercase());
            }
        }
    }

    out
}
