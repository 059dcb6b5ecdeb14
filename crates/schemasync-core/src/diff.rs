//! Structural diffing of two schemas.
//!
//! Compares a `current` schema (usually introspected from a live database)
//! against a `desired` one (usually parsed from a schema file) and produces a
//! [`Delta`] the planner turns into DDL. Table drops are never produced;
//! column drops are computed only when explicitly enabled.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::schema::{Column, ForeignKey, Index, Schema, Table};

/// Options controlling what the differ looks at.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffOptions {
    /// Tables that contribute no diff entries at all.
    pub ignore_tables: BTreeSet<String>,
    /// Columns to ignore, as `table.column` or a bare `column` that matches
    /// in every table.
    pub ignore_columns: BTreeSet<String>,
    /// Whether to emit column drops. Off by default: drops are destructive
    /// and require an explicit opt-in.
    pub drop_columns: bool,
}

impl DiffOptions {
    /// Creates default options: nothing ignored, column drops disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table to the ignore set.
    #[must_use]
    pub fn ignore_table(mut self, table: impl Into<String>) -> Self {
        self.ignore_tables.insert(table.into());
        self
    }

    /// Adds a column (qualified `table.column` or bare `column`) to the
    /// ignore set.
    #[must_use]
    pub fn ignore_column(mut self, column: impl Into<String>) -> Self {
        self.ignore_columns.insert(column.into());
        self
    }

    /// Enables column drops.
    #[must_use]
    pub fn with_drop_columns(mut self) -> Self {
        self.drop_columns = true;
        self
    }

    /// Returns true if the table is ignored.
    #[must_use]
    pub fn is_table_ignored(&self, table: &str) -> bool {
        self.ignore_tables.contains(table)
    }

    /// Returns true if the column is ignored, either under its qualified
    /// name or its bare name.
    #[must_use]
    pub fn is_column_ignored(&self, table: &str, column: &str) -> bool {
        self.ignore_columns.contains(column)
            || self.ignore_columns.contains(&format!("{table}.{column}"))
    }
}

/// A column modification: both sides, for display and rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnChange {
    /// The column as it exists in the database.
    pub current: Column,
    /// The column as the target schema defines it.
    pub desired: Column,
}

/// Per-table changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableDelta {
    /// Columns to add, in target-schema order.
    pub columns_to_add: Vec<Column>,
    /// Columns whose definition changed.
    pub columns_to_modify: BTreeMap<String, ColumnChange>,
    /// Columns to drop; empty unless [`DiffOptions::drop_columns`] is set.
    pub columns_to_drop: Vec<String>,
    /// Indexes to add, keyed by name.
    pub indexes_to_add: BTreeMap<String, Index>,
    /// Indexes to drop, by name.
    pub indexes_to_drop: Vec<String>,
    /// Foreign keys to add, keyed by constraint name.
    pub foreign_keys_to_add: BTreeMap<String, ForeignKey>,
    /// Foreign keys to drop, by constraint name.
    pub foreign_keys_to_drop: Vec<String>,
    /// Engine change, when the target differs.
    pub engine_change: Option<String>,
    /// Collation change, when the target differs.
    pub collation_change: Option<String>,
}

impl TableDelta {
    /// Returns true if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns_to_add.is_empty()
            && self.columns_to_modify.is_empty()
            && self.columns_to_drop.is_empty()
            && self.indexes_to_add.is_empty()
            && self.indexes_to_drop.is_empty()
            && self.foreign_keys_to_add.is_empty()
            && self.foreign_keys_to_drop.is_empty()
            && self.engine_change.is_none()
            && self.collation_change.is_none()
    }
}

/// The structural difference between two schemas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    /// Tables present only in the target schema, in name order.
    pub tables_to_create: Vec<String>,
    /// Tables present in both with differences.
    pub tables_to_alter: BTreeMap<String, TableDelta>,
}

impl Delta {
    /// Returns true if the schemas compared equal.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables_to_create.is_empty() && self.tables_to_alter.is_empty()
    }
}

/// Computes deltas between schema pairs.
#[derive(Debug, Clone, Default)]
pub struct Differ {
    options: DiffOptions,
}

impl Differ {
    /// Creates a differ with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a differ with the given options.
    #[must_use]
    pub fn with_options(options: DiffOptions) -> Self {
        Self { options }
    }

    /// Compares `current` against `desired` and returns the delta that
    /// transforms the former into the latter.
    #[must_use]
    pub fn diff(&self, current: &Schema, desired: &Schema) -> Delta {
        let mut delta = Delta::default();

        for (name, desired_table) in &desired.tables {
            if self.options.is_table_ignored(name) {
                debug!(table = %name, "table ignored");
                continue;
            }
            match current.get_table(name) {
                None => delta.tables_to_create.push(name.clone()),
                Some(current_table) => {
                    let table_delta = self.diff_table(current_table, desired_table);
                    if !table_delta.is_empty() {
                        delta.tables_to_alter.insert(name.clone(), table_delta);
                    }
                }
            }
        }

        delta
    }

    /// Compares two versions of the same table.
    fn diff_table(&self, current: &Table, desired: &Table) -> TableDelta {
        let mut delta = TableDelta::default();
        let table = desired.name.as_str();

        // Columns, walked in target order so additions come out in the order
        // the schema file declares them.
        for desired_col in &desired.columns {
            if self.options.is_column_ignored(table, &desired_col.name) {
                continue;
            }
            match current.get_column(&desired_col.name) {
                None => delta.columns_to_add.push(desired_col.clone()),
                Some(current_col) => {
                    if !current_col.same_definition(desired_col) {
                        delta.columns_to_modify.insert(
                            desired_col.name.clone(),
                            ColumnChange {
                                current: current_col.clone(),
                                desired: desired_col.clone(),
                            },
                        );
                    }
                }
            }
        }
        if self.options.drop_columns {
            for current_col in &current.columns {
                if self.options.is_column_ignored(table, &current_col.name) {
                    continue;
                }
                if desired.get_column(&current_col.name).is_none() {
                    delta.columns_to_drop.push(current_col.name.clone());
                }
            }
        }

        // Indexes: a changed index is dropped and recreated under its name.
        for (name, desired_index) in &desired.indexes {
            match current.indexes.get(name) {
                None => {
                    delta.indexes_to_add.insert(name.clone(), desired_index.clone());
                }
                Some(current_index) => {
                    if !current_index.same_definition(desired_index) {
                        delta.indexes_to_drop.push(name.clone());
                        delta.indexes_to_add.insert(name.clone(), desired_index.clone());
                    }
                }
            }
        }
        for name in current.indexes.keys() {
            if !desired.indexes.contains_key(name) {
                delta.indexes_to_drop.push(name.clone());
            }
        }
        delta.indexes_to_drop.sort();

        // Foreign keys: same drop-then-add rule.
        for (name, desired_fk) in &desired.foreign_keys {
            match current.foreign_keys.get(name) {
                None => {
                    delta.foreign_keys_to_add.insert(name.clone(), desired_fk.clone());
                }
                Some(current_fk) => {
                    if !current_fk.same_definition(desired_fk) {
                        delta.foreign_keys_to_drop.push(name.clone());
                        delta.foreign_keys_to_add.insert(name.clone(), desired_fk.clone());
                    }
                }
            }
        }
        for name in current.foreign_keys.keys() {
            if !desired.foreign_keys.contains_key(name) {
                delta.foreign_keys_to_drop.push(name.clone());
            }
        }
        delta.foreign_keys_to_drop.sort();

        // Table options: engine and collation only. A collation difference
        // only counts when the target states one; auto_increment and comment
        // never participate.
        if current.options.engine != desired.options.engine {
            delta.engine_change = Some(desired.options.engine.clone());
        }
        if let Some(desired_collation) = &desired.options.collation {
            if current.options.collation.as_ref() != Some(desired_collation) {
                delta.collation_change = Some(desired_collation.clone());
            }
        }

        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ReferentialAction;

    fn users_table() -> Table {
        Table::new("users")
            .column(Column::new("id", "int(11)").not_null().auto_increment())
            .column(Column::new("name", "varchar(64)").not_null())
            .index(Index::primary(vec!["id".to_string()]))
    }

    #[test]
    fn test_empty_diff_identity() {
        let schema = Schema::new().table(users_table());
        let delta = Differ::new().diff(&schema, &schema);
        assert!(delta.is_empty());
    }

    #[test]
    fn test_create_table() {
        let current = Schema::new();
        let desired = Schema::new().table(users_table());

        let delta = Differ::new().diff(&current, &desired);
        assert_eq!(delta.tables_to_create, vec!["users"]);
        assert!(delta.tables_to_alter.is_empty());
    }

    #[test]
    fn test_add_column() {
        let current = Schema::new().table(users_table());
        let desired = Schema::new().table(
            users_table().column(
                Column::new("email", "varchar(255)")
                    .not_null()
                    .default_value(""),
            ),
        );

        let delta = Differ::new().diff(&current, &desired);
        let table_delta = &delta.tables_to_alter["users"];
        assert_eq!(table_delta.columns_to_add.len(), 1);
        assert_eq!(table_delta.columns_to_add[0].name, "email");
    }

    #[test]
    fn test_modify_column_on_type_change() {
        let current = Schema::new().table(users_table());
        let mut changed = users_table();
        changed.columns[1] = Column::new("name", "varchar(128)").not_null();
        let desired = Schema::new().table(changed);

        let delta = Differ::new().diff(&current, &desired);
        let table_delta = &delta.tables_to_alter["users"];
        assert!(table_delta.columns_to_modify.contains_key("name"));
        assert_eq!(
            table_delta.columns_to_modify["name"].desired.sql_type,
            "varchar(128)"
        );
    }

    #[test]
    fn test_equivalent_defaults_do_not_diff() {
        let current = Schema::new()
            .table(users_table().column(Column::new("state", "varchar(8)").default_value("'new'")));
        let desired = Schema::new()
            .table(users_table().column(Column::new("state", "varchar(8)").default_value("new")));

        assert!(Differ::new().diff(&current, &desired).is_empty());
    }

    #[test]
    fn test_column_drop_suppressed_by_default() {
        let current = Schema::new().table(
            users_table().column(Column::new("legacy", "text")),
        );
        let desired = Schema::new().table(users_table());

        let delta = Differ::new().diff(&current, &desired);
        assert!(delta.is_empty());

        let delta = Differ::with_options(DiffOptions::new().with_drop_columns())
            .diff(&current, &desired);
        assert_eq!(delta.tables_to_alter["users"].columns_to_drop, vec!["legacy"]);
    }

    #[test]
    fn test_index_change_is_drop_then_add() {
        let current = Schema::new().table(
            users_table().index(Index::new("email").columns(vec!["email".to_string()])),
        );
        let desired = Schema::new().table(
            users_table().index(Index::new("email").columns(vec!["email".to_string()]).unique()),
        );

        let delta = Differ::new().diff(&current, &desired);
        let table_delta = &delta.tables_to_alter["users"];
        assert_eq!(table_delta.indexes_to_drop, vec!["email"]);
        assert!(table_delta.indexes_to_add.contains_key("email"));
        assert!(table_delta.indexes_to_add["email"].unique);
    }

    #[test]
    fn test_foreign_key_action_change_is_drop_then_add() {
        let fk = |action| {
            ForeignKey::new("fk_a")
                .columns(vec!["user_id".to_string()])
                .references("users", vec!["id".to_string()])
                .on_delete(action)
        };
        let base = || {
            Table::new("posts")
                .column(Column::new("id", "int"))
                .column(Column::new("user_id", "int"))
        };
        let current = Schema::new().table(base().foreign_key(fk(ReferentialAction::Restrict)));
        let desired = Schema::new().table(base().foreign_key(fk(ReferentialAction::Cascade)));

        let delta = Differ::new().diff(&current, &desired);
        let table_delta = &delta.tables_to_alter["posts"];
        assert_eq!(table_delta.foreign_keys_to_drop, vec!["fk_a"]);
        assert_eq!(
            table_delta.foreign_keys_to_add["fk_a"].on_delete,
            ReferentialAction::Cascade
        );
    }

    #[test]
    fn test_removed_index_and_fk_are_dropped() {
        let current = Schema::new().table(
            users_table()
                .column(Column::new("org_id", "int"))
                .index(Index::new("idx_org").columns(vec!["org_id".to_string()]))
                .foreign_key(
                    ForeignKey::new("fk_org")
                        .columns(vec!["org_id".to_string()])
                        .references("orgs", vec!["id".to_string()]),
                ),
        );
        let desired = Schema::new().table(users_table().column(Column::new("org_id", "int")));

        let delta = Differ::new().diff(&current, &desired);
        let table_delta = &delta.tables_to_alter["users"];
        assert_eq!(table_delta.indexes_to_drop, vec!["idx_org"]);
        assert_eq!(table_delta.foreign_keys_to_drop, vec!["fk_org"]);
    }

    #[test]
    fn test_ignore_tables() {
        let current = Schema::new();
        let desired = Schema::new().table(users_table());

        let delta = Differ::with_options(DiffOptions::new().ignore_table("users"))
            .diff(&current, &desired);
        assert!(delta.is_empty());
    }

    #[test]
    fn test_ignore_columns_qualified_and_bare() {
        let current = Schema::new().table(users_table());
        let desired = Schema::new().table(
            users_table()
                .column(Column::new("email", "varchar(255)"))
                .column(Column::new("age", "int")),
        );

        let delta = Differ::with_options(
            DiffOptions::new()
                .ignore_column("users.email")
                .ignore_column("age"),
        )
        .diff(&current, &desired);
        assert!(delta.is_empty());
    }

    #[test]
    fn test_engine_and_collation_changes() {
        let mut current_table = users_table();
        current_table.options.engine = "MyISAM".to_string();
        let mut desired_table = users_table();
        desired_table.options.collation = Some("utf8mb4_bin".to_string());

        let delta = Differ::new().diff(
            &Schema::new().table(current_table),
            &Schema::new().table(desired_table),
        );
        let table_delta = &delta.tables_to_alter["users"];
        assert_eq!(table_delta.engine_change.as_deref(), Some("InnoDB"));
        assert_eq!(table_delta.collation_change.as_deref(), Some("utf8mb4_bin"));
    }

    #[test]
    fn test_auto_increment_and_comment_ignored() {
        let mut current_table = users_table();
        current_table.options.auto_increment = Some(42);
        current_table.options.comment = Some("old".to_string());
        let mut desired_table = users_table();
        desired_table.options.auto_increment = Some(7);
        desired_table.options.comment = Some("new".to_string());

        let delta = Differ::new().diff(
            &Schema::new().table(current_table),
            &Schema::new().table(desired_table),
        );
        assert!(delta.is_empty());
    }
}
