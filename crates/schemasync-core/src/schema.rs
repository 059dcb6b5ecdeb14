//! Schema representation types.
//!
//! These types describe the structure of database tables and are produced by
//! both the DDL parser (from a target schema file) and the introspector (from
//! a live database). The differ consumes two of them and never mutates either.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Reserved index name under which the primary key is stored.
pub const PRIMARY_KEY_NAME: &str = "PRIMARY";

/// Referential action for `ON DELETE` / `ON UPDATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ReferentialAction {
    /// Restrict (MySQL's default when the clause is absent).
    #[default]
    Restrict,
    /// Cascade the delete/update to referencing rows.
    Cascade,
    /// Set the referencing column to NULL.
    SetNull,
    /// No action.
    NoAction,
}

impl ReferentialAction {
    /// Returns the SQL representation of this action.
    #[must_use]
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::NoAction => "NO ACTION",
        }
    }

    /// Parses an action keyword as found in DDL or in
    /// `REFERENTIAL_CONSTRAINTS.UPDATE_RULE`/`DELETE_RULE`.
    #[must_use]
    pub fn from_sql(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "RESTRICT" => Some(Self::Restrict),
            "CASCADE" => Some(Self::Cascade),
            "SET NULL" => Some(Self::SetNull),
            "NO ACTION" => Some(Self::NoAction),
            _ => None,
        }
    }
}

/// A single column definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name (case-sensitive).
    pub name: String,
    /// Normalized type, e.g. `varchar(128)` or `decimal(20,8)`.
    pub sql_type: String,
    /// Whether the column allows NULL values.
    pub nullable: bool,
    /// Default value; `None` means no default (and covers `DEFAULT NULL`).
    pub default: Option<String>,
    /// Lower-cased extra attribute; `auto_increment` or empty.
    pub extra: String,
    /// Column comment.
    pub comment: Option<String>,
    /// Column character set.
    pub charset: Option<String>,
    /// Column collation.
    pub collation: Option<String>,
}

impl Column {
    /// Creates a new nullable column of the given type.
    ///
    /// The type is normalized on construction, so `Column::new("id", "INT")`
    /// yields the same value as the parser does for `id int(11)`.
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type: &str) -> Self {
        Self {
            name: name.into(),
            sql_type: normalize_type(sql_type),
            nullable: true,
            default: None,
            extra: String::new(),
            comment: None,
            charset: None,
            collation: None,
        }
    }

    /// Marks the column NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Marks the column auto-increment.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.extra = "auto_increment".to_string();
        self
    }

    /// Sets the column comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Sets the column character set.
    #[must_use]
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    /// Sets the column collation.
    #[must_use]
    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    /// Equality used by the differ: normalized type, nullability, normalized
    /// default, and extra. Comments, charset, and collation do not
    /// participate.
    #[must_use]
    pub fn same_definition(&self, other: &Self) -> bool {
        self.sql_type == other.sql_type
            && self.nullable == other.nullable
            && normalize_default(self.default.as_deref()) == normalize_default(other.default.as_deref())
            && self.extra == other.extra
    }
}

/// An index (or the primary key, stored under [`PRIMARY_KEY_NAME`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Index name.
    pub name: String,
    /// Columns covered, in order.
    pub columns: Vec<String>,
    /// Whether this is a unique index. Always true for the primary key.
    pub unique: bool,
    /// Index type as reported by the server; `BTREE` by default.
    pub index_type: String,
    /// Index comment.
    pub comment: Option<String>,
}

impl Index {
    /// Creates a new non-unique BTREE index.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            unique: false,
            index_type: "BTREE".to_string(),
            comment: None,
        }
    }

    /// Creates a primary key over the given columns.
    #[must_use]
    pub fn primary(columns: Vec<String>) -> Self {
        Self {
            name: PRIMARY_KEY_NAME.to_string(),
            columns,
            unique: true,
            index_type: "BTREE".to_string(),
            comment: None,
        }
    }

    /// Sets the covered columns.
    #[must_use]
    pub fn columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    /// Makes this a unique index.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Returns true if this is the primary key.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.name == PRIMARY_KEY_NAME
    }

    /// Equality used by the differ: column sequence and uniqueness.
    #[must_use]
    pub fn same_definition(&self, other: &Self) -> bool {
        self.columns == other.columns && self.unique == other.unique
    }
}

/// A foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Constraint name.
    pub name: String,
    /// Referencing columns, in order.
    pub columns: Vec<String>,
    /// Referenced table name.
    pub referenced_table: String,
    /// Referenced columns; same length as `columns`.
    pub referenced_columns: Vec<String>,
    /// Action on update.
    pub on_update: ReferentialAction,
    /// Action on delete.
    pub on_delete: ReferentialAction,
}

impl ForeignKey {
    /// Creates a new foreign key with RESTRICT actions.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            referenced_table: String::new(),
            referenced_columns: Vec::new(),
            on_update: ReferentialAction::Restrict,
            on_delete: ReferentialAction::Restrict,
        }
    }

    /// Sets the referencing columns.
    #[must_use]
    pub fn columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    /// Sets the referenced table and columns.
    #[must_use]
    pub fn references(mut self, table: impl Into<String>, columns: Vec<String>) -> Self {
        self.referenced_table = table.into();
        self.referenced_columns = columns;
        self
    }

    /// Sets the ON UPDATE action.
    #[must_use]
    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = action;
        self
    }

    /// Sets the ON DELETE action.
    #[must_use]
    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = action;
        self
    }

    /// Equality used by the differ: everything except the name.
    #[must_use]
    pub fn same_definition(&self, other: &Self) -> bool {
        self.columns == other.columns
            && self.referenced_table == other.referenced_table
            && self.referenced_columns == other.referenced_columns
            && self.on_update == other.on_update
            && self.on_delete == other.on_delete
    }
}

/// Table-level options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOptions {
    /// Storage engine.
    pub engine: String,
    /// Table collation.
    pub collation: Option<String>,
    /// Table comment.
    pub comment: Option<String>,
    /// AUTO_INCREMENT counter; never participates in diffs.
    pub auto_increment: Option<u64>,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            engine: "InnoDB".to_string(),
            collation: None,
            comment: None,
            auto_increment: None,
        }
    }
}

/// A complete table definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Table name (case-sensitive).
    pub name: String,
    /// Columns in definition order.
    pub columns: Vec<Column>,
    /// Indexes keyed by name; the primary key under [`PRIMARY_KEY_NAME`].
    pub indexes: BTreeMap<String, Index>,
    /// Foreign keys keyed by constraint name.
    pub foreign_keys: BTreeMap<String, ForeignKey>,
    /// Table options.
    pub options: TableOptions,
}

impl Table {
    /// Creates a new empty table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            indexes: BTreeMap::new(),
            foreign_keys: BTreeMap::new(),
            options: TableOptions::default(),
        }
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Adds an index, keyed by its name.
    #[must_use]
    pub fn index(mut self, index: Index) -> Self {
        self.indexes.insert(index.name.clone(), index);
        self
    }

    /// Adds a foreign key, keyed by its constraint name.
    #[must_use]
    pub fn foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.insert(fk.name.clone(), fk);
        self
    }

    /// Sets the table options.
    #[must_use]
    pub fn options(mut self, options: TableOptions) -> Self {
        self.options = options;
        self
    }

    /// Gets a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns the primary key, if any.
    #[must_use]
    pub fn primary_key(&self) -> Option<&Index> {
        self.indexes.get(PRIMARY_KEY_NAME)
    }

    /// Checks the structural invariants of this table.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::BTreeSet::new();
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(Error::Invariant(format!(
                    "duplicate column `{}` in table `{}`",
                    column.name, self.name
                )));
            }
        }

        if let Some(primary) = self.primary_key() {
            if !primary.unique {
                return Err(Error::Invariant(format!(
                    "primary key of table `{}` is not unique",
                    self.name
                )));
            }
        }

        for fk in self.foreign_keys.values() {
            if fk.columns.len() != fk.referenced_columns.len() {
                return Err(Error::Invariant(format!(
                    "foreign key `{}` on table `{}` has {} columns but references {}",
                    fk.name,
                    self.name,
                    fk.columns.len(),
                    fk.referenced_columns.len()
                )));
            }
            for column in &fk.columns {
                if self.get_column(column).is_none() {
                    return Err(Error::Invariant(format!(
                        "foreign key `{}` on table `{}` names unknown column `{}`",
                        fk.name, self.name, column
                    )));
                }
            }
        }

        Ok(())
    }
}

/// The complete schema: all tables, keyed by name.
///
/// `BTreeMap` keeps iteration order deterministic, which the planner relies
/// on for stable statement ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Tables keyed by name.
    pub tables: BTreeMap<String, Table>,
}

impl Schema {
    /// Creates a new empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table, keyed by its name.
    #[must_use]
    pub fn table(mut self, table: Table) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    /// Inserts a table in place.
    pub fn insert(&mut self, table: Table) {
        self.tables.insert(table.name.clone(), table);
    }

    /// Gets a table by name.
    #[must_use]
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Returns table names in deterministic order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Returns true if the schema has no tables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Checks the structural invariants of every table.
    pub fn validate(&self) -> Result<()> {
        for table in self.tables.values() {
            table.validate()?;
        }
        Ok(())
    }
}

/// Normalizes a column type for comparison and rendering.
///
/// Lower-cases the base type and any suffix words (`unsigned`, `zerofill`),
/// collapses whitespace, and removes spacing inside the parameter list while
/// leaving quoted enum/set values untouched. Common aliases are folded to the
/// form the server itself reports (`integer` to `int`, `boolean` to
/// `tinyint(1)`), and bare integer and decimal types gain the display width
/// the server would assign, so a parsed `INT` compares equal to an
/// introspected `int(11)`. Explicit widths are preserved as given.
#[must_use]
pub fn normalize_type(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.trim().chars();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut pending_space = false;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => {
                quote = Some(c);
                pending_space = false;
                out.push(c);
            }
            '(' => {
                depth += 1;
                pending_space = false;
                out.push('(');
            }
            ')' => {
                depth = depth.saturating_sub(1);
                pending_space = false;
                out.push(')');
            }
            ',' if depth > 0 => {
                pending_space = false;
                out.push(',');
            }
            c if c.is_whitespace() => {
                if depth == 0 {
                    pending_space = true;
                }
            }
            c => {
                if pending_space && !out.is_empty() {
                    out.push(' ');
                }
                pending_space = false;
                if depth == 0 {
                    out.extend(c.to_lowercase());
                } else {
                    out.push(c);
                }
            }
        }
    }

    apply_type_aliases(&out)
}

/// Folds type aliases and implicit display widths into canonical form.
fn apply_type_aliases(normalized: &str) -> String {
    let (base, rest) = match normalized.find(|c: char| c == '(' || c == ' ') {
        Some(at) => normalized.split_at(at),
        None => (normalized, ""),
    };

    let base = match base {
        "integer" => "int",
        "dec" | "numeric" => "decimal",
        "bool" | "boolean" => return format!("tinyint(1){rest}"),
        other => other,
    };

    if rest.starts_with('(') {
        return format!("{base}{rest}");
    }

    // Bare types without a parameter list take the server's default width.
    let unsigned = rest.split_whitespace().any(|word| word == "unsigned");
    let widened = match (base, unsigned) {
        ("tinyint", false) => "tinyint(4)".to_string(),
        ("tinyint", true) => "tinyint(3)".to_string(),
        ("smallint", false) => "smallint(6)".to_string(),
        ("smallint", true) => "smallint(5)".to_string(),
        ("mediumint", false) => "mediumint(9)".to_string(),
        ("mediumint", true) => "mediumint(8)".to_string(),
        ("int", false) => "int(11)".to_string(),
        ("int", true) => "int(10)".to_string(),
        ("bigint", _) => "bigint(20)".to_string(),
        ("decimal", _) => "decimal(10,0)".to_string(),
        ("char", _) => "char(1)".to_string(),
        _ => base.to_string(),
    };

    format!("{widened}{rest}")
}

/// Normalizes a default value for comparison.
///
/// `None`, the literal `NULL` keyword, and an absent clause all collapse to
/// `None`. A value wrapped in matching single or double quotes has the quotes
/// stripped and backslash escapes for the chosen quote resolved. The empty
/// string stays the empty string, distinct from `None`. Everything else is
/// preserved verbatim.
#[must_use]
pub fn normalize_default(raw: Option<&str>) -> Option<String> {
    let value = raw?.trim();
    if value.eq_ignore_ascii_case("NULL") {
        return None;
    }
    for quote in ['\'', '"'] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return Some(unescape(&value[1..value.len() - 1], quote));
        }
    }
    Some(value.to_string())
}

/// Resolves backslash escapes for the given quote character.
fn unescape(value: &str, quote: char) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) if next == quote || next == '\\' => out.push(next),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_builder() {
        let col = Column::new("id", "BIGINT").not_null().auto_increment();

        assert_eq!(col.name, "id");
        assert_eq!(col.sql_type, "bigint(20)");
        assert!(!col.nullable);
        assert_eq!(col.extra, "auto_increment");
    }

    #[test]
    fn test_normalize_type_case_and_spacing() {
        assert_eq!(normalize_type("  VARCHAR(128) "), "varchar(128)");
        assert_eq!(normalize_type("DECIMAL(20, 8)"), "decimal(20,8)");
        assert_eq!(normalize_type("decimal( 20 , 8 )"), "decimal(20,8)");
        assert_eq!(normalize_type("INT(11)   UNSIGNED"), "int(11) unsigned");
        assert_eq!(normalize_type("varchar (64)"), "varchar(64)");
    }

    #[test]
    fn test_normalize_type_default_widths() {
        assert_eq!(normalize_type("INT"), "int(11)");
        assert_eq!(normalize_type("int unsigned"), "int(10) unsigned");
        assert_eq!(normalize_type("INTEGER"), "int(11)");
        assert_eq!(normalize_type("BIGINT"), "bigint(20)");
        assert_eq!(normalize_type("tinyint"), "tinyint(4)");
        assert_eq!(normalize_type("BOOLEAN"), "tinyint(1)");
        assert_eq!(normalize_type("decimal"), "decimal(10,0)");
        // Explicit widths are preserved, not rewritten.
        assert_eq!(normalize_type("int(4)"), "int(4)");
    }

    #[test]
    fn test_normalize_type_enum_values_untouched() {
        assert_eq!(
            normalize_type("ENUM('New', 'Open', 'Closed')"),
            "enum('New','Open','Closed')"
        );
        assert_eq!(normalize_type("SET('a b', 'c')"), "set('a b','c')");
    }

    #[test]
    fn test_normalize_type_idempotent() {
        for raw in ["INT", "Decimal(20, 8)", "varchar(255)", "enum('A','b c')"] {
            let once = normalize_type(raw);
            assert_eq!(normalize_type(&once), once);
        }
    }

    #[test]
    fn test_normalize_default() {
        assert_eq!(normalize_default(None), None);
        assert_eq!(normalize_default(Some("NULL")), None);
        assert_eq!(normalize_default(Some("null")), None);
        assert_eq!(normalize_default(Some("0")), Some("0".to_string()));
        assert_eq!(normalize_default(Some("'abc'")), Some("abc".to_string()));
        assert_eq!(normalize_default(Some("\"abc\"")), Some("abc".to_string()));
        assert_eq!(normalize_default(Some("''")), Some(String::new()));
        assert_eq!(
            normalize_default(Some("'it\\'s'")),
            Some("it's".to_string())
        );
        assert_eq!(
            normalize_default(Some("'a\\\\b'")),
            Some("a\\b".to_string())
        );
    }

    #[test]
    fn test_normalize_default_idempotent() {
        for raw in ["0", "abc", "", "3.14", "CURRENT_TIMESTAMP"] {
            let once = normalize_default(Some(raw));
            let twice = normalize_default(once.as_deref());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_column_same_definition_ignores_comment() {
        let a = Column::new("name", "varchar(64)").comment("a person");
        let b = Column::new("name", "varchar(64)");
        assert!(a.same_definition(&b));
    }

    #[test]
    fn test_column_same_definition_normalizes_default() {
        let a = Column::new("state", "varchar(16)").default_value("'new'");
        let b = Column::new("state", "varchar(16)").default_value("new");
        assert!(a.same_definition(&b));

        let c = Column::new("state", "varchar(16)").default_value("NULL");
        let d = Column::new("state", "varchar(16)");
        assert!(c.same_definition(&d));
    }

    #[test]
    fn test_referential_action_round_trip() {
        for action in [
            ReferentialAction::Restrict,
            ReferentialAction::Cascade,
            ReferentialAction::SetNull,
            ReferentialAction::NoAction,
        ] {
            assert_eq!(ReferentialAction::from_sql(action.as_sql()), Some(action));
        }
        assert_eq!(ReferentialAction::from_sql("set null"), Some(ReferentialAction::SetNull));
        assert_eq!(ReferentialAction::from_sql("bogus"), None);
    }

    #[test]
    fn test_table_validate_duplicate_column() {
        let table = Table::new("users")
            .column(Column::new("id", "int"))
            .column(Column::new("id", "bigint"));
        assert!(matches!(table.validate(), Err(Error::Invariant(_))));
    }

    #[test]
    fn test_table_validate_foreign_key_columns() {
        let table = Table::new("posts")
            .column(Column::new("id", "int"))
            .foreign_key(
                ForeignKey::new("fk_author")
                    .columns(vec!["author_id".to_string()])
                    .references("users", vec!["id".to_string()]),
            );
        assert!(matches!(table.validate(), Err(Error::Invariant(_))));
    }

    #[test]
    fn test_table_validate_foreign_key_arity() {
        let table = Table::new("posts")
            .column(Column::new("id", "int"))
            .column(Column::new("a", "int"))
            .foreign_key(
                ForeignKey::new("fk_a")
                    .columns(vec!["a".to_string()])
                    .references("users", vec!["id".to_string(), "b".to_string()]),
            );
        assert!(matches!(table.validate(), Err(Error::Invariant(_))));
    }

    #[test]
    fn test_schema_deterministic_order() {
        let schema = Schema::new()
            .table(Table::new("zeta").column(Column::new("id", "int")))
            .table(Table::new("alpha").column(Column::new("id", "int")));

        let names: Vec<&str> = schema.table_names().collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
