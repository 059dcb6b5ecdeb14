//! Schema introspection against a live database.
//!
//! Queries the connected database's information schema and materializes the
//! same model the DDL parser produces, so the two can be diffed directly.
//! Raw rows are folded into model values by pure functions, which is where
//! the normalization happens and what the unit tests exercise.

use sqlx::{MySqlPool, Row};
use tracing::debug;

use schemasync_core::schema::{
    Column, ForeignKey, Index, ReferentialAction, Schema, Table, TableOptions, normalize_type,
};

use crate::error::{Result, SyncError};

/// One row of `information_schema.TABLES`.
#[derive(Debug, Clone)]
pub struct TableRow {
    pub name: String,
    pub engine: Option<String>,
    pub collation: Option<String>,
    pub comment: Option<String>,
    pub auto_increment: Option<u64>,
}

/// One row of `information_schema.COLUMNS`, in ordinal position order.
#[derive(Debug, Clone)]
pub struct ColumnRow {
    pub name: String,
    pub column_type: String,
    pub is_nullable: String,
    pub default: Option<String>,
    pub extra: String,
    pub comment: Option<String>,
    pub charset: Option<String>,
    pub collation: Option<String>,
}

/// One row of `information_schema.STATISTICS`, ordered by index name and
/// position within the index.
#[derive(Debug, Clone)]
pub struct IndexRow {
    pub index_name: String,
    pub non_unique: i64,
    pub column_name: String,
    pub index_type: String,
    pub comment: Option<String>,
}

/// One row of the `KEY_COLUMN_USAGE` / `REFERENTIAL_CONSTRAINTS` join,
/// ordered by constraint name and ordinal position.
#[derive(Debug, Clone)]
pub struct ForeignKeyRow {
    pub constraint_name: String,
    pub column_name: String,
    pub referenced_table: String,
    pub referenced_column: String,
    pub update_rule: Option<String>,
    pub delete_rule: Option<String>,
}

/// Introspects the current database into a [`Schema`].
///
/// Base tables only; views are excluded. The snapshot is read best-effort:
/// concurrent DDL against the same database is not defended against.
pub async fn introspect_schema(pool: &MySqlPool) -> Result<Schema> {
    let mut schema = Schema::new();

    for table_row in fetch_tables(pool).await? {
        debug!(table = %table_row.name, "introspecting table");
        let columns = fetch_columns(pool, &table_row.name).await?;
        let indexes = fetch_indexes(pool, &table_row.name).await?;
        let foreign_keys = fetch_foreign_keys(pool, &table_row.name).await?;
        schema.insert(fold_table(&table_row, columns, indexes, foreign_keys));
    }

    schema.validate()?;
    Ok(schema)
}

async fn fetch_tables(pool: &MySqlPool) -> Result<Vec<TableRow>> {
    let query = "SELECT TABLE_NAME, ENGINE, TABLE_COLLATION, TABLE_COMMENT, AUTO_INCREMENT
        FROM information_schema.TABLES
        WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE'
        ORDER BY TABLE_NAME";

    let rows = sqlx::query(query)
        .fetch_all(pool)
        .await
        .map_err(SyncError::Introspection)?;

    rows.into_iter()
        .map(|row| {
            Ok(TableRow {
                name: row.try_get("TABLE_NAME").map_err(SyncError::Introspection)?,
                engine: row.try_get("ENGINE").map_err(SyncError::Introspection)?,
                collation: row
                    .try_get("TABLE_COLLATION")
                    .map_err(SyncError::Introspection)?,
                comment: row
                    .try_get("TABLE_COMMENT")
                    .map_err(SyncError::Introspection)?,
                auto_increment: row
                    .try_get("AUTO_INCREMENT")
                    .map_err(SyncError::Introspection)?,
            })
        })
        .collect()
}

async fn fetch_columns(pool: &MySqlPool, table: &str) -> Result<Vec<ColumnRow>> {
    let query = "SELECT COLUMN_NAME, COLUMN_TYPE, IS_NULLABLE, COLUMN_DEFAULT, EXTRA,
            COLUMN_COMMENT, CHARACTER_SET_NAME, COLLATION_NAME
        FROM information_schema.COLUMNS
        WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
        ORDER BY ORDINAL_POSITION";

    let rows = sqlx::query(query)
        .bind(table)
        .fetch_all(pool)
        .await
        .map_err(SyncError::Introspection)?;

    rows.into_iter()
        .map(|row| {
            Ok(ColumnRow {
                name: row.try_get("COLUMN_NAME").map_err(SyncError::Introspection)?,
                column_type: row.try_get("COLUMN_TYPE").map_err(SyncError::Introspection)?,
                is_nullable: row.try_get("IS_NULLABLE").map_err(SyncError::Introspection)?,
                default: row
                    .try_get("COLUMN_DEFAULT")
                    .map_err(SyncError::Introspection)?,
                extra: row.try_get("EXTRA").map_err(SyncError::Introspection)?,
                comment: row
                    .try_get("COLUMN_COMMENT")
                    .map_err(SyncError::Introspection)?,
                charset: row
                    .try_get("CHARACTER_SET_NAME")
                    .map_err(SyncError::Introspection)?,
                collation: row
                    .try_get("COLLATION_NAME")
                    .map_err(SyncError::Introspection)?,
            })
        })
        .collect()
}

async fn fetch_indexes(pool: &MySqlPool, table: &str) -> Result<Vec<IndexRow>> {
    let query = "SELECT INDEX_NAME, NON_UNIQUE, COLUMN_NAME, INDEX_TYPE, INDEX_COMMENT
        FROM information_schema.STATISTICS
        WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
        ORDER BY INDEX_NAME, SEQ_IN_INDEX";

    let rows = sqlx::query(query)
        .bind(table)
        .fetch_all(pool)
        .await
        .map_err(SyncError::Introspection)?;

    rows.into_iter()
        .map(|row| {
            Ok(IndexRow {
                index_name: row.try_get("INDEX_NAME").map_err(SyncError::Introspection)?,
                non_unique: row.try_get("NON_UNIQUE").map_err(SyncError::Introspection)?,
                column_name: row.try_get("COLUMN_NAME").map_err(SyncError::Introspection)?,
                index_type: row.try_get("INDEX_TYPE").map_err(SyncError::Introspection)?,
                comment: row
                    .try_get("INDEX_COMMENT")
                    .map_err(SyncError::Introspection)?,
            })
        })
        .collect()
}

async fn fetch_foreign_keys(pool: &MySqlPool, table: &str) -> Result<Vec<ForeignKeyRow>> {
    let query = "SELECT kcu.CONSTRAINT_NAME, kcu.COLUMN_NAME,
            kcu.REFERENCED_TABLE_NAME, kcu.REFERENCED_COLUMN_NAME,
            rc.UPDATE_RULE, rc.DELETE_RULE
        FROM information_schema.KEY_COLUMN_USAGE kcu
        JOIN information_schema.REFERENTIAL_CONSTRAINTS rc
            ON kcu.CONSTRAINT_NAME = rc.CONSTRAINT_NAME
            AND kcu.CONSTRAINT_SCHEMA = rc.CONSTRAINT_SCHEMA
        WHERE kcu.TABLE_SCHEMA = DATABASE()
          AND kcu.TABLE_NAME = ?
          AND kcu.REFERENCED_TABLE_NAME IS NOT NULL
        ORDER BY kcu.CONSTRAINT_NAME, kcu.ORDINAL_POSITION";

    let rows = sqlx::query(query)
        .bind(table)
        .fetch_all(pool)
        .await
        .map_err(SyncError::Introspection)?;

    rows.into_iter()
        .map(|row| {
            Ok(ForeignKeyRow {
                constraint_name: row
                    .try_get("CONSTRAINT_NAME")
                    .map_err(SyncError::Introspection)?,
                column_name: row.try_get("COLUMN_NAME").map_err(SyncError::Introspection)?,
                referenced_table: row
                    .try_get("REFERENCED_TABLE_NAME")
                    .map_err(SyncError::Introspection)?,
                referenced_column: row
                    .try_get("REFERENCED_COLUMN_NAME")
                    .map_err(SyncError::Introspection)?,
                update_rule: row.try_get("UPDATE_RULE").map_err(SyncError::Introspection)?,
                delete_rule: row.try_get("DELETE_RULE").map_err(SyncError::Introspection)?,
            })
        })
        .collect()
}

/// Folds the fetched rows of one table into a model [`Table`].
#[must_use]
pub fn fold_table(
    table_row: &TableRow,
    columns: Vec<ColumnRow>,
    indexes: Vec<IndexRow>,
    foreign_keys: Vec<ForeignKeyRow>,
) -> Table {
    let mut table = Table::new(&table_row.name);
    table.columns = fold_columns(columns);
    for index in fold_indexes(indexes) {
        table.indexes.insert(index.name.clone(), index);
    }
    for fk in fold_foreign_keys(foreign_keys) {
        table.foreign_keys.insert(fk.name.clone(), fk);
    }
    table.options = TableOptions {
        engine: table_row.engine.clone().unwrap_or_else(|| "InnoDB".to_string()),
        collation: table_row.collation.clone(),
        comment: table_row.comment.clone().filter(|c| !c.is_empty()),
        auto_increment: table_row.auto_increment,
    };
    table
}

/// Maps column rows to model columns, in ordinal order.
#[must_use]
pub fn fold_columns(rows: Vec<ColumnRow>) -> Vec<Column> {
    rows.into_iter()
        .map(|row| Column {
            name: row.name,
            sql_type: normalize_type(&row.column_type),
            nullable: row.is_nullable.eq_ignore_ascii_case("YES"),
            default: row.default,
            extra: row.extra.to_lowercase(),
            comment: row.comment.filter(|c| !c.is_empty()),
            charset: row.charset,
            collation: row.collation,
        })
        .collect()
}

/// Groups index rows by name, accumulating columns in position order.
#[must_use]
pub fn fold_indexes(rows: Vec<IndexRow>) -> Vec<Index> {
    let mut indexes: Vec<Index> = Vec::new();
    for row in rows {
        if let Some(existing) = indexes.iter_mut().find(|i| i.name == row.index_name) {
            existing.columns.push(row.column_name);
            continue;
        }
        indexes.push(Index {
            name: row.index_name,
            columns: vec![row.column_name],
            unique: row.non_unique == 0,
            index_type: row.index_type,
            comment: row.comment.filter(|c| !c.is_empty()),
        });
    }
    indexes
}

/// Groups foreign key rows by constraint name, accumulating column pairs in
/// ordinal order.
#[must_use]
pub fn fold_foreign_keys(rows: Vec<ForeignKeyRow>) -> Vec<ForeignKey> {
    let mut foreign_keys: Vec<ForeignKey> = Vec::new();
    for row in rows {
        if let Some(existing) = foreign_keys
            .iter_mut()
            .find(|fk| fk.name == row.constraint_name)
        {
            existing.columns.push(row.column_name);
            existing.referenced_columns.push(row.referenced_column);
            continue;
        }
        foreign_keys.push(ForeignKey {
            name: row.constraint_name,
            columns: vec![row.column_name],
            referenced_table: row.referenced_table,
            referenced_columns: vec![row.referenced_column],
            on_update: referential_action(row.update_rule.as_deref()),
            on_delete: referential_action(row.delete_rule.as_deref()),
        });
    }
    foreign_keys
}

fn referential_action(rule: Option<&str>) -> ReferentialAction {
    rule.and_then(ReferentialAction::from_sql).unwrap_or_default()
}
