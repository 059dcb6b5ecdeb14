//! Parser for a subset of MySQL DDL.
//!
//! Accepts a document of `CREATE TABLE` statements, tolerant of the
//! boilerplate a `mysqldump`-style export carries (comments, `SET`
//! directives, `DROP TABLE IF EXISTS`), and produces a [`Schema`]. Errors
//! carry the byte offset of the offending construct within the original
//! document.

pub(crate) mod preprocess;
pub(crate) mod scan;

use tracing::debug;

use crate::error::{Error, Result};
use crate::schema::{
    Column, ForeignKey, Index, ReferentialAction, Schema, Table, TableOptions, normalize_type,
};
use scan::DefScanner;

/// Parses a DDL document into a schema.
pub fn parse_schema(input: &str) -> Result<Schema> {
    let text = preprocess::strip_directives(&preprocess::strip_comments(input));

    let mut schema = Schema::new();
    for (offset, stmt) in scan::split_top_level(&text, ';') {
        let head = stmt.trim_start();
        if head.is_empty() {
            continue;
        }
        let mut probe = DefScanner::new(stmt, offset);
        if probe.accept_keyword("CREATE") && probe.accept_keyword("TABLE") {
            let table = parse_create_table(stmt, offset)?;
            schema.insert(table);
        } else {
            debug!(
                statement = head.split_whitespace().next().unwrap_or(""),
                "skipping non-CREATE TABLE statement"
            );
        }
    }

    schema.validate()?;
    Ok(schema)
}

/// Parses a single `CREATE TABLE` statement (without trailing semicolon).
fn parse_create_table(stmt: &str, base: usize) -> Result<Table> {
    let mut s = DefScanner::new(stmt, base);
    s.expect_keyword("CREATE")?;
    s.expect_keyword("TABLE")?;
    if s.accept_keyword("IF") {
        s.expect_keyword("NOT")?;
        s.expect_keyword("EXISTS")?;
    }
    let name = s.read_identifier()?;
    let (body_base, body) = s.read_paren_group()?;

    let mut table = Table::new(name);
    for (part_offset, part) in scan::split_top_level(body, ',') {
        if part.trim().is_empty() {
            continue;
        }
        parse_body_part(&mut table, part, body_base + part_offset)?;
    }

    table.options = parse_table_options(s.rest(), s.offset())?;
    Ok(table)
}

/// Parses one comma-separated part of a table body: an index, a foreign key,
/// or a column definition.
fn parse_body_part(table: &mut Table, part: &str, base: usize) -> Result<()> {
    let mut s = DefScanner::new(part, base);

    if s.accept_keyword("PRIMARY") {
        s.expect_keyword("KEY")?;
        let columns = parse_key_columns(&mut s)?;
        table.indexes.insert(
            crate::schema::PRIMARY_KEY_NAME.to_string(),
            Index::primary(columns),
        );
        return Ok(());
    }

    if s.accept_keyword("UNIQUE") {
        let _ = s.accept_keyword("KEY") || s.accept_keyword("INDEX");
        let index = parse_index(&mut s, true)?;
        table.indexes.insert(index.name.clone(), index);
        return Ok(());
    }

    if s.accept_keyword("KEY") || s.accept_keyword("INDEX") {
        let index = parse_index(&mut s, false)?;
        table.indexes.insert(index.name.clone(), index);
        return Ok(());
    }

    if s.accept_keyword("FULLTEXT") {
        let _ = s.accept_keyword("KEY") || s.accept_keyword("INDEX");
        let mut index = parse_index(&mut s, false)?;
        index.index_type = "FULLTEXT".to_string();
        table.indexes.insert(index.name.clone(), index);
        return Ok(());
    }

    if s.accept_keyword("CONSTRAINT") {
        let name = if s.peek_keyword("FOREIGN") {
            None
        } else {
            Some(s.read_identifier()?)
        };
        s.expect_keyword("FOREIGN")?;
        s.expect_keyword("KEY")?;
        let fk = parse_foreign_key(&mut s, name)?;
        table.foreign_keys.insert(fk.name.clone(), fk);
        return Ok(());
    }

    if s.accept_keyword("FOREIGN") {
        s.expect_keyword("KEY")?;
        let fk = parse_foreign_key(&mut s, None)?;
        table.foreign_keys.insert(fk.name.clone(), fk);
        return Ok(());
    }

    parse_column(table, &mut s)
}

/// Parses the parenthesized column list of a key definition, tolerating
/// prefix lengths (`name(10)`) and `ASC`/`DESC` markers.
fn parse_key_columns(s: &mut DefScanner<'_>) -> Result<Vec<String>> {
    let (group_base, group) = s.read_paren_group()?;
    let mut columns = Vec::new();
    for (offset, element) in scan::split_top_level(group, ',') {
        let mut e = DefScanner::new(element, group_base + offset);
        columns.push(e.read_identifier()?);
        if e.peek_char() == Some('(') {
            e.read_paren_group()?;
        }
        let _ = e.accept_keyword("ASC") || e.accept_keyword("DESC");
    }
    if columns.is_empty() {
        return Err(Error::parse("empty key column list", group_base));
    }
    Ok(columns)
}

/// Parses a `[UNIQUE] KEY [name] (columns...)` definition after the keywords.
fn parse_index(s: &mut DefScanner<'_>, unique: bool) -> Result<Index> {
    let name = if s.peek_char() == Some('(') {
        None
    } else {
        Some(s.read_identifier()?)
    };
    let columns = parse_key_columns(s)?;
    // An unnamed key takes its first column's name, as the server would.
    let name = name.unwrap_or_else(|| columns[0].clone());

    let mut index = Index::new(name).columns(columns);
    if unique {
        index = index.unique();
    }
    if s.accept_keyword("USING") {
        index.index_type = s.read_word().to_uppercase();
    }
    Ok(index)
}

/// Parses `(cols) REFERENCES tbl (cols) [ON DELETE ...] [ON UPDATE ...]`
/// after the `FOREIGN KEY` keywords.
fn parse_foreign_key(s: &mut DefScanner<'_>, name: Option<String>) -> Result<ForeignKey> {
    let columns = parse_key_columns(s)?;
    s.expect_keyword("REFERENCES")?;
    let referenced_table = s.read_identifier()?;
    let referenced_columns = parse_key_columns(s)?;

    if columns.len() != referenced_columns.len() {
        return Err(Error::parse(
            "foreign key column count does not match referenced columns",
            s.offset(),
        ));
    }

    let name = name.unwrap_or_else(|| {
        let mut synthesized = String::from("fk");
        for column in &columns {
            synthesized.push('_');
            synthesized.push_str(column);
        }
        synthesized.push('_');
        synthesized.push_str(&referenced_table);
        synthesized
    });

    let mut fk = ForeignKey::new(name)
        .columns(columns)
        .references(referenced_table, referenced_columns);

    while s.accept_keyword("ON") {
        let is_delete = if s.accept_keyword("DELETE") {
            true
        } else if s.accept_keyword("UPDATE") {
            false
        } else {
            return Err(Error::parse(
                "expected DELETE or UPDATE after ON",
                s.offset(),
            ));
        };
        let action = parse_referential_action(s)?;
        if is_delete {
            fk.on_delete = action;
        } else {
            fk.on_update = action;
        }
    }

    Ok(fk)
}

fn parse_referential_action(s: &mut DefScanner<'_>) -> Result<ReferentialAction> {
    if s.accept_keyword("RESTRICT") {
        Ok(ReferentialAction::Restrict)
    } else if s.accept_keyword("CASCADE") {
        Ok(ReferentialAction::Cascade)
    } else if s.accept_keyword("SET") {
        s.expect_keyword("NULL")?;
        Ok(ReferentialAction::SetNull)
    } else if s.accept_keyword("NO") {
        s.expect_keyword("ACTION")?;
        Ok(ReferentialAction::NoAction)
    } else {
        Err(Error::parse("malformed referential action", s.offset()))
    }
}

/// Parses a column definition part.
fn parse_column(table: &mut Table, s: &mut DefScanner<'_>) -> Result<()> {
    let name = s.read_identifier()?;

    // Type: leading identifier plus optional verbatim parameter list, plus
    // the attribute words that are really part of the type on this engine.
    let type_offset = s.offset();
    let mut raw_type = s.read_word().to_string();
    if raw_type.is_empty() {
        return Err(Error::parse(
            format!("missing type for column `{name}`"),
            type_offset,
        ));
    }
    if raw_type.eq_ignore_ascii_case("DOUBLE") {
        // `double precision` is plain `double` to the server.
        let _ = s.accept_keyword("PRECISION");
    }
    if s.peek_char() == Some('(') {
        let (_, params) = s.read_paren_group()?;
        raw_type.push('(');
        raw_type.push_str(params.trim());
        raw_type.push(')');
    }
    while s.peek_keyword("UNSIGNED") || s.peek_keyword("ZEROFILL") {
        raw_type.push(' ');
        raw_type.push_str(&s.read_word().to_lowercase());
    }

    let mut column = Column {
        name: name.clone(),
        sql_type: normalize_type(&raw_type),
        nullable: true,
        default: None,
        extra: String::new(),
        comment: None,
        charset: None,
        collation: None,
    };
    let mut inline_primary = false;
    let mut inline_unique = false;

    while !s.is_done() {
        if s.accept_keyword("NOT") {
            s.expect_keyword("NULL")?;
            column.nullable = false;
        } else if s.accept_keyword("NULL") {
            column.nullable = true;
        } else if s.accept_keyword("DEFAULT") {
            column.default = parse_default_value(s)?;
        } else if s.accept_keyword("AUTO_INCREMENT") {
            column.extra = "auto_increment".to_string();
        } else if s.accept_keyword("COMMENT") {
            column.comment = Some(s.read_quoted_string()?);
        } else if s.accept_keyword("CHARACTER") {
            s.expect_keyword("SET")?;
            column.charset = Some(s.read_identifier()?);
        } else if s.accept_keyword("CHARSET") {
            column.charset = Some(s.read_identifier()?);
        } else if s.accept_keyword("COLLATE") {
            column.collation = Some(s.read_identifier()?);
        } else if s.accept_keyword("PRIMARY") {
            let _ = s.accept_keyword("KEY");
            inline_primary = true;
        } else if s.accept_keyword("UNIQUE") {
            let _ = s.accept_keyword("KEY");
            inline_unique = true;
        } else if s.accept_keyword("ON") {
            // `ON UPDATE CURRENT_TIMESTAMP`: recognized so its value token
            // is not misread, but not represented in the model.
            s.expect_keyword("UPDATE")?;
            s.read_word();
            if s.peek_char() == Some('(') {
                s.read_paren_group()?;
            }
        } else {
            let word = s.read_word();
            if word.is_empty() {
                return Err(Error::parse(
                    format!("unexpected character in definition of column `{name}`"),
                    s.offset(),
                ));
            }
            debug!(column = %name, attribute = word, "ignoring unrecognized column attribute");
        }
    }

    if inline_primary {
        table.indexes.insert(
            crate::schema::PRIMARY_KEY_NAME.to_string(),
            Index::primary(vec![name.clone()]),
        );
        column.nullable = false;
    }
    if inline_unique {
        table
            .indexes
            .insert(name.clone(), Index::new(name).columns(vec![column.name.clone()]).unique());
    }

    table.columns.push(column);
    Ok(())
}

/// Parses the value after `DEFAULT`. The literal `NULL` collapses to no
/// default; quoted strings are decoded; bare tokens (numbers, keywords like
/// `CURRENT_TIMESTAMP`, optionally with a precision group) stay verbatim.
fn parse_default_value(s: &mut DefScanner<'_>) -> Result<Option<String>> {
    if s.accept_keyword("NULL") {
        return Ok(None);
    }
    match s.peek_char() {
        Some('\'' | '"') => Ok(Some(s.read_quoted_string()?)),
        Some('(') => {
            let (_, group) = s.read_paren_group()?;
            Ok(Some(format!("({group})")))
        }
        _ => {
            let offset = s.offset();
            let value = s.read_raw_token();
            if value.is_empty() {
                return Err(Error::parse("missing value after DEFAULT", offset));
            }
            Ok(Some(value.to_string()))
        }
    }
}

/// Parses the table options clause following the closing parenthesis.
fn parse_table_options(rest: &str, base: usize) -> Result<TableOptions> {
    let mut s = DefScanner::new(rest, base);
    let mut options = TableOptions::default();

    while !s.is_done() {
        let word = s.read_word().to_uppercase();
        if word.is_empty() {
            return Err(Error::parse("unexpected character in table options", s.offset()));
        }
        match word.as_str() {
            "ENGINE" => {
                s.accept_char('=');
                options.engine = s.read_identifier()?;
            }
            "AUTO_INCREMENT" => {
                s.accept_char('=');
                let value = s.read_word();
                options.auto_increment = value.parse().ok();
            }
            "DEFAULT" => {}
            "CHARSET" => {
                s.accept_char('=');
                // Captured but not represented in the model.
                s.read_identifier()?;
            }
            "CHARACTER" => {
                s.expect_keyword("SET")?;
                s.accept_char('=');
                s.read_identifier()?;
            }
            "COLLATE" => {
                s.accept_char('=');
                options.collation = Some(s.read_identifier()?);
            }
            "COMMENT" => {
                s.accept_char('=');
                options.comment = Some(s.read_quoted_string()?);
            }
            other => {
                debug!(option = other, "ignoring unrecognized table option");
                if s.accept_char('=') {
                    if matches!(s.peek_char(), Some('\'' | '"')) {
                        s.read_quoted_string()?;
                    } else {
                        s.read_word();
                    }
                }
            }
        }
    }

    Ok(options)
}
