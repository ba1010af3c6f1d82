//! Text-level SQL helpers: `DELIMITER` stripping, default `LIMIT`, the
//! best-effort `FROM` table parser and the statement builders used by the
//! tree commands.
//!
//! None of this is a SQL parser. The table parser handles single-table
//! `SELECT`s; joins, subqueries and `FROM` inside string literals or comments
//! may resolve to the wrong table.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;

use crate::error::{DbError, Result};

static DELIMITER_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t]*delimiter[ \t]+(\S+)")
        .unwrap_or_else(|e| unreachable!("static regex: {e}"))
});

/// Result of [`parse_table_from_sql`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTable {
    pub database: Option<String>,
    pub table: Option<String>,
}

/// Rewrite a script that uses `DELIMITER x` directives into plain
/// `;`-terminated statements the driver understands.
///
/// A directive only counts at the start of a line, so `delimiter` used as a
/// name inside a statement or behind `-- ` is left alone. Text between
/// directives has the delimiter that was active for it replaced with `;`.
#[must_use]
pub fn remove_delimiter_instructions(sql: &str) -> String {
    let mut current_delimiter = ";".to_string();
    let mut next_position = 0;
    let mut result = String::with_capacity(sql.len());
    let mut found = false;

    for caps in DELIMITER_DIRECTIVE.captures_iter(sql) {
        let (Some(directive), Some(token)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if directive.start() < next_position {
            continue;
        }
        found = true;
        push_with_delimiter(
            &mut result,
            sql.get(next_position..directive.start()).unwrap_or_default(),
            &current_delimiter,
        );
        next_position = directive.end();
        current_delimiter = token.as_str().to_string();
    }

    if !found {
        return sql.to_string();
    }

    push_with_delimiter(
        &mut result,
        sql.get(next_position..).unwrap_or_default(),
        &current_delimiter,
    );
    result
}

fn push_with_delimiter(out: &mut String, segment: &str, delimiter: &str) {
    if delimiter == ";" {
        out.push_str(segment);
    } else {
        out.push_str(&segment.replace(delimiter, ";"));
    }
}

/// Append ` LIMIT {limit}` to a bare `SELECT` that has no `LIMIT` of its own.
/// Trailing semicolons are dropped first so the clause lands inside the statement.
#[must_use]
pub fn apply_default_limit(sql: &str, limit: u64) -> String {
    let trimmed = sql.trim();
    let upper = trimmed.to_ascii_uppercase();
    if !upper.starts_with("SELECT") || find_word(&upper, "LIMIT").is_some() {
        return sql.to_string();
    }
    let body = trimmed.trim_end_matches(|c: char| c == ';' || c.is_whitespace());
    format!("{body} LIMIT {limit}")
}

/// Find the table named after the first `FROM` keyword.
///
/// Accepts `table`, `db.table` and backtick/quote wrapped variants of both.
#[must_use]
pub fn parse_table_from_sql(sql: &str) -> ParsedTable {
    let trimmed = sql.trim();
    let upper = trimmed.to_ascii_uppercase();
    let Some(from) = find_word(&upper, "FROM") else {
        return ParsedTable::default();
    };
    let after_from = trimmed.get(from + 4..).unwrap_or_default().trim_start();

    let (first, rest) = read_name_segment(after_from);
    if first.is_empty() {
        return ParsedTable::default();
    }

    if let Some(after_dot) = rest.strip_prefix('.') {
        let (second, _) = read_name_segment(after_dot);
        if !second.is_empty() {
            return ParsedTable {
                database: Some(first.to_string()),
                table: Some(second.to_string()),
            };
        }
    }

    ParsedTable {
        database: None,
        table: Some(first.to_string()),
    }
}

const QUOTES: [char; 3] = ['`', '\'', '"'];

fn is_name_terminator(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | ';' | '(' | ')' | '.') || QUOTES.contains(&c)
}

/// Read one optionally quoted name, returning it and the text after any
/// closing quote.
fn read_name_segment(input: &str) -> (&str, &str) {
    let unquoted = input.trim_start_matches(QUOTES);
    let end = unquoted
        .find(is_name_terminator)
        .unwrap_or(unquoted.len());
    let (name, rest) = unquoted.split_at(end);
    (name, rest.trim_start_matches(QUOTES))
}

/// Byte offset of `word` in `haystack` where it is not part of a longer identifier.
/// Both arguments are expected to be ASCII-uppercased already.
fn find_word(haystack: &str, word: &str) -> Option<usize> {
    let is_ident = |c: char| c.is_alphanumeric() || c == '_';
    haystack.match_indices(word).map(|(i, _)| i).find(|&i| {
        let before = haystack.get(..i).and_then(|s| s.chars().next_back());
        let after = haystack.get(i + word.len()..).and_then(|s| s.chars().next());
        !before.is_some_and(is_ident) && !after.is_some_and(is_ident)
    })
}

/// Accept only letters, digits and underscores.
///
/// # Errors
///
/// Returns [`DbError::InvalidIdentifier`] for anything else, including the empty string.
pub fn validate_identifier(name: &str) -> Result<&str> {
    if !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        Ok(name)
    } else {
        Err(DbError::InvalidIdentifier(name.to_string()))
    }
}

/// Backtick-quote a validated identifier.
///
/// # Errors
///
/// See [`validate_identifier`].
pub fn quote_ident(name: &str) -> Result<String> {
    validate_identifier(name).map(|name| format!("`{name}`"))
}

/// `` `database`.`table` `` with both parts validated.
///
/// # Errors
///
/// See [`validate_identifier`].
pub fn qualified_table(database: &str, table: &str) -> Result<String> {
    Ok(format!("{}.{}", quote_ident(database)?, quote_ident(table)?))
}

/// Single-quoted string literal. Quotes are doubled and backslashes escaped.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

/// # Errors
///
/// Fails when either name is not a plain identifier.
pub fn select_top(database: &str, table: &str, limit: u64) -> Result<String> {
    Ok(format!(
        "SELECT * FROM {} LIMIT {limit};",
        qualified_table(database, table)?
    ))
}

/// # Errors
///
/// Fails when any name is not a plain identifier.
pub fn select_column(
    database: &str,
    table: &str,
    column: &str,
    limit: u64,
) -> Result<String> {
    Ok(format!(
        "SELECT {}\nFROM {}\nLIMIT {limit};",
        quote_ident(column)?,
        qualified_table(database, table)?
    ))
}

/// `SELECT *` filtered on one column. Numeric columns compare against a bare
/// number when the value parses as one; everything else is a quoted literal.
///
/// # Errors
///
/// Fails when any name is not a plain identifier.
pub fn select_where(
    database: &str,
    table: &str,
    column: &str,
    column_type: &str,
    value: &str,
    limit: u64,
) -> Result<String> {
    let value = value.trim();
    let literal = if is_numeric_type(column_type) && value.parse::<f64>().is_ok() {
        value.to_string()
    } else {
        quote_literal(value)
    };
    Ok(format!(
        "SELECT *\nFROM {}\nWHERE {} = {literal}\nLIMIT {limit};",
        qualified_table(database, table)?,
        quote_ident(column)?
    ))
}

#[must_use]
pub fn is_numeric_type(column_type: &str) -> bool {
    let lower = column_type.to_lowercase();
    ["int", "decimal", "float", "double", "numeric", "bit"]
        .iter()
        .any(|t| lower.contains(t))
}

/// # Errors
///
/// Fails when either name is not a plain identifier.
pub fn count_rows(database: &str, table: &str) -> Result<String> {
    Ok(format!(
        "SELECT COUNT(*) AS total FROM {};",
        qualified_table(database, table)?
    ))
}

/// # Errors
///
/// Fails when either name is not a plain identifier.
pub fn drop_table(database: &str, table: &str) -> Result<String> {
    Ok(format!("DROP TABLE {};", qualified_table(database, table)?))
}

/// Name for a timestamped copy of `table`: `{table}_{YYYYMMDDHHmmss}`.
#[must_use]
pub fn backup_table_name(table: &str, at: NaiveDateTime) -> String {
    format!("{table}_{}", at.format("%Y%m%d%H%M%S"))
}

/// The two statements that copy a table: structure first, then rows.
///
/// # Errors
///
/// Fails when any name is not a plain identifier.
pub fn backup_table(
    database: &str,
    table: &str,
    backup: &str,
) -> Result<[String; 2]> {
    let source = qualified_table(database, table)?;
    let target = qualified_table(database, backup)?;
    Ok([
        format!("CREATE TABLE {target} LIKE {source};"),
        format!("INSERT INTO {target} SELECT * FROM {source};"),
    ])
}

/// `ALTER TABLE … ADD COLUMN`. The definition is the user's column type and
/// modifiers, e.g. `VARCHAR(64) NOT NULL DEFAULT ''`.
///
/// # Errors
///
/// Fails on a bad identifier, an empty definition or one containing `;`.
pub fn add_column(
    database: &str,
    table: &str,
    column: &str,
    definition: &str,
    comment: Option<&str>,
) -> Result<String> {
    let definition = definition.trim();
    if definition.is_empty() || definition.contains(';') {
        return Err(DbError::InvalidInput(format!(
            "Invalid column definition: {definition:?}"
        )));
    }
    let mut sql = format!(
        "ALTER TABLE {} ADD COLUMN {} {definition}",
        qualified_table(database, table)?,
        quote_ident(column)?
    );
    if let Some(comment) = comment.filter(|c| !c.is_empty()) {
        sql.push_str(" COMMENT ");
        sql.push_str(&quote_literal(comment));
    }
    sql.push(';');
    Ok(sql)
}

/// # Errors
///
/// Fails when any name is not a plain identifier.
pub fn drop_column(database: &str, table: &str, column: &str) -> Result<String> {
    Ok(format!(
        "ALTER TABLE {}\nDROP COLUMN {};",
        qualified_table(database, table)?,
        quote_ident(column)?
    ))
}

/// The column listing shown at the top of the structure report.
#[must_use]
pub fn structure_sql(database: &str, table: &str) -> String {
    format!(
        "SELECT COLUMN_NAME AS 'Field', COLUMN_TYPE AS 'Type', IS_NULLABLE AS 'Null', \
         COLUMN_KEY AS 'Key', COLUMN_DEFAULT AS 'Default', EXTRA AS 'Extra', \
         COLUMN_COMMENT AS 'Comment' FROM information_schema.COLUMNS \
         WHERE TABLE_SCHEMA = {} AND TABLE_NAME = {};",
        quote_literal(database),
        quote_literal(table)
    )
}
