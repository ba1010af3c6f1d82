//! `information_schema` lookups behind the tree and the structure report.

use crate::{
    Column, SYSTEM_DATABASES, Table,
    connection::ConnectionOptions,
    error::{DbError, Result},
    executor::{Executor, ResultSet},
    sql,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    pub name: String,
    pub unique: bool,
    pub columns: Vec<String>,
}

/// Everything shown by "show table structure".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableStructure {
    pub database: String,
    pub table: String,
    pub comment: Option<String>,
    /// Query that lists the columns, echoed in the report
    pub structure_sql: String,
    pub columns: Vec<Column>,
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
    pub indexes: Vec<Index>,
    pub sample_sql: Option<String>,
    pub sample: Option<ResultSet>,
}

/// User databases on the server, system schemas excluded.
///
/// # Errors
///
/// Connection or query failure.
pub async fn list_databases<E: Executor + ?Sized>(
    executor: &E,
    options: &ConnectionOptions,
) -> Result<Vec<String>> {
    let set = executor.query(options, "SHOW DATABASES").await?;
    Ok(set
        .rows
        .iter()
        .filter_map(|row| row.first().cloned().flatten())
        .filter(|name| !SYSTEM_DATABASES.contains(&name.to_lowercase().as_str()))
        .collect())
}

fn tables_sql(database: &str, limit: Option<u64>) -> String {
    let mut sql = format!(
        "SELECT TABLE_NAME AS name, TABLE_COMMENT AS comment \
         FROM information_schema.TABLES WHERE TABLE_SCHEMA = {} ORDER BY TABLE_NAME",
        sql::quote_literal(database)
    );
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    sql
}

fn tables_from(set: &ResultSet) -> Vec<Table> {
    (0..set.len())
        .filter_map(|i| {
            Some(Table {
                name: set.value(i, "name")?.to_string(),
                comment: set.value(i, "comment").unwrap_or_default().to_string(),
            })
        })
        .collect()
}

/// Up to `limit` tables of `database` with their comments.
///
/// # Errors
///
/// Connection or query failure.
pub async fn list_tables<E: Executor + ?Sized>(
    executor: &E,
    options: &ConnectionOptions,
    database: &str,
    limit: u64,
) -> Result<Vec<Table>> {
    let set = executor
        .query(options, &tables_sql(database, Some(limit)))
        .await?;
    Ok(tables_from(&set))
}

/// Every table of `database`, for the open-table picker.
///
/// # Errors
///
/// Connection or query failure.
pub async fn list_all_tables<E: Executor + ?Sized>(
    executor: &E,
    options: &ConnectionOptions,
    database: &str,
) -> Result<Vec<Table>> {
    let set = executor.query(options, &tables_sql(database, None)).await?;
    Ok(tables_from(&set))
}

/// Columns of one table in ordinal order.
///
/// # Errors
///
/// Connection or query failure.
pub async fn list_columns<E: Executor + ?Sized>(
    executor: &E,
    options: &ConnectionOptions,
    database: &str,
    table: &str,
) -> Result<Vec<Column>> {
    let query = format!(
        "SELECT COLUMN_NAME AS name, COLUMN_TYPE AS column_type, IS_NULLABLE AS nullable, \
         COLUMN_DEFAULT AS default_value, COLUMN_KEY AS column_key, EXTRA AS extra, \
         COLUMN_COMMENT AS comment FROM information_schema.COLUMNS \
         WHERE TABLE_SCHEMA = {} AND TABLE_NAME = {} ORDER BY ORDINAL_POSITION",
        sql::quote_literal(database),
        sql::quote_literal(table)
    );
    let set = executor.query(options, &query).await?;
    Ok((0..set.len())
        .filter_map(|i| {
            let text = |name: &str| set.value(i, name).unwrap_or_default().to_string();
            Some(Column {
                name: set.value(i, "name")?.to_string(),
                column_type: text("column_type"),
                nullable: set
                    .value(i, "nullable")
                    .is_some_and(|v| v.eq_ignore_ascii_case("YES")),
                default: set.value(i, "default_value").map(str::to_string),
                key: text("column_key"),
                extra: text("extra"),
                comment: text("comment"),
            })
        })
        .collect())
}

/// `SELECT COUNT(*)` of one table.
///
/// # Errors
///
/// Bad identifiers, connection or query failure, or a non-numeric result.
pub async fn count_rows<E: Executor + ?Sized>(
    executor: &E,
    options: &ConnectionOptions,
    database: &str,
    table: &str,
) -> Result<u64> {
    let set = executor
        .query(options, &sql::count_rows(database, table)?)
        .await?;
    set.first_value()
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| DbError::Query("COUNT(*) returned no number".to_string()))
}

fn key_usage_filter(database: &str, table: &str) -> String {
    format!(
        "FROM information_schema.KEY_COLUMN_USAGE WHERE TABLE_SCHEMA = {} AND TABLE_NAME = {}",
        sql::quote_literal(database),
        sql::quote_literal(table)
    )
}

/// Columns, keys, indexes and a few newest rows of one table.
///
/// Only the column listing is required; the comment, key, index and sample
/// lookups degrade to empty values on failure.
///
/// # Errors
///
/// Connection failure or failure of the column listing.
pub async fn table_structure<E: Executor + ?Sized>(
    executor: &E,
    options: &ConnectionOptions,
    database: &str,
    table: &str,
    sample_rows: u64,
) -> Result<TableStructure> {
    let columns = list_columns(executor, options, database, table).await?;

    let comment_sql = format!(
        "SELECT TABLE_COMMENT AS comment FROM information_schema.TABLES \
         WHERE TABLE_SCHEMA = {} AND TABLE_NAME = {}",
        sql::quote_literal(database),
        sql::quote_literal(table)
    );
    let comment = best_effort(executor.query(options, &comment_sql).await, "table comment")
        .and_then(|set| set.first_value().map(str::to_string))
        .filter(|c| !c.is_empty());

    let pk_sql = format!(
        "SELECT COLUMN_NAME AS name {} AND CONSTRAINT_NAME = 'PRIMARY' ORDER BY ORDINAL_POSITION",
        key_usage_filter(database, table)
    );
    let primary_key: Vec<String> = best_effort(executor.query(options, &pk_sql).await, "primary key")
        .map(|set| set.column_values("name").into_iter().map(str::to_string).collect())
        .unwrap_or_default();

    let fk_sql = format!(
        "SELECT COLUMN_NAME AS column_name, REFERENCED_TABLE_NAME AS referenced_table, \
         REFERENCED_COLUMN_NAME AS referenced_column {} \
         AND REFERENCED_TABLE_NAME IS NOT NULL ORDER BY ORDINAL_POSITION",
        key_usage_filter(database, table)
    );
    let foreign_keys = best_effort(executor.query(options, &fk_sql).await, "foreign keys")
        .map(|set| {
            (0..set.len())
                .filter_map(|i| {
                    Some(ForeignKey {
                        column: set.value(i, "column_name")?.to_string(),
                        referenced_table: set.value(i, "referenced_table")?.to_string(),
                        referenced_column: set.value(i, "referenced_column")?.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let index_sql = format!(
        "SELECT INDEX_NAME AS index_name, NON_UNIQUE AS non_unique, COLUMN_NAME AS column_name \
         FROM information_schema.STATISTICS WHERE TABLE_SCHEMA = {} AND TABLE_NAME = {} \
         AND INDEX_NAME <> 'PRIMARY' ORDER BY INDEX_NAME, SEQ_IN_INDEX",
        sql::quote_literal(database),
        sql::quote_literal(table)
    );
    let indexes = best_effort(executor.query(options, &index_sql).await, "indexes")
        .map(|set| group_indexes(&set))
        .unwrap_or_default();

    let sample_sql = sample_sql(database, table, &primary_key, &columns, sample_rows);
    let sample = match &sample_sql {
        Some(query) => best_effort(executor.query(options, query).await, "sample rows"),
        None => None,
    };

    Ok(TableStructure {
        database: database.to_string(),
        table: table.to_string(),
        comment,
        structure_sql: sql::structure_sql(database, table),
        columns,
        primary_key,
        foreign_keys,
        indexes,
        sample_sql,
        sample,
    })
}

fn best_effort(result: Result<ResultSet>, what: &str) -> Option<ResultSet> {
    result
        .map_err(|e| tracing::debug!(what, error = %e, "ignoring failed lookup"))
        .ok()
}

/// Newest rows first: ordered by the first primary key column, else by `id`.
fn sample_sql(
    database: &str,
    table: &str,
    primary_key: &[String],
    columns: &[Column],
    limit: u64,
) -> Option<String> {
    let target = sql::qualified_table(database, table).ok()?;
    let order_column = primary_key.first().cloned().or_else(|| {
        columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case("id"))
            .map(|c| c.name.clone())
    });
    let order = order_column
        .and_then(|c| sql::quote_ident(&c).ok())
        .map(|c| format!(" ORDER BY {c} DESC"))
        .unwrap_or_default();
    Some(format!("SELECT * FROM {target}{order} LIMIT {limit};"))
}

fn group_indexes(set: &ResultSet) -> Vec<Index> {
    let mut indexes: Vec<Index> = Vec::new();
    for i in 0..set.len() {
        let (Some(name), Some(column)) = (set.value(i, "index_name"), set.value(i, "column_name"))
        else {
            continue;
        };
        match indexes.last_mut() {
            Some(last) if last.name == name => last.columns.push(column.to_string()),
            Some(_) | None => indexes.push(Index {
                name: name.to_string(),
                unique: set.value(i, "non_unique") == Some("0"),
                columns: vec![column.to_string()],
            }),
        }
    }
    indexes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedExecutor;

    fn options() -> ConnectionOptions {
        ConnectionOptions {
            host: "localhost".to_string(),
            user: "root".to_string(),
            port: 3306,
            ..ConnectionOptions::default()
        }
    }

    #[tokio::test]
    async fn system_databases_are_hidden() {
        let executor = ScriptedExecutor::new().on_rows(
            "SHOW DATABASES",
            &["Database"],
            &[
                &[Some("information_schema")],
                &[Some("shop")],
                &[Some("mysql")],
                &[Some("performance_schema")],
                &[Some("sys")],
                &[Some("crm")],
            ],
        );
        let databases = list_databases(&executor, &options()).await.unwrap();
        assert_eq!(databases, vec!["shop", "crm"]);
    }

    #[tokio::test]
    async fn tables_are_limited_and_escaped() {
        let executor = ScriptedExecutor::new().on_rows(
            "information_schema.TABLES",
            &["name", "comment"],
            &[&[Some("orders"), Some("customer orders")], &[Some("users"), None]],
        );
        let tables = list_tables(&executor, &options(), "o'shop", 500).await.unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].comment, "");

        let executed = executor.executed_sql();
        assert!(executed[0].contains("TABLE_SCHEMA = 'o''shop'"));
        assert!(executed[0].ends_with("LIMIT 500"));
    }

    #[tokio::test]
    async fn columns_map_schema_fields() {
        let executor = ScriptedExecutor::new().on_rows(
            "information_schema.COLUMNS",
            &["name", "column_type", "nullable", "default_value", "column_key", "extra", "comment"],
            &[&[
                Some("id"),
                Some("int(11)"),
                Some("NO"),
                None,
                Some("PRI"),
                Some("auto_increment"),
                Some("row id"),
            ]],
        );
        let columns = list_columns(&executor, &options(), "shop", "orders").await.unwrap();
        assert_eq!(columns.len(), 1);
        assert!(columns[0].is_primary_key());
        assert!(!columns[0].nullable);
        assert_eq!(columns[0].default, None);
        assert_eq!(columns[0].comment, "row id");
    }

    #[tokio::test]
    async fn metadata_failure_is_an_error() {
        let executor = ScriptedExecutor::new().on_error("information_schema.COLUMNS", "denied");
        let err = list_columns(&executor, &options(), "shop", "orders")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Query(msg) if msg == "denied"));
    }

    #[tokio::test]
    async fn count_parses_first_cell() {
        let executor = ScriptedExecutor::new().on_rows(
            "COUNT(*)",
            &["total"],
            &[&[Some("42")]],
        );
        assert_eq!(count_rows(&executor, &options(), "shop", "orders").await.unwrap(), 42);
        assert!(count_rows(&executor, &options(), "shop", "bad name").await.is_err());
    }

    #[tokio::test]
    async fn structure_collects_keys_indexes_and_sample() {
        let executor = ScriptedExecutor::new()
            .on_rows(
                "information_schema.COLUMNS",
                &["name", "column_type", "nullable", "default_value", "column_key", "extra", "comment"],
                &[
                    &[Some("order_id"), Some("int"), Some("NO"), None, Some("PRI"), Some(""), Some("")],
                    &[Some("user_id"), Some("int"), Some("NO"), None, Some("MUL"), Some(""), Some("")],
                ],
            )
            .on_error("TABLE_COMMENT", "not allowed")
            .on_rows("CONSTRAINT_NAME = 'PRIMARY'", &["name"], &[&[Some("order_id")]])
            .on_rows(
                "REFERENCED_TABLE_NAME IS NOT NULL",
                &["column_name", "referenced_table", "referenced_column"],
                &[&[Some("user_id"), Some("users"), Some("id")]],
            )
            .on_rows(
                "information_schema.STATISTICS",
                &["index_name", "non_unique", "column_name"],
                &[
                    &[Some("idx_user"), Some("1"), Some("user_id")],
                    &[Some("uq_pair"), Some("0"), Some("order_id")],
                    &[Some("uq_pair"), Some("0"), Some("user_id")],
                ],
            )
            .on_rows("ORDER BY `order_id` DESC", &["order_id"], &[&[Some("9")]]);

        let structure = table_structure(&executor, &options(), "shop", "orders", 5)
            .await
            .unwrap();

        assert_eq!(structure.comment, None);
        assert_eq!(structure.primary_key, vec!["order_id"]);
        assert_eq!(structure.foreign_keys[0].referenced_table, "users");
        assert_eq!(structure.indexes.len(), 2);
        assert!(!structure.indexes[0].unique);
        assert!(structure.indexes[1].unique);
        assert_eq!(structure.indexes[1].columns, vec!["order_id", "user_id"]);
        assert_eq!(
            structure.sample_sql.as_deref(),
            Some("SELECT * FROM `shop`.`orders` ORDER BY `order_id` DESC LIMIT 5;")
        );
        assert_eq!(structure.sample.unwrap().len(), 1);
    }

    #[test]
    fn sample_falls_back_to_id_column_then_no_order() {
        let columns = vec![Column {
            name: "ID".to_string(),
            ..Column::default()
        }];
        assert_eq!(
            sample_sql("db", "t", &[], &columns, 5).as_deref(),
            Some("SELECT * FROM `db`.`t` ORDER BY `ID` DESC LIMIT 5;")
        );
        assert_eq!(
            sample_sql("db", "t", &[], &[], 5).as_deref(),
            Some("SELECT * FROM `db`.`t` LIMIT 5;")
        );
    }
}
