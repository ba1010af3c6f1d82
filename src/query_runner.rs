use miq_db::{ConnectionOptions, DbError, Executor, QueryOutput, metadata, sql};

use crate::config::Config;

/// The parts of [`Config`] that shape how SQL is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuerySettings {
    pub enable_delimiter_operator: bool,
    pub default_limit: u64,
}

impl From<&Config> for QuerySettings {
    fn from(config: &Config) -> Self {
        Self {
            enable_delimiter_operator: config.enable_delimiter_operator,
            default_limit: config.default_limit,
        }
    }
}

/// A finished run, ready for a result panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRun {
    /// The SQL as sent, after rewriting
    pub sql: String,
    pub database: Option<String>,
    pub table: Option<String>,
    pub total: Option<u64>,
    pub output: QueryOutput,
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("No MySQL Server or Database selected")]
    NoConnection,
    #[error("No SQL to run")]
    NoSql,
    #[error(transparent)]
    Db(#[from] DbError),
}

impl RunError {
    /// Warnings are user mistakes rather than failures.
    #[must_use]
    pub const fn is_warning(&self) -> bool {
        matches!(self, Self::NoConnection | Self::NoSql)
    }
}

fn prepare<'a>(
    options: Option<&'a ConnectionOptions>,
    sql: &str,
    settings: QuerySettings,
) -> Result<(&'a ConnectionOptions, String), RunError> {
    let options = options.ok_or(RunError::NoConnection)?;
    if sql.trim().is_empty() {
        return Err(RunError::NoSql);
    }
    let sql = if settings.enable_delimiter_operator {
        sql::remove_delimiter_instructions(sql)
    } else {
        sql.to_string()
    };
    Ok((options, sql))
}

/// Run a script as written and keep every statement's result.
///
/// # Errors
///
/// A missing connection, empty SQL or a connection failure. Statement
/// failures are reported inside [`QueryOutput::error`].
pub async fn run_query<E: Executor + ?Sized>(
    executor: &E,
    options: Option<&ConnectionOptions>,
    sql: &str,
    settings: QuerySettings,
) -> Result<QueryRun, RunError> {
    let (options, sql) = prepare(options, sql, settings)?;
    tracing::info!(connection = %options, "running query");
    let output = executor.run(options, &sql).await?;
    Ok(QueryRun {
        sql,
        database: options.database.clone(),
        table: None,
        total: None,
        output,
    })
}

/// Run a browsing query: cap bare `SELECT`s, work out which table it reads
/// and count that table's rows before the query itself runs.
///
/// The database named in the SQL wins over `database`. The count is best
/// effort and left out when it fails.
///
/// # Errors
///
/// As [`run_query`].
pub async fn run_query_with_total<E: Executor + ?Sized>(
    executor: &E,
    options: Option<&ConnectionOptions>,
    sql: &str,
    database: Option<&str>,
    table: Option<&str>,
    settings: QuerySettings,
) -> Result<QueryRun, RunError> {
    let (options, sql) = prepare(options, sql, settings)?;
    let sql = sql::apply_default_limit(&sql, settings.default_limit);

    let parsed = sql::parse_table_from_sql(&sql);
    let database = parsed
        .database
        .or_else(|| database.map(str::to_string))
        .or_else(|| options.database.clone());
    let table = parsed.table.or_else(|| table.map(str::to_string));

    let total = match (&database, &table) {
        (Some(database), Some(table)) => {
            match metadata::count_rows(executor, options, database, table).await {
                Ok(total) => Some(total),
                Err(e) => {
                    tracing::debug!(database, table, error = %e, "row count unavailable");
                    None
                }
            }
        }
        _ => None,
    };

    tracing::info!(connection = %options, ?database, ?table, ?total, "running query");
    let output = executor.run(options, &sql).await?;
    Ok(QueryRun {
        sql,
        database,
        table,
        total,
        output,
    })
}

#[cfg(test)]
mod tests {
    use miq_db::testing::ScriptedExecutor;

    use super::*;

    const SETTINGS: QuerySettings = QuerySettings {
        enable_delimiter_operator: true,
        default_limit: 100,
    };

    fn options() -> ConnectionOptions {
        ConnectionOptions {
            host: "db.local".to_string(),
            user: "root".to_string(),
            port: 3306,
            ..ConnectionOptions::default()
        }
        .with_database("shop")
    }

    #[tokio::test]
    async fn missing_connection_and_empty_sql_are_warnings() {
        let executor = ScriptedExecutor::new();
        let err = run_query(&executor, None, "SELECT 1", SETTINGS).await.unwrap_err();
        assert_eq!(err.to_string(), "No MySQL Server or Database selected");
        assert!(err.is_warning());

        let err = run_query(&executor, Some(&options()), "  \n", SETTINGS)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No SQL to run");
        assert!(executor.executed().is_empty());
    }

    #[tokio::test]
    async fn delimiter_directives_are_stripped_when_enabled() {
        let executor = ScriptedExecutor::new();
        let script = "DELIMITER $$\nCREATE PROCEDURE p() BEGIN SELECT 1; END$$\nDELIMITER ;";

        let run = run_query(&executor, Some(&options()), script, SETTINGS)
            .await
            .unwrap();
        assert!(!run.sql.contains("DELIMITER"));
        assert!(run.sql.contains("END;"));

        let raw = QuerySettings {
            enable_delimiter_operator: false,
            ..SETTINGS
        };
        let run = run_query(&executor, Some(&options()), script, raw).await.unwrap();
        assert_eq!(run.sql, script);
    }

    #[tokio::test]
    async fn count_runs_before_the_limited_query() {
        let executor = ScriptedExecutor::new()
            .on_rows("COUNT(*)", &["total"], &[&[Some("1234")]])
            .on_rows("FROM `crm`.`leads`", &["id"], &[&[Some("1")]]);

        let run = run_query_with_total(
            &executor,
            Some(&options()),
            "SELECT * FROM `crm`.`leads`;",
            Some("shop"),
            None,
            SETTINGS,
        )
        .await
        .unwrap();

        assert_eq!(run.database.as_deref(), Some("crm"));
        assert_eq!(run.table.as_deref(), Some("leads"));
        assert_eq!(run.total, Some(1234));
        assert_eq!(run.sql, "SELECT * FROM `crm`.`leads` LIMIT 100");
        assert_eq!(
            executor.executed_sql(),
            vec![
                "SELECT COUNT(*) AS total FROM `crm`.`leads`;".to_string(),
                "SELECT * FROM `crm`.`leads` LIMIT 100".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn passed_database_is_the_fallback() {
        let executor = ScriptedExecutor::new()
            .on_error("COUNT(*)", "Table 'orders' doesn't exist");

        let run = run_query_with_total(
            &executor,
            Some(&options()),
            "select id from orders limit 5",
            Some("archive"),
            None,
            SETTINGS,
        )
        .await
        .unwrap();

        assert_eq!(run.database.as_deref(), Some("archive"));
        assert_eq!(run.table.as_deref(), Some("orders"));
        assert_eq!(run.total, None);
        assert_eq!(run.sql, "select id from orders limit 5");
    }

    #[tokio::test]
    async fn statement_errors_stay_in_the_output() {
        let executor = ScriptedExecutor::new().on_error("DELETE", "Unknown column 'x'");
        let run = run_query(&executor, Some(&options()), "DELETE FROM t WHERE x = 1", SETTINGS)
            .await
            .unwrap();
        assert_eq!(run.output.error.as_deref(), Some("Unknown column 'x'"));
    }

    #[tokio::test]
    async fn connection_failure_is_an_error() {
        let executor = ScriptedExecutor::new().on_connect_error("SELECT", "Access denied");
        let err = run_query(&executor, Some(&options()), "SELECT 1", SETTINGS)
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Db(DbError::Connection(_))));
        assert!(!err.is_warning());
    }
}
