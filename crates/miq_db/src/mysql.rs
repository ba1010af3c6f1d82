use std::path::Path;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use sqlx::{
    Column as _, ConnectOptions, Connection, Either, Row, TypeInfo, ValueRef,
    mysql::{MySqlConnectOptions, MySqlConnection, MySqlQueryResult, MySqlRow, MySqlSslMode},
};

use crate::{
    connection::ConnectionOptions,
    error::{DbError, Result},
    executor::{Executor, QueryOutput, ResultSet, StatementResult},
};

/// MySQL executor. Opens one connection per call; there is no pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct MySql;

impl MySql {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn connect_options(options: &ConnectionOptions) -> MySqlConnectOptions {
        let mut connect = MySqlConnectOptions::new()
            .host(&options.host)
            .port(options.port)
            .username(&options.user)
            .password(&options.password);

        if let Some(database) = options.database.as_deref().filter(|d| !d.is_empty()) {
            connect = connect.database(database);
        }

        match options.cert_path.as_deref().filter(|p| !p.trim().is_empty()) {
            Some(cert) if Path::new(cert).is_file() => {
                connect.ssl_mode(MySqlSslMode::VerifyCa).ssl_ca(cert)
            }
            Some(cert) => {
                tracing::warn!(cert, "CA certificate not found, negotiating TLS without it");
                connect.ssl_mode(MySqlSslMode::Preferred)
            }
            None => connect.ssl_mode(MySqlSslMode::Preferred),
        }
    }

    async fn connect(options: &ConnectionOptions) -> Result<MySqlConnection> {
        Self::connect_options(options)
            .connect()
            .await
            .map_err(|e| {
                tracing::warn!(target = %options, error = %e, "connection failed");
                DbError::Connection(e.to_string())
            })
    }
}

#[async_trait]
impl Executor for MySql {
    async fn run(&self, options: &ConnectionOptions, sql: &str) -> Result<QueryOutput> {
        let mut conn = Self::connect(options).await?;
        tracing::debug!(target = %options, sql, "running script");

        #[allow(deprecated)]
        let output = {
            let stream = sqlx::raw_sql(sqlx::AssertSqlSafe(sql)).fetch_many(&mut conn);
            collect_statements(stream).await
        };

        // The script has fully drained before the connection is released.
        if let Err(e) = conn.close().await {
            tracing::warn!(error = %e, "failed to close connection cleanly");
        }

        if let Some(error) = &output.error {
            tracing::info!(target = %options, error, "statement failed");
        }
        Ok(output)
    }
}

async fn collect_statements<S>(mut stream: S) -> QueryOutput
where
    S: Stream<Item = Result<Either<MySqlQueryResult, MySqlRow>, sqlx::Error>> + Unpin,
{
    let mut statements = Vec::new();
    let mut current: Option<ResultSet> = None;

    while let Some(item) = stream.next().await {
        match item {
            Ok(Either::Right(row)) => {
                let set = current.get_or_insert_with(|| ResultSet::new(column_names(&row)));
                set.rows.push(row_values(&row));
            }
            Ok(Either::Left(done)) => {
                statements.push(current.take().map_or_else(
                    || StatementResult::Affected {
                        rows_affected: done.rows_affected(),
                        last_insert_id: done.last_insert_id(),
                    },
                    StatementResult::Rows,
                ));
            }
            Err(e) => {
                return QueryOutput {
                    statements,
                    error: Some(error_message(&e)),
                };
            }
        }
    }

    if let Some(set) = current {
        statements.push(StatementResult::Rows(set));
    }
    QueryOutput {
        statements,
        error: None,
    }
}

fn error_message(error: &sqlx::Error) -> String {
    error
        .as_database_error()
        .map_or_else(|| error.to_string(), |db| db.message().to_string())
}

fn column_names(row: &MySqlRow) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

fn row_values(row: &MySqlRow) -> Vec<Option<String>> {
    (0..row.columns().len()).map(|i| extract_value(row, i)).collect()
}

/// Render one cell as text, trying the decoders MySQL column types map onto.
fn extract_value(row: &MySqlRow, idx: usize) -> Option<String> {
    if row.try_get_raw(idx).map_or(true, |raw| raw.is_null()) {
        return None;
    }

    if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(idx) {
        return Some(v.to_string());
    }
    if let Ok(Some(v)) = row.try_get::<Option<u64>, _>(idx) {
        return Some(v.to_string());
    }
    if let Ok(Some(v)) = row.try_get::<Option<i32>, _>(idx) {
        return Some(v.to_string());
    }
    if let Ok(Some(v)) = row.try_get::<Option<u32>, _>(idx) {
        return Some(v.to_string());
    }
    if let Ok(Some(v)) = row.try_get::<Option<i16>, _>(idx) {
        return Some(v.to_string());
    }
    if let Ok(Some(v)) = row.try_get::<Option<u16>, _>(idx) {
        return Some(v.to_string());
    }
    if let Ok(Some(v)) = row.try_get::<Option<i8>, _>(idx) {
        return Some(v.to_string());
    }
    if let Ok(Some(v)) = row.try_get::<Option<u8>, _>(idx) {
        return Some(v.to_string());
    }
    if let Ok(Some(v)) = row.try_get::<Option<rust_decimal::Decimal>, _>(idx) {
        return Some(v.to_string());
    }
    if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
        return Some(v.to_string());
    }
    if let Ok(Some(v)) = row.try_get::<Option<f32>, _>(idx) {
        return Some(v.to_string());
    }
    if let Ok(Some(v)) = row.try_get::<Option<String>, _>(idx) {
        return Some(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx) {
        return Some(v.format("%Y-%m-%d %H:%M:%S").to_string());
    }
    if let Ok(Some(v)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
        return Some(v.format("%Y-%m-%d %H:%M:%S").to_string());
    }
    if let Ok(Some(v)) = row.try_get::<Option<chrono::NaiveDate>, _>(idx) {
        return Some(v.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(v)) = row.try_get::<Option<chrono::NaiveTime>, _>(idx) {
        return Some(v.format("%H:%M:%S").to_string());
    }
    if let Ok(Some(v)) = row.try_get::<Option<serde_json::Value>, _>(idx) {
        return Some(v.to_string());
    }
    if let Ok(Some(v)) = row.try_get_unchecked::<Option<Vec<u8>>, _>(idx) {
        return Some(
            String::from_utf8(v).unwrap_or_else(|e| format!("<{} bytes>", e.as_bytes().len())),
        );
    }

    row.columns()
        .get(idx)
        .map(|c| format!("<{}>", c.type_info().name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(cert_path: Option<String>) -> ConnectionOptions {
        ConnectionOptions {
            host: "127.0.0.1".to_string(),
            user: "root".to_string(),
            password: "pw".to_string(),
            port: 3307,
            database: Some("shop".to_string()),
            cert_path,
        }
    }

    #[test]
    fn connect_options_carry_profile_fields() {
        let connect = MySql::connect_options(&options(None));
        assert_eq!(connect.get_host(), "127.0.0.1");
        assert_eq!(connect.get_port(), 3307);
        assert_eq!(connect.get_username(), "root");
        assert_eq!(connect.get_database(), Some("shop"));
        assert!(matches!(connect.get_ssl_mode(), MySqlSslMode::Preferred));
    }

    #[test]
    fn existing_certificate_requires_verified_ca() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("ca.pem");
        std::fs::write(&cert, "-----BEGIN CERTIFICATE-----").unwrap();

        let connect =
            MySql::connect_options(&options(Some(cert.to_string_lossy().into_owned())));
        assert!(matches!(connect.get_ssl_mode(), MySqlSslMode::VerifyCa));

        let missing = MySql::connect_options(&options(Some(
            dir.path().join("missing.pem").to_string_lossy().into_owned(),
        )));
        assert!(matches!(missing.get_ssl_mode(), MySqlSslMode::Preferred));
    }
}
