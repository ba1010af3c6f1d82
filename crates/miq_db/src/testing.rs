//! In-process [`Executor`] with canned responses, for tests without a server.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    connection::ConnectionOptions,
    error::{DbError, Result},
    executor::{Executor, QueryOutput, ResultSet, StatementResult},
};

#[derive(Debug, Clone)]
enum Response {
    Output(QueryOutput),
    ConnectError(String),
}

/// A call seen by [`ScriptedExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedQuery {
    pub database: Option<String>,
    pub sql: String,
}

/// Answers each script with the first registered response whose fragment
/// occurs in the SQL. Unmatched scripts succeed with no statements.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    responses: Vec<(String, Response)>,
    executed: Mutex<Vec<ExecutedQuery>>,
}

impl ScriptedExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_output(mut self, fragment: &str, output: QueryOutput) -> Self {
        self.responses
            .push((fragment.to_string(), Response::Output(output)));
        self
    }

    #[must_use]
    pub fn on_rows(
        self,
        fragment: &str,
        columns: &[&str],
        rows: &[&[Option<&str>]],
    ) -> Self {
        let set = ResultSet {
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|v| v.map(str::to_string)).collect())
                .collect(),
        };
        self.on_output(
            fragment,
            QueryOutput {
                statements: vec![StatementResult::Rows(set)],
                error: None,
            },
        )
    }

    #[must_use]
    pub fn on_affected(self, fragment: &str, rows_affected: u64) -> Self {
        self.on_output(
            fragment,
            QueryOutput {
                statements: vec![StatementResult::Affected {
                    rows_affected,
                    last_insert_id: 0,
                }],
                error: None,
            },
        )
    }

    /// The statement fails on the server.
    #[must_use]
    pub fn on_error(self, fragment: &str, message: &str) -> Self {
        self.on_output(
            fragment,
            QueryOutput {
                statements: Vec::new(),
                error: Some(message.to_string()),
            },
        )
    }

    /// The connection cannot be opened.
    #[must_use]
    pub fn on_connect_error(mut self, fragment: &str, message: &str) -> Self {
        self.responses.push((
            fragment.to_string(),
            Response::ConnectError(message.to_string()),
        ));
        self
    }

    #[must_use]
    pub fn executed(&self) -> Vec<ExecutedQuery> {
        self.executed
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn executed_sql(&self) -> Vec<String> {
        self.executed().into_iter().map(|q| q.sql).collect()
    }
}

#[async_trait]
impl Executor for ScriptedExecutor {
    async fn run(&self, options: &ConnectionOptions, sql: &str) -> Result<QueryOutput> {
        self.executed
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(ExecutedQuery {
                database: options.database.clone(),
                sql: sql.to_string(),
            });

        let response = self
            .responses
            .iter()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
            .map(|(_, response)| response.clone());

        match response {
            Some(Response::Output(output)) => Ok(output),
            Some(Response::ConnectError(message)) => Err(DbError::Connection(message)),
            None => Ok(QueryOutput::default()),
        }
    }
}
