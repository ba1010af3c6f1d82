use async_trait::async_trait;

use crate::{
    connection::ConnectionOptions,
    error::{DbError, Result},
};

/// One row set. NULL cells are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl ResultSet {
    #[must_use]
    pub const fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Cell of `row` under the column called `name` (case-insensitive).
    #[must_use]
    pub fn value(&self, row: usize, name: &str) -> Option<&str> {
        let column = self.column_index(name)?;
        self.rows.get(row)?.get(column)?.as_deref()
    }

    /// Every value of one column, NULLs skipped.
    #[must_use]
    pub fn column_values(&self, name: &str) -> Vec<&str> {
        let Some(column) = self.column_index(name) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter_map(|row| row.get(column).and_then(Option::as_deref))
            .collect()
    }

    #[must_use]
    pub fn first_value(&self) -> Option<&str> {
        self.rows.first()?.first()?.as_deref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Outcome of one statement in a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementResult {
    Rows(ResultSet),
    Affected {
        rows_affected: u64,
        last_insert_id: u64,
    },
}

/// Everything a script produced. Statements that completed before a failure
/// are kept; `error` holds the failing statement's message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOutput {
    pub statements: Vec<StatementResult>,
    pub error: Option<String>,
}

impl QueryOutput {
    #[must_use]
    pub fn result_sets(&self) -> Vec<&ResultSet> {
        self.statements
            .iter()
            .filter_map(|s| match s {
                StatementResult::Rows(set) => Some(set),
                StatementResult::Affected { .. } => None,
            })
            .collect()
    }

    /// First row set, or an empty one when the script returned none.
    #[must_use]
    pub fn into_first_rows(self) -> ResultSet {
        self.statements
            .into_iter()
            .find_map(|s| match s {
                StatementResult::Rows(set) => Some(set),
                StatementResult::Affected { .. } => None,
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn total_affected(&self) -> u64 {
        self.statements
            .iter()
            .map(|s| match s {
                StatementResult::Affected { rows_affected, .. } => *rows_affected,
                StatementResult::Rows(_) => 0,
            })
            .sum()
    }
}

/// Runs SQL against a server. Every call is independent: implementations
/// open a connection, run the whole script and release the connection.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run a script, possibly containing several `;`-separated statements.
    ///
    /// # Errors
    ///
    /// Only connection failures are errors. Statement failures are
    /// reported through [`QueryOutput::error`].
    async fn run(&self, options: &ConnectionOptions, sql: &str) -> Result<QueryOutput>;

    /// Run and return the first row set, treating any statement failure as an error.
    ///
    /// # Errors
    ///
    /// Connection failures, or [`DbError::Query`] when a statement failed.
    async fn query(&self, options: &ConnectionOptions, sql: &str) -> Result<ResultSet> {
        let output = self.run(options, sql).await?;
        if let Some(error) = output.error {
            return Err(DbError::Query(error));
        }
        Ok(output.into_first_rows())
    }

    /// Check that the server accepts the options.
    ///
    /// # Errors
    ///
    /// Same as [`Executor::query`].
    async fn test(&self, options: &ConnectionOptions) -> Result<()> {
        self.query(options, "SELECT 1").await.map(|_| ())
    }
}

#[async_trait]
impl<T: Executor + ?Sized> Executor for std::sync::Arc<T> {
    async fn run(&self, options: &ConnectionOptions, sql: &str) -> Result<QueryOutput> {
        (**self).run(options, sql).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> ResultSet {
        ResultSet {
            columns: vec!["ID".to_string(), "name".to_string()],
            rows: vec![
                vec![Some("1".to_string()), Some("a".to_string())],
                vec![Some("2".to_string()), None],
            ],
        }
    }

    #[test]
    fn column_lookup_ignores_case() {
        let set = set();
        assert_eq!(set.column_index("id"), Some(0));
        assert_eq!(set.value(0, "NAME"), Some("a"));
        assert_eq!(set.value(1, "name"), None);
        assert_eq!(set.column_values("name"), vec!["a"]);
        assert_eq!(set.first_value(), Some("1"));
    }

    #[test]
    fn first_rows_skips_affected_statements() {
        let output = QueryOutput {
            statements: vec![
                StatementResult::Affected {
                    rows_affected: 3,
                    last_insert_id: 0,
                },
                StatementResult::Rows(set()),
            ],
            error: None,
        };
        assert_eq!(output.total_affected(), 3);
        assert_eq!(output.result_sets().len(), 1);
        assert_eq!(output.into_first_rows(), set());
    }
}
