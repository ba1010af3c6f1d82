use thiserror::Error;

/// Errors produced by the database layer.
#[derive(Debug, Error)]
pub enum DbError {
    /// Could not open a connection (bad host, credentials or TLS setup)
    #[error("Connection error: {0}")]
    Connection(String),
    /// The server rejected a statement
    #[error("Error: {0}")]
    Query(String),
    /// Local profile storage failure
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("Storage migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),
    /// Password store failure
    #[error("Password error: {0}")]
    Secret(#[from] miq_auth::Error),
    #[error("Connection not found: {0}")]
    NotFound(String),
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = DbError> = std::result::Result<T, E>;
