pub mod connection;
pub mod error;
pub mod executor;
pub mod metadata;
pub mod mysql;
pub mod registry;
pub mod sql;
pub mod sqlite;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use connection::{
    ConnectionOptions, ConnectionProfile, DEFAULT_PORT, NewConnection, TableKey,
};
pub use error::{DbError, Result};
pub use executor::{Executor, QueryOutput, ResultSet, StatementResult};
pub use metadata::{ForeignKey, Index, TableStructure};
pub use mysql::MySql;
pub use registry::ConnectionRegistry;

/// Schemas that ship with every server and are hidden from the tree.
pub const SYSTEM_DATABASES: [&str; 4] =
    ["information_schema", "mysql", "performance_schema", "sys"];

/// A table as listed under a database node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub comment: String,
}

/// A column as listed under a table node, in ordinal order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub column_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    /// `PRI`, `UNI`, `MUL` or empty
    pub key: String,
    pub extra: String,
    pub comment: String,
}

impl Column {
    #[must_use]
    pub fn is_primary_key(&self) -> bool {
        self.key.eq_ignore_ascii_case("PRI")
    }
}

/// Location of the `miq.db` file, creating the data directory when needed.
///
/// # Errors
///
/// Fails when no home directory can be determined or it cannot be created.
pub fn get_db_path() -> Result<std::path::PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "miq").ok_or_else(|| {
        DbError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "could not determine data directory",
        ))
    })?;
    let data_dir = dirs.data_dir();
    std::fs::create_dir_all(data_dir)?;
    Ok(data_dir.join("miq.db"))
}
