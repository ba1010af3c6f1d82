use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::DbError;

pub const DEFAULT_PORT: u16 = 3306;

/// A saved MySQL server. The password lives in the secret store under `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    pub id: String,
    pub host: String,
    pub user: String,
    pub port: u16,
    pub cert_path: Option<String>,
    pub display_name: Option<String>,
}

impl ConnectionProfile {
    /// Name shown in the tree: the display name, or the host when unset.
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.host)
    }
}

/// Everything the add-connection prompts collect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewConnection {
    pub display_name: String,
    pub host: String,
    pub user: String,
    pub password: String,
    pub port: String,
    pub cert_path: String,
}

impl NewConnection {
    /// Check required fields and parse the port.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidInput`] naming the first offending field.
    pub fn validate(&self) -> Result<u16, DbError> {
        if self.host.trim().is_empty() {
            return Err(DbError::InvalidInput("Host is required".to_string()));
        }
        if self.user.trim().is_empty() {
            return Err(DbError::InvalidInput("User is required".to_string()));
        }
        let port = self.port.trim();
        if port.is_empty() {
            return Ok(DEFAULT_PORT);
        }
        port.parse::<u16>().map_err(|_| {
            DbError::InvalidInput(format!("Invalid port: {port}"))
        })
    }
}

/// Options for opening one client connection.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct ConnectionOptions {
    pub host: String,
    pub user: String,
    pub password: String,
    pub port: u16,
    pub database: Option<String>,
    pub cert_path: Option<String>,
}

impl ConnectionOptions {
    #[must_use]
    pub fn from_profile(profile: &ConnectionProfile, password: String) -> Self {
        Self {
            host: profile.host.clone(),
            user: profile.user.clone(),
            password,
            port: profile.port,
            database: None,
            cert_path: profile.cert_path.clone(),
        }
    }

    #[must_use]
    pub fn with_database(&self, database: &str) -> Self {
        Self {
            database: Some(database.to_string()),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn table_key(&self, database: &str, table: &str) -> TableKey {
        TableKey {
            host: self.host.clone(),
            port: self.port,
            database: database.to_string(),
            table: table.to_string(),
        }
    }
}

impl std::fmt::Debug for ConnectionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionOptions")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"***")
            .field("port", &self.port)
            .field("database", &self.database)
            .field("cert_path", &self.cert_path)
            .finish()
    }
}

impl Display for ConnectionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}:{}", self.user, self.host, self.port)?;
        if let Some(database) = &self.database {
            write!(f, "/{database}")?;
        }
        Ok(())
    }
}

/// Identity of a physical table across all profiles: `host:port:database:table`.
/// IPv6 hosts are written in brackets, `[::1]:3306:shop:orders`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableKey {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub table: String,
}

impl Display for TableKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]", self.host)?;
        } else {
            f.write_str(&self.host)?;
        }
        write!(f, ":{}:{}:{}", self.port, self.database, self.table)
    }
}

impl FromStr for TableKey {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DbError::InvalidInput(format!("Invalid table key: {s}"));
        let (host, rest) = match s.strip_prefix('[') {
            Some(bracketed) => bracketed
                .split_once("]:")
                .ok_or_else(invalid)?,
            None => s.split_once(':').ok_or_else(invalid)?,
        };
        if host.is_empty() {
            return Err(invalid());
        }
        // Table names may contain ':' so split from the left a fixed number of times.
        let mut parts = rest.splitn(3, ':');
        let port = parts
            .next()
            .and_then(|p| p.parse::<u16>().ok())
            .ok_or_else(invalid)?;
        let database = parts.next().ok_or_else(invalid)?;
        let table = parts.next().ok_or_else(invalid)?;
        Ok(Self {
            host: host.to_string(),
            port,
            database: database.to_string(),
            table: table.to_string(),
        })
    }
}
