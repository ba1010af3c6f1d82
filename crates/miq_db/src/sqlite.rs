//! Local storage for connection profiles and pinned tables.

use std::path::Path;

use rusqlite::{Connection as SqliteConnection, OptionalExtension, params};
use rusqlite_migration::{M, Migrations};

use crate::{connection::ConnectionProfile, error::Result};

fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        M::up(
            "CREATE TABLE IF NOT EXISTS connections (
                id TEXT PRIMARY KEY NOT NULL,
                host TEXT NOT NULL,
                user TEXT NOT NULL,
                port INTEGER NOT NULL CHECK( port BETWEEN 1 AND 65535 ),
                cert_path TEXT,
                display_name TEXT
            );",
        )
        .down("DROP TABLE connections"),
        M::up(
            "CREATE TABLE IF NOT EXISTS pinned_tables (
                position INTEGER PRIMARY KEY AUTOINCREMENT,
                table_key TEXT NOT NULL UNIQUE
            );",
        )
        .down("DROP TABLE pinned_tables"),
    ])
}

/// Open (creating if needed) and migrate the store at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or migrations fail.
pub fn open(path: &Path) -> Result<SqliteConnection> {
    let mut conn = SqliteConnection::open(path)?;
    migrations().to_latest(&mut conn)?;
    tracing::debug!(path = %path.display(), "opened profile store");
    Ok(conn)
}

/// # Errors
///
/// Returns an error if migrations fail.
pub fn open_in_memory() -> Result<SqliteConnection> {
    let mut conn = SqliteConnection::open_in_memory()?;
    migrations().to_latest(&mut conn)?;
    Ok(conn)
}

fn profile_from_row(row: &rusqlite::Row) -> rusqlite::Result<ConnectionProfile> {
    Ok(ConnectionProfile {
        id: row.get(0)?,
        host: row.get(1)?,
        user: row.get(2)?,
        port: row.get(3)?,
        cert_path: row.get(4)?,
        display_name: row.get(5)?,
    })
}

const PROFILE_COLUMNS: &str = "id, host, user, port, cert_path, display_name";

pub(crate) fn insert_profile(
    conn: &SqliteConnection,
    profile: &ConnectionProfile,
) -> Result<()> {
    conn.execute(
        "INSERT INTO connections (id, host, user, port, cert_path, display_name)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            profile.id,
            profile.host,
            profile.user,
            profile.port,
            profile.cert_path,
            profile.display_name,
        ],
    )?;
    Ok(())
}

/// Profiles in creation order.
pub(crate) fn list_profiles(
    conn: &SqliteConnection,
) -> Result<Vec<ConnectionProfile>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PROFILE_COLUMNS} FROM connections ORDER BY rowid"
    ))?;
    let profiles = stmt
        .query_map([], profile_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(profiles)
}

pub(crate) fn get_profile(
    conn: &SqliteConnection,
    id: &str,
) -> Result<Option<ConnectionProfile>> {
    Ok(conn
        .query_row(
            &format!("SELECT {PROFILE_COLUMNS} FROM connections WHERE id = ?1"),
            params![id],
            profile_from_row,
        )
        .optional()?)
}

/// Returns the number of rows removed.
pub(crate) fn delete_profile(conn: &SqliteConnection, id: &str) -> Result<usize> {
    Ok(conn.execute("DELETE FROM connections WHERE id = ?1", params![id])?)
}

/// Returns the number of rows updated.
pub(crate) fn update_display_name(
    conn: &SqliteConnection,
    id: &str,
    display_name: Option<&str>,
) -> Result<usize> {
    Ok(conn.execute(
        "UPDATE connections SET display_name = ?1 WHERE id = ?2",
        params![display_name, id],
    )?)
}

/// Pinned table keys in pin order.
pub(crate) fn pinned_keys(conn: &SqliteConnection) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT table_key FROM pinned_tables ORDER BY position")?;
    let keys = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(keys)
}

/// Returns whether the key was newly pinned.
pub(crate) fn insert_pin(conn: &SqliteConnection, key: &str) -> Result<bool> {
    Ok(conn.execute(
        "INSERT OR IGNORE INTO pinned_tables (table_key) VALUES (?1)",
        params![key],
    )? > 0)
}

/// Returns whether the key was pinned before.
pub(crate) fn delete_pin(conn: &SqliteConnection, key: &str) -> Result<bool> {
    Ok(conn.execute(
        "DELETE FROM pinned_tables WHERE table_key = ?1",
        params![key],
    )? > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_valid() {
        assert!(migrations().validate().is_ok());
    }

    #[test]
    fn pins_keep_order_and_ignore_duplicates() {
        let conn = open_in_memory().unwrap();
        assert!(insert_pin(&conn, "h:3306:db:b").unwrap());
        assert!(insert_pin(&conn, "h:3306:db:a").unwrap());
        assert!(!insert_pin(&conn, "h:3306:db:b").unwrap());
        assert_eq!(pinned_keys(&conn).unwrap(), vec!["h:3306:db:b", "h:3306:db:a"]);

        assert!(delete_pin(&conn, "h:3306:db:b").unwrap());
        assert!(!delete_pin(&conn, "h:3306:db:b").unwrap());
        assert_eq!(pinned_keys(&conn).unwrap(), vec!["h:3306:db:a"]);
    }
}
