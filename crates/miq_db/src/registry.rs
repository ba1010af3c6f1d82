use std::path::Path;

use miq_auth::SecretStore;
use rusqlite::Connection as SqliteConnection;
use uuid::Uuid;

use crate::{
    connection::{ConnectionOptions, ConnectionProfile, NewConnection, TableKey},
    error::{DbError, Result},
    sqlite,
};

/// Saved connection profiles, their passwords and the pinned tables.
///
/// Profiles live in SQLite, passwords in a [`SecretStore`] under the
/// profile id. Adding and deleting keep both sides in step: the SQLite
/// change is only committed once the secret store agreed.
pub struct ConnectionRegistry<S: SecretStore> {
    db: SqliteConnection,
    secrets: S,
}

impl<S: SecretStore> ConnectionRegistry<S> {
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or migrated.
    pub fn open(path: &Path, secrets: S) -> Result<Self> {
        Ok(Self {
            db: sqlite::open(path)?,
            secrets,
        })
    }

    /// # Errors
    ///
    /// Returns an error if migrations fail.
    pub fn in_memory(secrets: S) -> Result<Self> {
        Ok(Self {
            db: sqlite::open_in_memory()?,
            secrets,
        })
    }

    /// Save a new profile and its password.
    ///
    /// # Errors
    ///
    /// Invalid drafts, storage failures, and secret store failures. In every
    /// error case no profile is left behind.
    pub fn add(&mut self, draft: &NewConnection) -> Result<ConnectionProfile> {
        let port = draft.validate()?;
        let non_empty = |s: &str| {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        };
        let profile = ConnectionProfile {
            id: Uuid::new_v4().to_string(),
            host: draft.host.trim().to_string(),
            user: draft.user.trim().to_string(),
            port,
            cert_path: non_empty(&draft.cert_path),
            display_name: non_empty(&draft.display_name),
        };

        let tx = self.db.transaction()?;
        sqlite::insert_profile(&tx, &profile)?;
        if !draft.password.is_empty() {
            self.secrets.set_password(&profile.id, &draft.password)?;
        }
        if let Err(e) = tx.commit() {
            if let Err(cleanup) = self.secrets.delete_password(&profile.id) {
                tracing::debug!(error = %cleanup, "no secret to clean up");
            }
            return Err(e.into());
        }

        tracing::info!(id = %profile.id, label = profile.label(), "added connection");
        Ok(profile)
    }

    /// Remove a profile and its password.
    ///
    /// A missing password is fine. Any other secret store failure aborts
    /// the deletion and the profile stays.
    ///
    /// # Errors
    ///
    /// [`DbError::NotFound`] for an unknown id, storage and secret store failures.
    pub fn delete(&mut self, id: &str) -> Result<()> {
        let tx = self.db.transaction()?;
        if sqlite::delete_profile(&tx, id)? == 0 {
            return Err(DbError::NotFound(id.to_string()));
        }
        match self.secrets.delete_password(id) {
            Ok(()) | Err(miq_auth::Error::NoEntry) => {}
            Err(e) => {
                tracing::error!(id, error = %e, "secret deletion failed, keeping profile");
                return Err(e.into());
            }
        }
        tx.commit()?;
        tracing::info!(id, "deleted connection");
        Ok(())
    }

    /// Change the display name. An empty name clears it.
    ///
    /// # Errors
    ///
    /// [`DbError::NotFound`] for an unknown id, or a storage failure.
    pub fn rename(&self, id: &str, display_name: &str) -> Result<()> {
        let display_name = Some(display_name.trim()).filter(|n| !n.is_empty());
        if sqlite::update_display_name(&self.db, id, display_name)? == 0 {
            return Err(DbError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// All profiles in creation order.
    ///
    /// # Errors
    ///
    /// Storage failure.
    pub fn list(&self) -> Result<Vec<ConnectionProfile>> {
        sqlite::list_profiles(&self.db)
    }

    /// # Errors
    ///
    /// [`DbError::NotFound`] for an unknown id, or a storage failure.
    pub fn get(&self, id: &str) -> Result<ConnectionProfile> {
        sqlite::get_profile(&self.db, id)?.ok_or_else(|| DbError::NotFound(id.to_string()))
    }

    /// The stored password, `None` when none was saved.
    ///
    /// # Errors
    ///
    /// Secret store failures other than a missing entry.
    pub fn password(&self, id: &str) -> Result<Option<String>> {
        match self.secrets.get_password(id) {
            Ok(password) => Ok(Some(password)),
            Err(miq_auth::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Connection options for a profile, resolving its password now.
    ///
    /// # Errors
    ///
    /// See [`ConnectionRegistry::password`].
    pub fn options(&self, profile: &ConnectionProfile) -> Result<ConnectionOptions> {
        let password = self.password(&profile.id)?.unwrap_or_default();
        Ok(ConnectionOptions::from_profile(profile, password))
    }

    /// Pinned tables in pin order. Unparseable keys are skipped.
    ///
    /// # Errors
    ///
    /// Storage failure.
    pub fn pinned_tables(&self) -> Result<Vec<TableKey>> {
        Ok(sqlite::pinned_keys(&self.db)?
            .into_iter()
            .filter_map(|key| {
                key.parse()
                    .map_err(|e| tracing::warn!(key, error = %e, "skipping pinned table"))
                    .ok()
            })
            .collect())
    }

    /// Pin a table. Pinning twice keeps a single entry.
    ///
    /// # Errors
    ///
    /// Storage failure.
    pub fn pin_table(&self, key: &TableKey) -> Result<bool> {
        sqlite::insert_pin(&self.db, &key.to_string())
    }

    /// # Errors
    ///
    /// Storage failure.
    pub fn unpin_table(&self, key: &TableKey) -> Result<bool> {
        sqlite::delete_pin(&self.db, &key.to_string())
    }

    /// # Errors
    ///
    /// Storage failure.
    pub fn is_pinned(&self, key: &TableKey) -> Result<bool> {
        Ok(self.pinned_tables()?.contains(key))
    }
}
