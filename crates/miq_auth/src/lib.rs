use std::{collections::HashMap, sync::Mutex};

pub use keyring::Error;
use keyring::Entry;

const SERVICE_NAME: &str = "miq";

/// Storage for connection passwords, addressed by connection id.
///
/// A missing secret is reported as [`Error::NoEntry`].
pub trait SecretStore: Send + Sync {
    fn set_password(&self, id: &str, password: &str) -> Result<(), Error>;
    fn get_password(&self, id: &str) -> Result<String, Error>;
    fn delete_password(&self, id: &str) -> Result<(), Error>;
}

/// Platform keyring (macOS keychain, Windows credential manager, Secret Service).
#[derive(Debug, Default, Clone, Copy)]
pub struct Keyring;

impl Keyring {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn entry(id: &str) -> Result<Entry, Error> {
        Entry::new(SERVICE_NAME, id)
    }
}

impl SecretStore for Keyring {
    fn set_password(&self, id: &str, password: &str) -> Result<(), Error> {
        Self::entry(id)?.set_password(password)
    }

    fn get_password(&self, id: &str) -> Result<String, Error> {
        Self::entry(id)?.get_password()
    }

    fn delete_password(&self, id: &str) -> Result<(), Error> {
        let result = Self::entry(id)?.delete_credential();
        if let Err(e) = &result {
            tracing::warn!(id, error = %e, "failed to delete keyring entry");
        }
        result
    }
}

/// Secrets kept in process memory only. Used when the platform keyring is
/// unavailable and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    secrets: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_secrets<R>(
        &self,
        f: impl FnOnce(&mut HashMap<String, String>) -> R,
    ) -> R {
        let mut guard = self
            .secrets
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut guard)
    }
}

impl SecretStore for MemoryStore {
    fn set_password(&self, id: &str, password: &str) -> Result<(), Error> {
        self.with_secrets(|secrets| {
            secrets.insert(id.to_string(), password.to_string());
        });
        Ok(())
    }

    fn get_password(&self, id: &str) -> Result<String, Error> {
        self.with_secrets(|secrets| secrets.get(id).cloned())
            .ok_or(Error::NoEntry)
    }

    fn delete_password(&self, id: &str) -> Result<(), Error> {
        self.with_secrets(|secrets| secrets.remove(id))
            .map(|_| ())
            .ok_or(Error::NoEntry)
    }
}

impl<T: SecretStore + ?Sized> SecretStore for Box<T> {
    fn set_password(&self, id: &str, password: &str) -> Result<(), Error> {
        (**self).set_password(id, password)
    }

    fn get_password(&self, id: &str) -> Result<String, Error> {
        (**self).get_password(id)
    }

    fn delete_password(&self, id: &str) -> Result<(), Error> {
        (**self).delete_password(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_and_deletes() {
        let store = MemoryStore::new();
        store.set_password("abc", "hunter2").unwrap();
        assert_eq!(store.get_password("abc").unwrap(), "hunter2");

        store.delete_password("abc").unwrap();
        assert!(matches!(store.get_password("abc"), Err(Error::NoEntry)));
    }

    #[test]
    fn deleting_missing_secret_reports_no_entry() {
        let store = MemoryStore::new();
        assert!(matches!(store.delete_password("nope"), Err(Error::NoEntry)));
    }

    #[test]
    fn set_overwrites_previous_password() {
        let store = MemoryStore::new();
        store.set_password("id", "one").unwrap();
        store.set_password("id", "two").unwrap();
        assert_eq!(store.get_password("id").unwrap(), "two");
    }
}
