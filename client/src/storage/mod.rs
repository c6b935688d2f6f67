//! Flat string-keyed persistence with JSON values.

mod durable;
mod memory;

pub use durable::SledStore;
pub use memory::MemoryStore;

use crate::config::AppConfig;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// Key of the persisted signed-in user.
pub const SESSION_USER_KEY: &str = "currentSessionUser";
/// Key of the roster entries the user added (seed contacts excluded).
pub const ADDED_CONTACTS_KEY: &str = "userAddedContacts";
pub const PREFERENCES_KEY: &str = "userPreferences";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage backend failure: {0}")]
    Backend(String),
    #[error("stored value could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// A swappable key-value backend. Values are serialized JSON text.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

pub type SharedStore = Arc<dyn KeyValueStore>;

/// Open the backend named by the configuration.
pub fn open(config: &AppConfig) -> anyhow::Result<SharedStore> {
    match &config.data_dir {
        Some(path) => Ok(Arc::new(SledStore::open(path)?)),
        None => Ok(Arc::new(MemoryStore::new())),
    }
}

pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub fn save_json<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}

/// Read `key`, logging and falling back to the default when it is missing,
/// unreadable or corrupt.
pub fn load_or_default<T: DeserializeOwned + Default>(store: &dyn KeyValueStore, key: &str) -> T {
    match load_json(store, key) {
        Ok(value) => value.unwrap_or_default(),
        Err(err) => {
            warn!(key, error = %err, "ignoring unreadable stored value");
            T::default()
        }
    }
}

/// Write `key`, logging instead of propagating failures.
pub fn save_or_warn<T: Serialize + ?Sized>(store: &dyn KeyValueStore, key: &str, value: &T) {
    if let Err(err) = save_json(store, key, value) {
        warn!(key, error = %err, "failed to persist value");
    }
}

pub fn remove_or_warn(store: &dyn KeyValueStore, key: &str) {
    if let Err(err) = store.remove(key) {
        warn!(key, error = %err, "failed to remove stored value");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_values_fall_back_to_default() {
        let store = MemoryStore::new();
        store.set("numbers", "[1, 2,").unwrap();

        let numbers: Vec<u32> = load_or_default(&store, "numbers");
        assert!(numbers.is_empty());
        assert!(load_json::<Vec<u32>>(&store, "numbers").is_err());
    }

    #[test]
    fn json_helpers_roundtrip() {
        let store = MemoryStore::new();
        save_json(&store, "numbers", &[3u32, 1, 2]).unwrap();
        let numbers: Option<Vec<u32>> = load_json(&store, "numbers").unwrap();
        assert_eq!(numbers, Some(vec![3, 1, 2]));
        assert_eq!(load_json::<Vec<u32>>(&store, "missing").unwrap(), None);
    }

    #[test]
    fn open_without_data_dir_is_in_memory() {
        let store = open(&AppConfig::default()).unwrap();
        store.set("k", "\"v\"").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("\"v\""));
    }
}
