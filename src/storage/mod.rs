//! Persisted client state.
//!
//! Holds the auth token, its optional expiry and the cached settings snapshot
//! under fixed keys. Survives restarts of the client, scoped to one data
//! directory.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{StorageError, StorageResult};

/// Key of the bearer token.
pub const AUTH_TOKEN_KEY: &str = "auth_token";
/// Key of the token expiry (RFC 3339).
pub const TOKEN_EXPIRATION_KEY: &str = "token_expiration";
/// Key of the cached settings snapshot (JSON).
pub const SETTINGS_KEY: &str = "scisummarize_settings";

/// String key-value storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;
}

impl dyn KeyValueStore {
    /// Read and decode a JSON value.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.get(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StorageError::Corrupt {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// Encode and write a JSON value.
    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> StorageResult<()> {
        let raw = serde_json::to_string(value).map_err(|e| StorageError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.set(key, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_json_helpers_round_trip_through_dyn() {
        let store: Box<dyn KeyValueStore> = Box::new(MemoryStore::new());
        let mut value = BTreeMap::new();
        value.insert("theme".to_string(), "dark".to_string());

        store.set_json(SETTINGS_KEY, &value).unwrap();
        let loaded: Option<BTreeMap<String, String>> = store.get_json(SETTINGS_KEY).unwrap();
        assert_eq!(loaded, Some(value));
    }

    #[test]
    fn test_corrupt_json_is_reported() {
        let store: Box<dyn KeyValueStore> = Box::new(MemoryStore::new());
        store.set(SETTINGS_KEY, "{not json").unwrap();
        let err = store
            .get_json::<serde_json::Value>(SETTINGS_KEY)
            .unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }
}
