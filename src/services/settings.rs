//! User settings: server copy first, local cache second, defaults last.

use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::UsersApi;
use crate::error::ApiError;
use crate::state::{merge_settings, merge_with_defaults, UserSettings};
use crate::storage::{KeyValueStore, SETTINGS_KEY};

/// Where loaded settings came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsSource {
    Server,
    Cache,
    Defaults,
}

/// Result of a save. The settings are applied locally either way; a server
/// failure is carried alongside.
#[derive(Debug, Clone)]
pub struct SavedSettings {
    pub settings: UserSettings,
    pub server_error: Option<ApiError>,
}

#[derive(Clone)]
pub struct SettingsService {
    api: UsersApi,
    store: Arc<dyn KeyValueStore>,
    current: Arc<RwLock<UserSettings>>,
}

impl SettingsService {
    pub fn new(api: UsersApi, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            api,
            store,
            current: Arc::new(RwLock::new(UserSettings::default())),
        }
    }

    pub fn current(&self) -> UserSettings {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn apply(&self, settings: &UserSettings) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = settings.clone();
    }

    fn cache(&self, settings: &UserSettings) {
        if let Err(e) = self.store.set_json(SETTINGS_KEY, settings) {
            warn!("Could not cache settings: {}", e);
        }
    }

    fn cached(&self) -> Option<Value> {
        match self.store.get_json::<Value>(SETTINGS_KEY) {
            Ok(value) => value,
            Err(e) => {
                warn!("Ignoring unreadable cached settings: {}", e);
                None
            }
        }
    }

    /// Load settings, always ending up with a fully populated value.
    pub async fn load(&self) -> (UserSettings, SettingsSource) {
        let (settings, source) = match self.api.settings().await {
            Ok(remote) => {
                let settings = merge_with_defaults(&remote);
                self.cache(&settings);
                (settings, SettingsSource::Server)
            }
            Err(e) => {
                debug!("Server settings unavailable ({}), trying local cache", e);
                match self.cached() {
                    Some(local) => (merge_with_defaults(&local), SettingsSource::Cache),
                    None => (UserSettings::default(), SettingsSource::Defaults),
                }
            }
        };
        self.apply(&settings);
        (settings, source)
    }

    /// Merge `partial` over the current settings, then save remotely and
    /// locally. A server failure still leaves the merged settings applied and
    /// cached.
    pub async fn save(&self, partial: &Value) -> SavedSettings {
        let settings = merge_settings(&self.current(), partial);
        self.apply(&settings);
        self.cache(&settings);

        let server_error = match self.api.update_settings(&settings.to_value()).await {
            Ok(()) => {
                info!("Settings saved");
                None
            }
            Err(e) => {
                warn!("Settings saved locally only: {}", e);
                Some(e)
            }
        };
        SavedSettings {
            settings,
            server_error,
        }
    }

    /// Put every setting back to its default.
    pub async fn reset(&self) -> SavedSettings {
        self.apply(&UserSettings::default());
        self.save(&Value::Object(Default::default())).await
    }

    /// Set one value by dotted path, e.g. `displayPreferences.compactView`.
    pub async fn set_path(&self, path: &str, value: Value) -> SavedSettings {
        self.save(&partial_from_path(path, value)).await
    }
}

/// `("a.b", v)` -> `{"a": {"b": v}}`.
pub fn partial_from_path(path: &str, value: Value) -> Value {
    path.rsplit('.')
        .filter(|part| !part.is_empty())
        .fold(value, |inner, part| {
            let mut map = serde_json::Map::new();
            map.insert(part.to_string(), inner);
            Value::Object(map)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_partial_from_path_nests() {
        assert_eq!(
            partial_from_path("displayPreferences.compactView", json!(true)),
            json!({"displayPreferences": {"compactView": true}})
        );
        assert_eq!(partial_from_path("theme", json!("dark")), json!({"theme": "dark"}));
    }
}
