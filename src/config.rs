//! Configuration management for SciSummarize using the prefer crate.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default interval between notification refreshes (2 minutes).
pub const DEFAULT_NOTIFICATION_REFRESH_SECS: u64 = 120;

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Server origin, e.g. `https://scisummarize.example.org`.
    pub base_url: String,
    /// Path prefix every API endpoint lives under.
    pub api_prefix: String,
    /// Base data directory for persisted client state.
    pub data_dir: PathBuf,
    /// Key-value store filename.
    pub store_filename: String,
    /// User agent for HTTP requests.
    pub user_agent: String,
    /// Request timeout in seconds.
    pub request_timeout: u64,
    /// Default page size for paged listings.
    pub page_size: u32,
    /// Notification auto-refresh interval in seconds.
    pub notification_refresh_secs: u64,
    /// Delay before a dismissed notification is dropped, in milliseconds.
    pub dismiss_delay_ms: u64,
    /// CSRF token attached to mutating requests.
    pub csrf_token: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("scisummarize");

        Self {
            base_url: "http://localhost:8000".to_string(),
            api_prefix: "/api".to_string(),
            data_dir,
            store_filename: "client.db".to_string(),
            user_agent: format!("scisum/{}", env!("CARGO_PKG_VERSION")),
            request_timeout: 30,
            page_size: 10,
            notification_refresh_secs: DEFAULT_NOTIFICATION_REFRESH_SECS,
            dismiss_delay_ms: 300,
            csrf_token: None,
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Get the full path to the key-value store.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(&self.store_filename)
    }

    /// Base URL every endpoint is joined onto.
    pub fn api_base(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.api_prefix.trim_matches('/')
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn notification_refresh(&self) -> Duration {
        Duration::from_secs(self.notification_refresh_secs)
    }

    pub fn dismiss_delay(&self) -> Duration {
        Duration::from_millis(self.dismiss_delay_ms)
    }

    /// Ensure all directories exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.data_dir)
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_prefix: Option<String>,
    /// Directory for persisted client state.
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default)]
    pub store: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    #[serde(default)]
    pub request_timeout: Option<u64>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub notification_refresh_secs: Option<u64>,
    #[serde(default)]
    pub dismiss_delay_ms: Option<u64>,
    #[serde(default)]
    pub csrf_token: Option<String>,
}

impl Config {
    /// Load configuration using prefer crate.
    /// Automatically discovers scisummarize config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("scisummarize").await {
            Ok(pref_config) => {
                let base_url: Option<String> = pref_config.get("base_url").ok();
                let api_prefix: Option<String> = pref_config.get("api_prefix").ok();
                let data_dir: Option<String> = pref_config.get("data_dir").ok();
                let store: Option<String> = pref_config.get("store").ok();
                let user_agent: Option<String> = pref_config.get("user_agent").ok();
                let request_timeout: Option<u64> = pref_config.get("request_timeout").ok();
                let page_size: Option<u32> = pref_config.get("page_size").ok();
                let notification_refresh_secs: Option<u64> =
                    pref_config.get("notification_refresh_secs").ok();
                let dismiss_delay_ms: Option<u64> =
                    pref_config.get("dismiss_delay_ms").ok();
                let csrf_token: Option<String> = pref_config.get("csrf_token").ok();

                Config {
                    base_url,
                    api_prefix,
                    data_dir,
                    store,
                    user_agent,
                    request_timeout,
                    page_size,
                    notification_refresh_secs,
                    dismiss_delay_ms,
                    csrf_token,
                }
            }
            Err(e) => {
                tracing::debug!("No config file loaded ({}), using defaults", e);
                Self::default()
            }
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings) {
        if let Some(ref base_url) = self.base_url {
            settings.base_url = base_url.clone();
        }
        if let Some(ref prefix) = self.api_prefix {
            settings.api_prefix = prefix.clone();
        }
        if let Some(ref dir) = self.data_dir {
            let path = shellexpand::tilde(dir);
            settings.data_dir = PathBuf::from(path.as_ref());
        }
        if let Some(ref store) = self.store {
            settings.store_filename = store.clone();
        }
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = user_agent.clone();
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        if let Some(size) = self.page_size.filter(|s| *s > 0) {
            settings.page_size = size;
        }
        if let Some(secs) = self.notification_refresh_secs.filter(|s| *s > 0) {
            settings.notification_refresh_secs = secs;
        }
        if let Some(delay) = self.dismiss_delay_ms {
            settings.dismiss_delay_ms = delay;
        }
        if let Some(ref token) = self.csrf_token {
            settings.csrf_token = Some(token.clone());
        }
    }
}

/// Load settings from configuration (async version).
pub async fn load_settings() -> Settings {
    let config = Config::load().await;
    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings);
    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_base_joins_cleanly() {
        let mut settings = Settings::default();
        settings.base_url = "https://example.org/".to_string();
        settings.api_prefix = "/api/".to_string();
        assert_eq!(settings.api_base(), "https://example.org/api");
    }

    #[test]
    fn test_apply_overrides_only_present_values() {
        let mut settings = Settings::with_data_dir(PathBuf::from("/tmp/scisum"));
        let config = Config {
            base_url: Some("https://papers.example".to_string()),
            page_size: Some(0),
            request_timeout: Some(5),
            ..Default::default()
        };
        config.apply_to_settings(&mut settings);

        assert_eq!(settings.base_url, "https://papers.example");
        assert_eq!(settings.request_timeout, 5);
        // Zero page size is rejected
        assert_eq!(settings.page_size, 10);
        assert_eq!(settings.store_path(), PathBuf::from("/tmp/scisum/client.db"));
    }
}
