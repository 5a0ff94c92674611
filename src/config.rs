//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;
use crate::Result;
use crate::error::Error;

/// GitHub authorization endpoint
pub const GITHUB_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";

/// GitHub public user-info endpoint
pub const GITHUB_USER_URL: &str = "https://api.github.com/user";

/// Environment variable holding the OAuth app client id
pub const CLIENT_ID_ENV: &str = "GITHUB_CLIENT_ID";

/// Environment variable overriding the redirect URI
pub const REDIRECT_URI_ENV: &str = "GITHUB_REDIRECT_URI";

/// OAuth session configuration
///
/// Passed explicitly into the controller; nothing in the flow reads
/// ambient browser or process state on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// OAuth app client id. Sign-in refuses to navigate without it.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Fixed redirect URI. Derived from the current URL when unset.
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// Space separated scopes requested from the provider
    #[serde(default = "default_scope")]
    pub scope: String,

    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,

    #[serde(default = "default_user_info_url")]
    pub user_info_url: String,

    /// Upper bound on the profile fetch before falling back to a demo profile
    #[serde(default = "default_exchange_timeout_secs")]
    pub exchange_timeout_secs: u64,

    /// Reject callbacks whose `state` does not match the one sent
    #[serde(default = "default_verify_state")]
    pub verify_state: bool,

    /// File backing durable storage for the CLI
    #[serde(default)]
    pub storage_path: Option<PathBuf>,
}

fn default_scope() -> String {
    "read:user user:email".to_string()
}

fn default_authorize_url() -> String {
    GITHUB_AUTHORIZE_URL.to_string()
}

fn default_user_info_url() -> String {
    GITHUB_USER_URL.to_string()
}

fn default_exchange_timeout_secs() -> u64 {
    5
}

fn default_verify_state() -> bool {
    true
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            redirect_uri: None,
            scope: default_scope(),
            authorize_url: default_authorize_url(),
            user_info_url: default_user_info_url(),
            exchange_timeout_secs: default_exchange_timeout_secs(),
            verify_state: default_verify_state(),
            storage_path: None,
        }
    }
}

impl AuthConfig {
    /// Configuration with the given client id and defaults elsewhere
    pub fn with_client_id(client_id: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            ..Self::default()
        }
    }

    /// Client id, treating an empty or blank value as absent
    pub fn client_id(&self) -> Option<&str> {
        self.client_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Redirect URI to send to the provider for a page currently at `current`
    pub fn redirect_uri_for(&self, current: &Url) -> String {
        match self.redirect_uri.as_deref().filter(|uri| !uri.is_empty()) {
            Some(uri) => uri.to_string(),
            None => derive_redirect_uri(current),
        }
    }

    pub fn exchange_timeout(&self) -> Duration {
        Duration::from_secs(self.exchange_timeout_secs)
    }

    /// Storage file, defaulting to `~/.octoauth/storage.json`
    pub fn storage_path(&self) -> PathBuf {
        self.storage_path
            .clone()
            .unwrap_or_else(|| config_dir().join("storage.json"))
    }

    /// Apply `GITHUB_CLIENT_ID` / `GITHUB_REDIRECT_URI` overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(CLIENT_ID_ENV).ok(),
            std::env::var(REDIRECT_URI_ENV).ok(),
        );
    }

    fn apply_overrides(&mut self, client_id: Option<String>, redirect_uri: Option<String>) {
        if let Some(id) = client_id.filter(|v| !v.trim().is_empty()) {
            self.client_id = Some(id);
        }
        if let Some(uri) = redirect_uri.filter(|v| !v.trim().is_empty()) {
            self.redirect_uri = Some(uri);
        }
    }
}

/// Redirect back to the auth view when the user is on it, otherwise to the root
///
/// The fragment is kept so hash-routed views survive the round trip.
pub fn derive_redirect_uri(current: &Url) -> String {
    let origin = current.origin().ascii_serialization();
    let fragment = current.fragment().unwrap_or("");

    if current.path().contains("auth") || fragment.contains("auth") {
        let mut uri = format!("{}{}", origin, current.path());
        if !fragment.is_empty() {
            uri.push('#');
            uri.push_str(fragment);
        }
        uri
    } else {
        format!("{}/", origin)
    }
}

/// Get the config directory path
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".octoauth")
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Load configuration from the default location, then apply the environment
pub fn load() -> Result<AuthConfig> {
    load_from(&config_path())
}

/// Load configuration from `path`, then apply the environment
///
/// A missing file yields the defaults.
pub fn load_from(path: &Path) -> Result<AuthConfig> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config at {:?}: {}", path, e)))?
    } else {
        tracing::debug!("No config at {:?}, using defaults", path);
        AuthConfig::default()
    };

    config.apply_env();
    Ok(config)
}

/// Save configuration to file
pub fn save(config: &AuthConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AuthConfig::default();
        assert_eq!(config.scope, "read:user user:email");
        assert_eq!(config.exchange_timeout_secs, 5);
        assert!(config.verify_state);
        assert!(config.client_id().is_none());
    }

    #[test]
    fn test_blank_client_id_is_missing() {
        let config = AuthConfig::with_client_id("   ");
        assert!(config.client_id().is_none());

        let config = AuthConfig::with_client_id("Iv1.abc");
        assert_eq!(config.client_id(), Some("Iv1.abc"));
    }

    #[test]
    fn test_redirect_uri_keeps_auth_view() {
        let current = Url::parse("https://demo.example.com/showcase/#auth").unwrap();
        assert_eq!(
            derive_redirect_uri(&current),
            "https://demo.example.com/showcase/#auth"
        );
    }

    #[test]
    fn test_redirect_uri_falls_back_to_root() {
        let current = Url::parse("http://localhost:5173/charts?x=1#chartjs").unwrap();
        assert_eq!(derive_redirect_uri(&current), "http://localhost:5173/");
    }

    #[test]
    fn test_explicit_redirect_uri_wins() {
        let config = AuthConfig {
            redirect_uri: Some("http://127.0.0.1:8085/".to_string()),
            ..AuthConfig::default()
        };
        let current = Url::parse("https://demo.example.com/#auth").unwrap();
        assert_eq!(config.redirect_uri_for(&current), "http://127.0.0.1:8085/");
    }

    #[test]
    fn test_overrides_ignore_blank_values() {
        let mut config = AuthConfig::with_client_id("from-file");
        config.apply_overrides(Some(String::new()), Some("http://localhost/".to_string()));
        assert_eq!(config.client_id(), Some("from-file"));
        assert_eq!(config.redirect_uri.as_deref(), Some("http://localhost/"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = AuthConfig {
            client_id: Some("Iv1.saved".to_string()),
            exchange_timeout_secs: 2,
            ..AuthConfig::default()
        };
        save(&config, &path).unwrap();

        let loaded = load_from(&path).unwrap();
        assert_eq!(loaded.exchange_timeout_secs, 2);
        assert!(loaded.client_id().is_some());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"verify_state": false}"#).unwrap();

        let loaded = load_from(&path).unwrap();
        assert!(!loaded.verify_state);
        assert_eq!(loaded.authorize_url, GITHUB_AUTHORIZE_URL);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();

        let err = load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
