//! folio.toml configuration parser.
//!
//! Secrets and deployment-specific paths can be overridden from the
//! environment (`FOLIO_*`). Missing required values are reported together
//! by [`FolioConfig::validate`], which the daemon treats as fatal.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default bound on every document-store and blob-store call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("missing required configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FolioConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Prefix every API route is mounted under.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// redb database file.
    pub path: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Directory blobs are written to.
    pub root: Option<PathBuf>,
    /// Public URL prefix under which stored blobs are served.
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Argon2 PHC string the admin password is checked against.
    pub login_hash: Option<String>,
}

fn default_listen() -> String {
    "0.0.0.0:9000".to_string()
}

fn default_api_prefix() -> String {
    "/v1/api".to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            api_prefix: default_api_prefix(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl FolioConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply `FOLIO_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup (the environment in production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(path) = lookup("FOLIO_STORE_PATH") {
            self.store.path = Some(PathBuf::from(path));
        }
        if let Some(root) = lookup("FOLIO_MEDIA_ROOT") {
            self.media.root = Some(PathBuf::from(root));
        }
        if let Some(url) = lookup("FOLIO_MEDIA_BASE_URL") {
            self.media.base_url = Some(url);
        }
        if let Some(hash) = lookup("FOLIO_LOGIN_HASH") {
            self.auth.login_hash = Some(hash);
        }
    }

    /// Check that every required value is present.
    ///
    /// `persistent` is false when the daemon runs on in-memory backends, in
    /// which case the store path and media root are not needed.
    pub fn validate(&self, persistent: bool) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if persistent && self.store.path.is_none() {
            missing.push("store.path");
        }
        if persistent && self.media.root.is_none() {
            missing.push("media.root");
        }
        if self.media.base_url.as_deref().is_none_or(str::is_empty) {
            missing.push("media.base_url");
        }
        if self.auth.login_hash.as_deref().is_none_or(str::is_empty) {
            missing.push("auth.login_hash");
        }
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        if self.store.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "store.timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if !self.server.api_prefix.is_empty() && !self.server.api_prefix.starts_with('/') {
            return Err(ConfigError::Invalid {
                key: "server.api_prefix",
                reason: "must start with '/'".to_string(),
            });
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.store.timeout_secs)
    }

    /// Media base URL without a trailing slash.
    pub fn media_base_url(&self) -> &str {
        self.media
            .base_url
            .as_deref()
            .unwrap_or_default()
            .trim_end_matches('/')
    }

    /// Scaffold a starter folio.toml rooted at `data_dir`.
    pub fn scaffold(data_dir: &Path) -> Self {
        FolioConfig {
            server: ServerConfig::default(),
            store: StoreConfig {
                path: Some(data_dir.join("folio.redb")),
                timeout_secs: DEFAULT_TIMEOUT_SECS,
            },
            media: MediaConfig {
                root: Some(data_dir.join("media")),
                base_url: Some("http://localhost:8080/media".to_string()),
            },
            auth: AuthConfig { login_hash: None },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_minimal() {
        let config = FolioConfig::from_toml_str(
            r#"
[store]
path = "/var/lib/folio/folio.redb"

[media]
root = "/var/lib/folio/media"
base_url = "https://cdn.example.com/"

[auth]
login_hash = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA"
"#,
        )
        .unwrap();

        assert_eq!(config.server.listen, "0.0.0.0:9000");
        assert_eq!(config.server.api_prefix, "/v1/api");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.media_base_url(), "https://cdn.example.com");
        config.validate(true).unwrap();
    }

    #[test]
    fn test_missing_values_reported_together() {
        let config = FolioConfig::default();
        let err = config.validate(true).unwrap_err();
        match err {
            ConfigError::Missing(keys) => assert_eq!(
                keys,
                vec!["store.path", "media.root", "media.base_url", "auth.login_hash"]
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_in_memory_mode_needs_no_paths() {
        let mut config = FolioConfig::default();
        config.media.base_url = Some("http://localhost/media".to_string());
        config.auth.login_hash = Some("hash".to_string());
        config.validate(false).unwrap();
        assert!(config.validate(true).is_err());
    }

    #[test]
    fn test_overrides_win_and_ignore_empty_values() {
        let env = HashMap::from([
            ("FOLIO_STORE_PATH", "/tmp/override.redb"),
            ("FOLIO_LOGIN_HASH", "from-env"),
            ("FOLIO_MEDIA_BASE_URL", ""),
        ]);
        let mut config = FolioConfig::scaffold(Path::new("/data"));
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.store.path, Some(PathBuf::from("/tmp/override.redb")));
        assert_eq!(config.auth.login_hash.as_deref(), Some("from-env"));
        assert_eq!(config.media_base_url(), "http://localhost:8080/media");
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = FolioConfig::scaffold(Path::new("/data"));
        config.auth.login_hash = Some("hash".to_string());
        config.store.timeout_secs = 0;
        assert!(matches!(
            config.validate(true),
            Err(ConfigError::Invalid { key: "store.timeout_secs", .. })
        ));
    }

    #[test]
    fn test_scaffold_round_trips_through_toml() {
        let config = FolioConfig::scaffold(Path::new("/srv/folio"));
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("/srv/folio/folio.redb"));
        let parsed = FolioConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed.media.root, Some(PathBuf::from("/srv/folio/media")));
    }
}
