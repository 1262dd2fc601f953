//! Configuration management for lorabridge
//!
//! Handles loading and validation of application configuration from TOML
//! files, with environment variable overrides for the remote connection.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

/// Environment variable overriding `remote.url`.
pub const ENV_REMOTE_URL: &str = "LORABRIDGE_REMOTE_URL";
/// Environment variable overriding `remote.timeout_secs`.
pub const ENV_TIMEOUT: &str = "LORABRIDGE_TIMEOUT";

/// A single remote-to-local path prefix rewrite.
///
/// The remote reports absolute model paths from its own mount point; when the
/// local mount differs, the matching prefix is swapped. Mappings are matched
/// longest-prefix-first so nested mounts behave predictably.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathMapping {
    pub remote_prefix: String,
    pub local_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RemoteConfig {
    /// Base URL of the remote LoRA manager instance, e.g. <http://nas:8188>
    #[serde(default)]
    pub url: String,
    /// Total request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Ordered remote->local path prefix rewrites
    #[serde(default)]
    pub path_mappings: Vec<PathMapping>,
}

const fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL for cached list endpoints (seconds)
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
    /// Serve an expired cache entry when the refresh call fails.
    /// Off by default; every stale serve is logged and marked in the result.
    #[serde(default)]
    pub serve_stale_on_error: bool,
}

const fn default_cache_ttl_secs() -> u64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
            serve_stale_on_error: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Quiescence delay for the debounced text rewrite (milliseconds)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

const fn default_debounce_ms() -> u64 {
    250
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Also write a daily-rolling log file under `logs/`
    #[serde(default)]
    pub file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: false,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from the default config file locations.
    ///
    /// Tries `config.toml` then `config.example.toml`; a missing file is not
    /// an error; the gateway simply starts unconfigured and the proxy stays
    /// disabled until a remote URL is provided. Environment overrides
    /// ([`ENV_REMOTE_URL`], [`ENV_TIMEOUT`]) take precedence over file values.
    pub fn load() -> crate::Result<Self> {
        let mut config = if Path::new("config.toml").exists() {
            Self::from_file("config.toml")?
        } else if Path::new("config.example.toml").exists() {
            tracing::warn!("Using config.example.toml. Create config.toml for production use.");
            Self::from_file("config.example.toml")?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        config.remote.url = config.remote.url.trim_end_matches('/').to_string();
        Ok(config)
    }

    /// Load configuration from a specific TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> crate::Result<()> {
        if let Ok(url) = std::env::var(ENV_REMOTE_URL) {
            if !url.is_empty() {
                self.remote.url = url;
            }
        }
        if let Ok(timeout) = std::env::var(ENV_TIMEOUT) {
            if !timeout.is_empty() {
                self.remote.timeout_secs = timeout.parse().map_err(|_| {
                    crate::LoraBridgeError::ConfigError(format!(
                        "{ENV_TIMEOUT} must be an integer number of seconds, got '{timeout}'"
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Whether a remote URL has been provided.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.remote.url.is_empty()
    }

    /// Request timeout as a `Duration`.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.remote.timeout_secs)
    }

    /// Cache TTL as a `Duration`.
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    /// Debounce delay as a `Duration`.
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.sync.debounce_ms)
    }

    /// Apply the longest matching remote->local path prefix rewrite.
    ///
    /// Returns the input unchanged when no mapping matches, the common case
    /// where both sides share one mount point.
    #[must_use]
    pub fn translate_path(&self, remote_path: &str) -> String {
        let best = self
            .remote
            .path_mappings
            .iter()
            .filter(|m| remote_path.starts_with(&m.remote_prefix))
            .max_by_key(|m| m.remote_prefix.len());

        match best {
            Some(m) => format!("{}{}", m.local_prefix, &remote_path[m.remote_prefix.len()..]),
            None => remote_path.to_string(),
        }
    }
}
