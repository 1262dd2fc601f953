use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoraBridgeError {
    #[error("No route matches path: {0}")]
    RouteNotFound(String),

    #[error("Remote request timed out after {0}s")]
    RemoteTimeout(u64),

    #[error("Remote instance unreachable: {0}")]
    RemoteUnreachable(String),

    #[error("No remote_url configured (set remote_url in config.toml or LORABRIDGE_REMOTE_URL)")]
    RemoteNotConfigured,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Custom error: {0}")]
    Custom(String),
}

impl From<&str> for LoraBridgeError {
    fn from(msg: &str) -> Self {
        Self::Custom(msg.to_string())
    }
}

impl From<String> for LoraBridgeError {
    fn from(msg: String) -> Self {
        Self::Custom(msg)
    }
}

pub type Result<T> = std::result::Result<T, LoraBridgeError>;
