//! Configuration loader for the relay.
//!
//! Reads `relay.toml` and deserializes it into [`RelayConfig`]. Falls back to
//! defaults when the file is missing or malformed. Command-line and
//! environment values are layered on top with [`ConfigOverrides`].

use std::path::{Path, PathBuf};

use relay_types::config::RelayConfig;

/// `<config dir>/relay/relay.toml`, e.g. `~/.config/relay/relay.toml` on Linux.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("relay").join("relay.toml"))
}

/// Load configuration from `path`.
///
/// - If the file does not exist, returns [`RelayConfig::default()`].
/// - If the file exists but fails to read or parse, logs a warning and returns the default.
pub async fn load_config(path: &Path) -> RelayConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return RelayConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return RelayConfig::default();
        }
    };

    match toml::from_str::<RelayConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            RelayConfig::default()
        }
    }
}

/// Values supplied on the command line or through the environment.
/// `None` leaves the file value in place.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub database_url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub idle_timeout_secs: Option<u64>,
    pub debug: bool,
}

impl ConfigOverrides {
    pub fn apply(self, config: &mut RelayConfig) {
        if let Some(base_url) = self.base_url {
            config.llm.base_url = base_url;
        }
        if let Some(model) = self.model {
            config.llm.model = model;
        }
        if let Some(temperature) = self.temperature {
            config.llm.temperature = temperature;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.llm.max_tokens = max_tokens;
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.llm.timeout_secs = timeout_secs;
        }
        if let Some(database_url) = self.database_url.filter(|url| !url.trim().is_empty()) {
            config.storage.database_url = Some(database_url);
        }
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(idle_timeout_secs) = self.idle_timeout_secs {
            config.session.idle_timeout_secs = idle_timeout_secs;
        }
        config.debug |= self.debug;
    }
}
