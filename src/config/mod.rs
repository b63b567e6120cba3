//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Client (initiator) configuration
    pub client: Option<ClientConfig>,
    /// Server (responder) configuration
    pub server: Option<ServerConfig>,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, crate::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), crate::Error> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| crate::Error::Config(format!("Failed to write config: {}", e)))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client: None,
            server: None,
            logging: LoggingConfig::default(),
        }
    }
}

fn default_rotation() -> u8 {
    crate::DEFAULT_ROTATION
}

fn default_connect_timeout() -> u64 {
    30
}

/// Client (initiator) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Local SOCKS listen addresses, one per transport method
    pub listen: Vec<String>,
    /// Rotation amount; must match the server's
    #[serde(default = "default_rotation")]
    pub rotation: u8,
    /// Destination connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl ClientConfig {
    /// Destination connect timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            listen: vec!["127.0.0.1:1080".to_string()],
            rotation: default_rotation(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// Server (responder) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Wire listen addresses, one per transport method
    pub listen: Vec<String>,
    /// Upstream relay endpoint every accepted connection is forwarded to
    pub upstream: String,
    /// Rotation amount; must match the client's
    #[serde(default = "default_rotation")]
    pub rotation: u8,
    /// Upstream connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl ServerConfig {
    /// Upstream connect timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: vec!["0.0.0.0:9045".to_string()],
            upstream: "127.0.0.1:9001".to_string(),
            rotation: default_rotation(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Generate example configuration
pub fn generate_example_config() -> Config {
    Config {
        client: Some(ClientConfig::default()),
        server: Some(ServerConfig::default()),
        logging: LoggingConfig::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_round_trip() {
        let config = generate_example_config();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let restored: Config = toml::from_str(&serialized).unwrap();

        let client = restored.client.unwrap();
        assert_eq!(client.listen, vec!["127.0.0.1:1080"]);
        assert_eq!(client.rotation, crate::DEFAULT_ROTATION);

        let server = restored.server.unwrap();
        assert_eq!(server.upstream, "127.0.0.1:9001");
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: Config = toml::from_str(
            r#"
            [server]
            listen = ["0.0.0.0:443"]
            upstream = "127.0.0.1:9001"
            "#,
        )
        .unwrap();

        let server = config.server.unwrap();
        assert_eq!(server.rotation, crate::DEFAULT_ROTATION);
        assert_eq!(server.connect_timeout_secs, 30);
        assert_eq!(config.logging.level, "info");
    }
}
