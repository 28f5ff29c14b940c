//! Configuration system for the disturbdb CLI.
//!
//! A TOML file is read first, then environment overrides are applied:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `LOG_LEVEL` | `logging.level` |
//! | `DISTURBDB_LISTEN_ADDR` | `network.listen_addr` |
//! | `DISTURBDB_SECRET_KEY` | `node.secret_key` |

use disturbdb_core::logging::{LogLevel, ParseLogLevelError};
use disturbdb_core::node::{NodeConfig as CoreNodeConfig, RetryConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Log level override
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
/// Listen address override
pub const ENV_LISTEN_ADDR: &str = "DISTURBDB_LISTEN_ADDR";
/// Hex secret key override
pub const ENV_SECRET_KEY: &str = "DISTURBDB_SECRET_KEY";

/// disturbdb configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Node identity
    pub node: NodeSection,
    /// Network configuration
    pub network: NetworkSection,
    /// Connection limits
    pub limits: LimitsSection,
    /// Timeouts in milliseconds
    pub timeouts: TimeoutsSection,
    /// Logging configuration
    pub logging: LoggingSection,
}

/// Node identity configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NodeSection {
    /// Hex-encoded Ed25519 secret key; a fresh identity is generated if unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSection {
    /// Listen address
    pub listen_addr: String,
    /// Address placed in our peer record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advertise_addr: Option<String>,
    /// Peers dialed on startup (`host:port`)
    pub bootstrap: Vec<String>,
}

/// Connection limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsSection {
    /// Dial attempts per peer
    pub max_dial_attempts: u32,
    /// Inbound connection limit
    pub max_inbound_connections: usize,
    /// Outbound connection limit
    pub max_outbound_connections: usize,
    /// Largest accepted frame body in bytes
    pub max_recv_message_size: usize,
    /// Concurrent inbound handshakes
    pub num_workers: usize,
    /// Registry capacity (defaults to inbound + outbound)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_capacity: Option<usize>,
    /// Per-connection send queue length
    pub outbound_queue_size: usize,
}

/// Timeouts in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsSection {
    /// Idle connection timeout
    pub idle_ms: u64,
    /// Handshake timeout
    pub handshake_ms: u64,
    /// Per-attempt dial timeout
    pub dial_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level name (`debug`, `info`, `warn`, `error`, `critical`, `panic`)
    pub level: String,
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            listen_addr: CoreNodeConfig::default().listen_addr.to_string(),
            advertise_addr: None,
            bootstrap: Vec::new(),
        }
    }
}

impl Default for LimitsSection {
    fn default() -> Self {
        let core = CoreNodeConfig::default();
        Self {
            max_dial_attempts: core.max_dial_attempts,
            max_inbound_connections: core.max_inbound_connections,
            max_outbound_connections: core.max_outbound_connections,
            max_recv_message_size: core.max_recv_message_size,
            num_workers: core.num_workers,
            registry_capacity: core.registry_capacity,
            outbound_queue_size: core.outbound_queue_size,
        }
    }
}

impl Default for TimeoutsSection {
    fn default() -> Self {
        let core = CoreNodeConfig::default();
        Self {
            idle_ms: millis(core.idle_timeout),
            handshake_ms: millis(core.handshake_timeout),
            dial_ms: millis(core.dial_timeout),
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: LogLevel::default().as_str().to_lowercase(),
        }
    }
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from `path`, falling back to defaults if the file
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, contents)?;
        Ok(())
    }

    /// Get default config path
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("disturbdb/config.toml")
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`; empty values are ignored.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        if let Some(addr) = lookup(ENV_LISTEN_ADDR) {
            self.network.listen_addr = addr;
        }
        if let Some(secret) = lookup(ENV_SECRET_KEY) {
            self.node.secret_key = Some(secret);
        }
    }

    /// Parse the configured log level
    ///
    /// # Errors
    ///
    /// Returns the unknown name; callers fall back to [`LogLevel::Info`].
    pub fn log_level(&self) -> Result<LogLevel, ParseLogLevelError> {
        self.logging.level.parse()
    }

    /// Parse listen address as `SocketAddr`
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be parsed.
    pub fn parse_listen_addr(&self) -> anyhow::Result<SocketAddr> {
        self.network
            .listen_addr
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid listen address '{}': {e}", self.network.listen_addr))
    }

    /// Build the node configuration.
    ///
    /// An unknown log level maps to [`LogLevel::Info`].
    ///
    /// # Errors
    ///
    /// Returns an error if an address does not parse or the resulting node
    /// configuration is invalid.
    pub fn to_node_config(&self) -> anyhow::Result<CoreNodeConfig> {
        let advertise_addr = self
            .network
            .advertise_addr
            .as_deref()
            .map(|addr| {
                addr.parse::<SocketAddr>()
                    .map_err(|e| anyhow::anyhow!("invalid advertise address '{addr}': {e}"))
            })
            .transpose()?;

        let mut config = CoreNodeConfig {
            listen_addr: self.parse_listen_addr()?,
            advertise_addr,
            max_dial_attempts: self.limits.max_dial_attempts,
            max_inbound_connections: self.limits.max_inbound_connections,
            max_outbound_connections: self.limits.max_outbound_connections,
            max_recv_message_size: self.limits.max_recv_message_size,
            num_workers: self.limits.num_workers,
            idle_timeout: Duration::from_millis(self.timeouts.idle_ms),
            handshake_timeout: Duration::from_millis(self.timeouts.handshake_ms),
            dial_timeout: Duration::from_millis(self.timeouts.dial_ms),
            registry_capacity: self.limits.registry_capacity,
            outbound_queue_size: self.limits.outbound_queue_size,
            retry: RetryConfig::default(),
            ..Default::default()
        };
        config.logging.level = self.log_level().unwrap_or_default();

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.network.listen_addr, "0.0.0.0:3000");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.limits.max_dial_attempts, 3);
        assert!(config.node.secret_key.is_none());
    }

    #[test]
    fn test_default_converts_to_core_defaults() {
        let node = Config::default().to_node_config().unwrap();
        let core = CoreNodeConfig::default();

        assert_eq!(node.listen_addr, core.listen_addr);
        assert_eq!(node.idle_timeout, core.idle_timeout);
        assert_eq!(node.handshake_timeout, core.handshake_timeout);
        assert_eq!(node.registry_capacity(), core.registry_capacity());
        assert_eq!(node.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [network]
            listen_addr = "0.0.0.0:4000"

            [limits]
            max_inbound_connections = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.network.listen_addr, "0.0.0.0:4000");
        assert_eq!(config.limits.max_inbound_connections, 8);
        assert_eq!(config.limits.max_outbound_connections, 128);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env_with(env(&[
            (ENV_LOG_LEVEL, "debug"),
            (ENV_LISTEN_ADDR, "127.0.0.1:5000"),
            (ENV_SECRET_KEY, "ab"),
        ]));

        assert_eq!(config.log_level().unwrap(), LogLevel::Debug);
        assert_eq!(config.network.listen_addr, "127.0.0.1:5000");
        assert_eq!(config.node.secret_key.as_deref(), Some("ab"));
    }

    #[test]
    fn test_empty_env_values_ignored() {
        let mut config = Config::default();
        config.apply_env_with(env(&[(ENV_LOG_LEVEL, "  "), (ENV_LISTEN_ADDR, "")]));

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.network.listen_addr, "0.0.0.0:3000");
    }

    #[test]
    fn test_unknown_level_falls_back_to_info() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();

        assert!(config.log_level().is_err());
        assert_eq!(config.to_node_config().unwrap().logging.level, LogLevel::Info);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        config.network.listen_addr = "not an address".to_string();
        assert!(config.to_node_config().is_err());

        let mut config = Config::default();
        config.limits.num_workers = 0;
        assert!(config.to_node_config().is_err());

        let mut config = Config::default();
        config.network.advertise_addr = Some("10.0.0.1".to_string());
        assert!(config.to_node_config().is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.network.listen_addr, "0.0.0.0:3000");
    }

    #[test]
    fn test_load_malformed_file_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[network\nlisten_addr = ").unwrap();
        assert!(Config::load_or_default(file.path()).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let mut config = Config::default();
        config.network.advertise_addr = Some("10.0.0.5:3000".to_string());
        config.timeouts.idle_ms = 2500;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.network.advertise_addr, config.network.advertise_addr);
        assert_eq!(loaded.timeouts.idle_ms, 2500);
    }
}
