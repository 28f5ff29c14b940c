//! Node configuration

use crate::logging::LogLevel;
use crate::message::NONCE_SIZE;
use crate::node::error::{NodeError, Result};
use std::borrow::Cow;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Default listening port
pub const DEFAULT_PORT: u16 = 3000;

/// Node configuration
///
/// Plain data; the node never reads the environment itself. Loading from
/// files and environment variables happens in the CLI.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Listen address for incoming connections
    pub listen_addr: SocketAddr,

    /// Address placed in the node's own peer record.
    ///
    /// Defaults to the bound listen address. A port of 0 is replaced by the
    /// port actually bound.
    pub advertise_addr: Option<SocketAddr>,

    /// TCP connect attempts per dial before giving up
    pub max_dial_attempts: u32,

    /// Maximum concurrent inbound connections
    pub max_inbound_connections: usize,

    /// Maximum concurrent outbound connections
    pub max_outbound_connections: usize,

    /// Largest frame body accepted from a peer
    pub max_recv_message_size: usize,

    /// Concurrent inbound handshakes
    pub num_workers: usize,

    /// Close connections with no traffic for this long
    pub idle_timeout: Duration,

    /// Upper bound on the whole handshake exchange
    pub handshake_timeout: Duration,

    /// Timeout of a single TCP connect attempt
    pub dial_timeout: Duration,

    /// Connection registry capacity (defaults to inbound + outbound limits)
    pub registry_capacity: Option<usize>,

    /// Per-connection outbound queue length
    pub outbound_queue_size: usize,

    /// Backoff between dial attempts
    pub retry: RetryConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            advertise_addr: None,
            max_dial_attempts: 3,
            max_inbound_connections: 128,
            max_outbound_connections: 128,
            max_recv_message_size: 4 * 1024 * 1024, // 4 MiB
            num_workers: 4,
            idle_timeout: Duration::from_secs(10),
            handshake_timeout: Duration::from_secs(5),
            dial_timeout: Duration::from_secs(3),
            registry_capacity: None,
            outbound_queue_size: 256,
            retry: RetryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Effective registry capacity
    pub fn registry_capacity(&self) -> usize {
        self.registry_capacity.unwrap_or_else(|| {
            self.max_inbound_connections
                .saturating_add(self.max_outbound_connections)
        })
    }

    /// Check the configuration for values the node cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::InvalidConfig`] describing the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.num_workers == 0 {
            return Err(invalid("num_workers must be at least 1"));
        }
        if self.max_dial_attempts == 0 {
            return Err(invalid("max_dial_attempts must be at least 1"));
        }
        if self.registry_capacity() == 0 {
            return Err(invalid("registry capacity must be at least 1"));
        }
        if self.max_recv_message_size < NONCE_SIZE {
            return Err(NodeError::InvalidConfig(Cow::Owned(format!(
                "max_recv_message_size must be at least {NONCE_SIZE} bytes"
            ))));
        }
        if self.outbound_queue_size == 0 {
            return Err(invalid("outbound_queue_size must be at least 1"));
        }
        if self.idle_timeout.is_zero() {
            return Err(invalid("idle_timeout must be non-zero"));
        }
        Ok(())
    }
}

const fn invalid(reason: &'static str) -> NodeError {
    NodeError::InvalidConfig(Cow::Borrowed(reason))
}

/// Exponential backoff between dial attempts
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Initial backoff duration
    pub initial_backoff: Duration,

    /// Maximum backoff duration
    pub max_backoff: Duration,

    /// Backoff multiplier
    pub multiplier: f64,

    /// Add random jitter to prevent thundering herd
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Calculate backoff duration for attempt number
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base = self.initial_backoff.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped = base.min(self.max_backoff.as_millis() as f64);

        let duration = if self.jitter {
            // Add up to 25% jitter
            use getrandom::getrandom;
            let mut buf = [0u8; 4];
            let _ = getrandom(&mut buf);
            let jitter_factor = (u32::from_le_bytes(buf) % 25) as f64 / 100.0;
            capped * (1.0 + jitter_factor)
        } else {
            capped
        };

        Duration::from_millis(duration as u64)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// Log level
    pub level: LogLevel,
}
