//! Configuration for the Radium client
//!
//! Centralized configuration with sensible defaults.

use crate::error::{RadiumError, Result};
use crate::protocol::{ConnectionMode, ProtocolRevision};

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 3126;

/// Client configuration for a single connection
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Endpoint Configuration
    // -------------------------------------------------------------------------
    /// Server host name or address
    pub host: String,

    /// Server TCP port
    pub port: u16,

    // -------------------------------------------------------------------------
    // Protocol Configuration
    // -------------------------------------------------------------------------
    /// Wire protocol revision spoken on this connection
    pub revision: ProtocolRevision,

    /// Handshake mode, only sent under `ProtocolRevision::V1`
    pub mode: ConnectionMode,

    // -------------------------------------------------------------------------
    // Socket Configuration
    // -------------------------------------------------------------------------
    /// Disable Nagle's algorithm
    pub nodelay: bool,

    /// Size of a single inbound read (one read = one data chunk)
    pub read_buffer_size: usize,

    /// Socket write timeout (milliseconds, 0 = none)
    ///
    /// Also bounds how long `Connection::close` can wait behind a stalled
    /// send.
    pub write_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            revision: ProtocolRevision::default(),
            mode: ConnectionMode::Action,
            nodelay: true,
            read_buffer_size: 4096,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// `host:port` string used for connecting and logging
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Reject settings the connection cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.read_buffer_size == 0 {
            return Err(RadiumError::Config(
                "read_buffer_size must be greater than zero".to_string(),
            ));
        }
        if self.host.is_empty() {
            return Err(RadiumError::Config("host must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the server host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the server port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the protocol revision
    pub fn revision(mut self, revision: ProtocolRevision) -> Self {
        self.config.revision = revision;
        self
    }

    /// Set the V1 handshake mode
    pub fn mode(mut self, mode: ConnectionMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Enable or disable TCP_NODELAY
    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.config.nodelay = nodelay;
        self
    }

    /// Set the inbound read size (in bytes)
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
