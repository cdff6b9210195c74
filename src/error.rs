//! Error types for the Radium client
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::protocol::ProtocolRevision;

/// Result type alias using RadiumError
pub type Result<T> = std::result::Result<T, RadiumError>;

/// Unified error type for Radium client operations
#[derive(Debug, Error)]
pub enum RadiumError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Connection Errors
    // -------------------------------------------------------------------------
    #[error("Failed to connect to {addr}: {reason}")]
    Connect { addr: String, reason: String },

    #[error("Connection is not ready yet")]
    NotConnected,

    /// `send`/`action` was called after `close()`
    #[error("Connection has been closed")]
    ClosedConnection,

    /// The transport ended while a response was still outstanding
    #[error("Connection closed before a response arrived")]
    ConnectionClosed,

    #[error("Timed out waiting for the server")]
    Timeout,

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Protocol misuse: {0}")]
    ProtocolMisuse(String),

    #[error("Entry data of {len} bytes exceeds the u16 length field")]
    DataLengthOverflow { len: usize },

    #[error("{what} is not supported by protocol {revision}")]
    Unsupported {
        what: String,
        revision: ProtocolRevision,
    },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failure to turn inbound bytes into a protocol value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("buffer too short: expected {expected} bytes, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    #[error("invalid {what}: 0x{value:02x}")]
    InvalidValue { what: &'static str, value: u8 },
}
