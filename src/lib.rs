//! # Radium
//!
//! Client for the Radium control protocol, a small binary TCP protocol for
//! commanding a remote watcher/notifier service:
//! - Ping the server
//! - Request closure
//! - Toggle watch mode, after which the server pushes data unprompted
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Caller                                │
//! │        action(Ping) / subscribe() / connected()              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     Connection                               │
//! │          (TCP socket, handshake, close, state)               │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │ send                             │ inbound chunks
//!            ▼                                  ▼
//!   ┌─────────────────┐               ┌──────────────────┐
//!   │   Wire Codec    │               │    Correlator    │
//!   │ (Action encode) │               │ (one slot + obs) │
//!   └─────────────────┘               └──────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use radium::{Action, Config, Connection};
//!
//! let conn = Connection::open(Config::default())?;
//! let response = conn.request(Action::Ping)?;
//! println!("received {}", response.value());
//! conn.close()?;
//! # Ok::<(), radium::RadiumError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{DecodeError, RadiumError, Result};
pub use config::Config;
pub use network::{Connection, ConnectionState, PendingResponse};
pub use protocol::{Action, ConnectionMode, ProtocolRevision, Response, WatchMode};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the Radium client
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
