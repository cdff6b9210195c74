//! Network Module
//!
//! TCP client connection and request/response correlation.
//!
//! ## Architecture
//! - One I/O thread per connection reads inbound chunks
//! - Each chunk first resolves the outstanding response (if any),
//!   then reaches every observer
//! - Writes go out on the caller's thread

mod connection;
mod correlator;
mod signal;

pub use connection::{Connection, ConnectionState};
pub use correlator::{Correlator, DataCallback, PendingResponse};
pub use signal::ConnectedSignal;
