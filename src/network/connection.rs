//! Client Connection
//!
//! Owns the TCP socket to a Radium server.
//!
//! ## Threading
//! - `start` (or `connect`) spawns one I/O thread that connects, performs the handshake
//!   (V1) and then reads inbound chunks until the socket ends
//! - Writes happen on the caller's thread, serialized by the writer lock
//! - Waiting (`connected()`, `PendingResponse::wait`) blocks only the caller

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use crossbeam::channel::Receiver;
use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{RadiumError, Result};
use crate::protocol::{encode_u8, Action, ProtocolRevision, Response};
use super::correlator::{Correlator, PendingResponse};
use super::signal::{ConnectOutcome, ConnectedSignal};

/// Lifecycle of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closed,
}

/// State shared between the caller and the I/O thread
struct Shared {
    config: Config,

    /// Lock order: `state` before `writer`
    state: Mutex<ConnectionState>,

    /// Write half; `None` until connected and again after close
    writer: Mutex<Option<TcpStream>>,

    correlator: Correlator,
}

/// A client connection to a Radium server
pub struct Connection {
    shared: Arc<Shared>,
    connected: ConnectedSignal,
}

impl Connection {
    /// Create a connection without touching the network
    ///
    /// The connection stays `Disconnected` until `start` is called; actions
    /// sent before then fail with `NotConnected`.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let shared = Arc::new(Shared {
            correlator: Correlator::new(config.revision),
            config,
            state: Mutex::new(ConnectionState::Disconnected),
            writer: Mutex::new(None),
        });

        Ok(Self {
            shared,
            connected: ConnectedSignal::new(),
        })
    }

    /// Spawn the I/O thread and begin connecting
    ///
    /// Returns immediately; use `connected()` to learn when actions can be
    /// sent. A connection can be started once.
    pub fn start(&self) -> Result<()> {
        let mut state = self.shared.state.lock();
        match *state {
            ConnectionState::Disconnected => {}
            ConnectionState::Closed => return Err(RadiumError::ClosedConnection),
            _ => {
                return Err(RadiumError::ProtocolMisuse(
                    "connection already started".to_string(),
                ))
            }
        }

        let addr = self.shared.config.addr();
        tracing::debug!("Connecting to {}", addr);

        let io_shared = Arc::clone(&self.shared);
        let io_signal = self.connected.clone();
        let spawned = thread::Builder::new()
            .name(format!("radium-io-{}", addr))
            .spawn(move || run_io(io_shared, io_signal));

        if let Err(e) = spawned {
            *state = ConnectionState::Closed;
            drop(state);
            self.connected.fire(ConnectOutcome::Failed {
                addr,
                reason: e.to_string(),
            });
            self.shared.correlator.close_observers();
            return Err(e.into());
        }

        *state = ConnectionState::Connecting;
        Ok(())
    }

    /// Start connecting to the configured server
    ///
    /// Same as `new` followed by `start`.
    pub fn connect(config: Config) -> Result<Self> {
        let connection = Self::new(config)?;
        connection.start()?;
        Ok(connection)
    }

    /// Connect and block until the connection is ready
    pub fn open(config: Config) -> Result<Self> {
        let connection = Self::connect(config)?;
        connection.connected().wait()?;
        Ok(connection)
    }

    /// Single-fire signal for "ready to send actions"
    pub fn connected(&self) -> ConnectedSignal {
        self.connected.clone()
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.lock()
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    pub fn revision(&self) -> ProtocolRevision {
        self.shared.config.revision
    }

    /// Serialize `action` and write it to the socket as one contiguous send
    ///
    /// Does not wait for, or claim, any response.
    pub fn send(&self, action: Action) -> Result<()> {
        let mut writer = self.shared.writer.lock();
        if writer.is_none() {
            drop(writer);
            return Err(self.unavailable());
        }

        let bytes = action.encode(self.revision())?;
        if let Some(stream) = writer.as_mut() {
            stream.write_all(&bytes)?;
            stream.flush()?;
        }

        tracing::trace!("Sent {:?} ({} bytes) to {}", action, bytes.len(), self.shared.config.addr());
        Ok(())
    }

    /// Send `action` and claim the next inbound chunk as its response
    ///
    /// The listener is registered before the bytes are written, so an
    /// immediate reply cannot be missed. Only one action may be outstanding;
    /// a second call before the first resolves fails with `ProtocolMisuse`.
    pub fn action(&self, action: Action) -> Result<PendingResponse> {
        let pending = self.shared.correlator.register()?;

        if let Err(e) = self.send(action) {
            self.shared.correlator.release();
            return Err(e);
        }

        Ok(pending)
    }

    /// `action` followed by a blocking wait for the response
    pub fn request(&self, action: Action) -> Result<Response> {
        self.action(action)?.wait()
    }

    /// Like `request`, but gives up waiting after `timeout`
    pub fn request_timeout(&self, action: Action, timeout: Duration) -> Result<Response> {
        self.action(action)?.wait_timeout(timeout)
    }

    /// Receive every inbound chunk, including server pushes
    ///
    /// The receiver reports disconnection once the transport ends.
    pub fn subscribe(&self) -> Receiver<Bytes> {
        self.shared.correlator.subscribe()
    }

    /// Run `callback` on the I/O thread for every inbound chunk
    pub fn on_data<F>(&self, callback: F)
    where
        F: Fn(&Bytes) + Send + Sync + 'static,
    {
        self.shared.correlator.on_data(callback);
    }

    /// Close the connection
    ///
    /// Under V1 the `Close` action is sent first. An outstanding response is
    /// rejected with `ConnectionClosed` and subscriptions are disconnected.
    /// Closing twice is a no-op.
    ///
    /// Closing takes the writer lock, so it waits for a `send` already in
    /// progress on another thread. That send is bounded by
    /// `Config::write_timeout_ms`; with a timeout of 0 it is not.
    pub fn close(&self) -> Result<()> {
        let previous = {
            let mut state = self.shared.state.lock();
            std::mem::replace(&mut *state, ConnectionState::Closed)
        };
        if previous == ConnectionState::Closed {
            return Ok(());
        }

        let mut result = Ok(());
        if let Some(mut stream) = self.shared.writer.lock().take() {
            if self.revision().supports_close() {
                result = Action::Close
                    .encode(self.revision())
                    .and_then(|bytes| stream.write_all(&bytes).map_err(RadiumError::from));
            }
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                if e.kind() != ErrorKind::NotConnected {
                    tracing::debug!("Socket shutdown failed: {}", e);
                }
            }
        }

        self.shared.correlator.fail_pending(RadiumError::ConnectionClosed);
        self.shared.correlator.close_observers();
        tracing::debug!("Connection to {} closed", self.shared.config.addr());
        result
    }

    fn unavailable(&self) -> RadiumError {
        match self.state() {
            ConnectionState::Closed => RadiumError::ClosedConnection,
            _ => RadiumError::NotConnected,
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("addr", &self.shared.config.addr())
            .field("revision", &self.revision())
            .field("state", &self.state())
            .finish()
    }
}

// =============================================================================
// I/O Thread
// =============================================================================

fn run_io(shared: Arc<Shared>, signal: ConnectedSignal) {
    let addr = shared.config.addr();

    let (stream, reader) = match establish(&shared.config) {
        Ok(pair) => pair,
        Err(e) => {
            tracing::warn!("Connection to {} failed: {}", addr, e);
            finish(&shared);
            signal.fire(ConnectOutcome::Failed {
                addr,
                reason: e.to_string(),
            });
            return;
        }
    };

    {
        let mut state = shared.state.lock();
        if *state == ConnectionState::Closed {
            let _ = stream.shutdown(Shutdown::Both);
            drop(state);
            finish(&shared);
            signal.fire(ConnectOutcome::Closed);
            return;
        }
        *shared.writer.lock() = Some(stream);
        *state = ConnectionState::Connected;
    }

    tracing::debug!("Connected to {} ({})", addr, shared.config.revision);
    signal.fire(ConnectOutcome::Ready);

    read_loop(&shared, reader);
    finish(&shared);
}

/// Connect, configure the socket and perform the V1 handshake
fn establish(config: &Config) -> Result<(TcpStream, TcpStream)> {
    let mut stream = TcpStream::connect(config.addr())?;

    stream.set_nodelay(config.nodelay)?;
    if config.write_timeout_ms > 0 {
        stream.set_write_timeout(Some(Duration::from_millis(config.write_timeout_ms)))?;
    }

    if config.revision.has_handshake() {
        stream.write_all(&encode_u8(config.mode.as_u8()))?;
        tracing::debug!("Sent handshake, mode {:?}", config.mode);
    }

    let reader = stream.try_clone()?;
    Ok((stream, reader))
}

fn read_loop(shared: &Shared, mut stream: TcpStream) {
    let mut buf = vec![0u8; shared.config.read_buffer_size];

    loop {
        match stream.read(&mut buf) {
            Ok(0) => {
                tracing::debug!("Server {} closed the connection", shared.config.addr());
                return;
            }
            Ok(n) => {
                tracing::trace!("Received {} bytes from {}", n, shared.config.addr());
                shared.correlator.dispatch(Bytes::copy_from_slice(&buf[..n]));
            }
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                if *shared.state.lock() == ConnectionState::Closed {
                    tracing::debug!("Reader stopped after close: {}", e);
                } else {
                    tracing::warn!("Error reading from {}: {}", shared.config.addr(), e);
                }
                return;
            }
        }
    }
}

/// Tear down after the transport ended, from either side
fn finish(shared: &Shared) {
    {
        let mut state = shared.state.lock();
        *state = ConnectionState::Closed;
        shared.writer.lock().take();
    }
    shared.correlator.fail_pending(RadiumError::ConnectionClosed);
    shared.correlator.close_observers();
}
