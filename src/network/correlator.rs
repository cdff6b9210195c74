//! Action/response correlation
//!
//! The protocol does not tag responses, so the only link between a request
//! and its answer is arrival order: the first chunk received after an
//! action is its response. The correlator therefore holds at most one
//! outstanding response slot.
//!
//! Every inbound chunk is also handed to the persistent observers
//! (subscriptions and callbacks), whether or not it resolved a slot.
//! Once the observers are closed, new subscriptions start out disconnected.

use std::time::Duration;

use bytes::Bytes;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::{Mutex, RwLock};

use crate::error::{RadiumError, Result};
use crate::protocol::{decode_response, ProtocolRevision, Response};

/// Callback observer for inbound chunks
pub type DataCallback = Box<dyn Fn(&Bytes) + Send + Sync>;

/// The one outstanding response listener
struct ResponseSlot {
    tx: Sender<Result<Response>>,
}

/// Pairs one outbound action with the next inbound chunk
pub struct Correlator {
    revision: ProtocolRevision,

    /// At most one listener; occupied from `register` until the next chunk
    slot: Mutex<Option<ResponseSlot>>,

    /// `None` once the transport has ended
    subscribers: Mutex<Option<Vec<Sender<Bytes>>>>,

    callbacks: RwLock<Vec<DataCallback>>,
}

impl Correlator {
    pub fn new(revision: ProtocolRevision) -> Self {
        Self {
            revision,
            slot: Mutex::new(None),
            subscribers: Mutex::new(Some(Vec::new())),
            callbacks: RwLock::new(Vec::new()),
        }
    }

    /// Register the listener for the next inbound chunk
    ///
    /// Fails with `ProtocolMisuse` while a previous response is outstanding.
    pub fn register(&self) -> Result<PendingResponse> {
        let mut slot = self.slot.lock();
        if slot.is_some() {
            return Err(RadiumError::ProtocolMisuse(
                "an action is already awaiting its response".to_string(),
            ));
        }

        let (tx, rx) = channel::bounded(1);
        *slot = Some(ResponseSlot { tx });
        Ok(PendingResponse { rx })
    }

    /// Drop the listener without resolving it (its send never happened)
    pub fn release(&self) {
        self.slot.lock().take();
    }

    /// Whether a response is outstanding
    pub fn is_pending(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Feed one inbound chunk
    pub fn dispatch(&self, chunk: Bytes) {
        if let Some(slot) = self.slot.lock().take() {
            let result = decode_response(self.revision, &chunk).map_err(RadiumError::from);
            if let Err(ref e) = result {
                tracing::debug!("Failed to decode response: {}", e);
            }
            // The waiter may already be gone; nobody else wants the result.
            let _ = slot.tx.send(result);
        }

        if let Some(subscribers) = self.subscribers.lock().as_mut() {
            subscribers.retain(|tx| tx.send(chunk.clone()).is_ok());
        }

        for callback in self.callbacks.read().iter() {
            callback(&chunk);
        }
    }

    /// Reject the outstanding response, if any
    pub fn fail_pending(&self, error: RadiumError) {
        if let Some(slot) = self.slot.lock().take() {
            let _ = slot.tx.send(Err(error));
        }
    }

    /// Persistent subscription to every inbound chunk
    ///
    /// After `close_observers` the receiver is returned already
    /// disconnected.
    pub fn subscribe(&self) -> Receiver<Bytes> {
        let (tx, rx) = channel::unbounded();
        match self.subscribers.lock().as_mut() {
            Some(subscribers) => subscribers.push(tx),
            None => drop(tx),
        }
        rx
    }

    /// Register a callback for every inbound chunk
    ///
    /// Callbacks run on the I/O thread and must not register observers.
    pub fn on_data<F>(&self, callback: F)
    where
        F: Fn(&Bytes) + Send + Sync + 'static,
    {
        self.callbacks.write().push(Box::new(callback));
    }

    /// Disconnect all subscriptions, current and future; their receivers
    /// see the end of stream
    pub fn close_observers(&self) {
        if self.subscribers.lock().take().is_some() {
            tracing::trace!("Observers closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.subscribers.lock().is_none()
    }
}

/// The future half of an action: resolves once with the decoded response
#[derive(Debug)]
pub struct PendingResponse {
    rx: Receiver<Result<Response>>,
}

impl PendingResponse {
    /// Block until the response arrives or the connection ends
    pub fn wait(self) -> Result<Response> {
        match self.rx.recv() {
            Ok(result) => result,
            Err(_) => Err(RadiumError::ConnectionClosed),
        }
    }

    /// Block for at most `timeout`
    ///
    /// A `Timeout` error leaves the request in flight; waiting again is fine.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<Response> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(RadiumError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(RadiumError::ConnectionClosed),
        }
    }

    /// Non-blocking check, `None` while still pending
    pub fn try_get(&self) -> Option<Result<Response>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(RadiumError::ConnectionClosed)),
        }
    }
}
