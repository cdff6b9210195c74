//! Connected signal
//!
//! A single-fire latch that any number of threads can wait on.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{RadiumError, Result};

/// How the connect attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConnectOutcome {
    Ready,
    Failed { addr: String, reason: String },
    /// `close()` won the race against the connect
    Closed,
}

impl ConnectOutcome {
    fn to_result(&self) -> Result<()> {
        match self {
            ConnectOutcome::Ready => Ok(()),
            ConnectOutcome::Failed { addr, reason } => Err(RadiumError::Connect {
                addr: addr.clone(),
                reason: reason.clone(),
            }),
            ConnectOutcome::Closed => Err(RadiumError::ClosedConnection),
        }
    }
}

struct Latch {
    outcome: Mutex<Option<ConnectOutcome>>,
    cond: Condvar,
}

/// Resolves exactly once, when the transport is ready or failed to become so
///
/// There is no built-in timeout: a connect that never completes leaves
/// `wait()` blocked. Use `wait_timeout` to bound it.
#[derive(Clone)]
pub struct ConnectedSignal {
    inner: Arc<Latch>,
}

impl ConnectedSignal {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(Latch {
                outcome: Mutex::new(None),
                cond: Condvar::new(),
            }),
        }
    }

    /// Fire the signal. Returns false (and changes nothing) if it already fired.
    pub(crate) fn fire(&self, outcome: ConnectOutcome) -> bool {
        let mut slot = self.inner.outcome.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(outcome);
        self.inner.cond.notify_all();
        true
    }

    /// Whether the connect attempt has finished, successfully or not
    pub fn is_fired(&self) -> bool {
        self.inner.outcome.lock().is_some()
    }

    /// Block until the signal fires
    pub fn wait(&self) -> Result<()> {
        let mut slot = self.inner.outcome.lock();
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.to_result();
            }
            self.inner.cond.wait(&mut slot);
        }
    }

    /// Block until the signal fires or `timeout` elapses (`None`)
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<()>> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.inner.outcome.lock();
        loop {
            if let Some(outcome) = slot.as_ref() {
                return Some(outcome.to_result());
            }
            if self.inner.cond.wait_until(&mut slot, deadline).timed_out() {
                return slot.as_ref().map(ConnectOutcome::to_result);
            }
        }
    }
}

impl std::fmt::Debug for ConnectedSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectedSignal")
            .field("outcome", &*self.inner.outcome.lock())
            .finish()
    }
}
