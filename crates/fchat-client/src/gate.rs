//! Wait gate: suspend until a specific inbound line is seen
//!
//! Any number of waits may be pending at once. Each is registered with its
//! own one-shot signal and is resolved independently, so a second waiter
//! never displaces the first.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// How a wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// A matching line was dispatched
    Matched,
    /// The client was closed before a match arrived
    Interrupted,
}

struct PendingWait {
    id: u64,
    target: String,
    signal: oneshot::Sender<()>,
}

/// Registry of pending waits, checked against every dispatched line
pub struct WaitGate {
    pending: Mutex<Vec<PendingWait>>,
    next_id: AtomicU64,
    /// Fired when the client closes; interrupts all waits
    shutdown: CancellationToken,
}

impl WaitGate {
    /// Create a gate whose waits are interrupted when `shutdown` fires
    pub fn new(shutdown: CancellationToken) -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
            shutdown,
        }
    }

    /// Suspend until a line that trims to `target` (itself trimmed) is
    /// dispatched.
    ///
    /// Lines dispatched before this call do not count. Returns
    /// [`WaitOutcome::Interrupted`] if the client is closed first; this is
    /// logged but not an error.
    pub async fn wait_for(&self, target: &str) -> WaitOutcome {
        let target = target.trim().to_string();

        if self.shutdown.is_cancelled() {
            tracing::warn!("Client closed, not waiting for '{}'", target);
            return WaitOutcome::Interrupted;
        }

        let (signal, matched) = oneshot::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(PendingWait {
                id,
                target: target.clone(),
                signal,
            });
        // Deregisters on every exit, including when this future is dropped
        let _registration = Registration { gate: self, id };
        tracing::debug!("Waiting for '{}'", target);

        tokio::select! {
            biased;
            result = matched => match result {
                Ok(()) => WaitOutcome::Matched,
                Err(_) => {
                    tracing::warn!("Wait for '{}' abandoned", target);
                    WaitOutcome::Interrupted
                }
            },
            _ = self.shutdown.cancelled() => {
                tracing::warn!("Interrupted while waiting for '{}'", target);
                WaitOutcome::Interrupted
            }
        }
    }

    /// Resolve every pending wait whose target equals the trimmed `line`.
    ///
    /// Returns the number of waits released.
    pub fn notify(&self, line: &str) -> usize {
        let line = line.trim();

        let released: Vec<PendingWait> = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            if pending.is_empty() {
                return 0;
            }
            let (hits, rest): (Vec<_>, Vec<_>) = pending
                .drain(..)
                .partition(|wait| wait.target == line);
            *pending = rest;
            hits
        };

        let mut count = 0;
        for wait in released {
            if wait.signal.send(()).is_ok() {
                count += 1;
            }
        }
        if count > 0 {
            tracing::debug!("Line '{}' released {} waiter(s)", line, count);
        }
        count
    }

    /// Number of waits currently suspended
    pub fn pending(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Removes a wait from the gate when its `wait_for` call ends
struct Registration<'a> {
    gate: &'a WaitGate,
    id: u64,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.gate
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|wait| wait.id != self.id);
    }
}
