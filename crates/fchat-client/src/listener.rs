//! Reconnecting inbound listener
//!
//! Keeps exactly one inbound stream alive for the lifetime of the client.
//! Each connection is announced with the identity line, then read line by
//! line; every line is handed to the [`Dispatcher`] and checked against the
//! [`WaitGate`]. When the stream ends, fails, or is reset from outside, the
//! listener waits out the backoff and connects again. Only an explicit
//! close stops it.
//!
//! ```text
//! Disconnected -> Connecting -> Announcing -> Streaming
//!      ^                                         |
//!      +------------- EOF / error / reset -------+
//!
//! any state --- request_close() ---> Closing (terminal)
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use fchat_core::ClientConfig;

use crate::backoff::Backoff;
use crate::channel::LineChannel;
use crate::dispatch::Dispatcher;
use crate::error::{ChannelError, ClientError};
use crate::gate::WaitGate;
use crate::state::ListenerState;

/// Registration of the connection currently owned by the listener task
struct ActiveConnection {
    generation: u64,
    reset: CancellationToken,
}

/// Shared slot naming the live inbound connection.
///
/// The socket itself stays owned by the listener task; the slot only holds
/// a per-connection reset token tagged with a generation number, so a reset
/// aimed at an old connection can never close its replacement.
#[derive(Default)]
pub struct ConnectionSlot {
    current: Mutex<Option<ActiveConnection>>,
    next_generation: AtomicU64,
}

impl ConnectionSlot {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection, returning its generation and reset token
    fn install(&self) -> (u64, CancellationToken) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let reset = CancellationToken::new();
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(ActiveConnection {
            generation,
            reset: reset.clone(),
        });
        (generation, reset)
    }

    /// Clear the slot if it still holds `generation`
    fn release(&self, generation: u64) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if current.as_ref().map(|c| c.generation) == Some(generation) {
            *current = None;
        }
    }

    /// Close the connection that is current at call time.
    ///
    /// Returns `false` if there was none.
    pub fn force_reset(&self) -> bool {
        let active = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match active {
            Some(active) => {
                tracing::debug!("Resetting inbound connection #{}", active.generation);
                active.reset.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether a connection is currently registered
    pub fn is_active(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// Weak handle used by the outbound side to invalidate the inbound stream.
///
/// It never keeps the listener alive; once the client is gone, resets are
/// no-ops.
#[derive(Clone)]
pub struct ResetHandle {
    slot: Weak<ConnectionSlot>,
}

impl ResetHandle {
    /// Force the listener to drop its current connection and reconnect.
    ///
    /// Returns `false` if there was no active connection.
    pub fn force_reset(&self) -> bool {
        self.slot
            .upgrade()
            .map(|slot| slot.force_reset())
            .unwrap_or(false)
    }
}

/// How one connection attempt ended without an error
enum SessionEnd {
    /// Server closed the stream
    EndOfStream,
    /// Reset from outside
    Reset,
}

/// Background listener keeping the inbound stream connected
pub struct ReconnectingListener {
    config: Arc<ClientConfig>,
    slot: Arc<ConnectionSlot>,
    dispatcher: Arc<Dispatcher>,
    gate: Arc<WaitGate>,
    /// Close request; checked at every suspension point
    shutdown: CancellationToken,
    /// Fired when the background task has fully stopped
    stopped: CancellationToken,
    state: watch::Sender<ListenerState>,
    started: AtomicBool,
}

impl ReconnectingListener {
    /// Create a listener. Nothing happens until [`start`](Self::start).
    pub fn new(
        config: Arc<ClientConfig>,
        dispatcher: Arc<Dispatcher>,
        gate: Arc<WaitGate>,
        shutdown: CancellationToken,
    ) -> Self {
        let (state, _) = watch::channel(ListenerState::Disconnected);
        Self {
            config,
            slot: Arc::new(ConnectionSlot::new()),
            dispatcher,
            gate,
            shutdown,
            stopped: CancellationToken::new(),
            state,
            started: AtomicBool::new(false),
        }
    }

    /// Spawn the listener loop on the current Tokio runtime.
    ///
    /// Returns immediately. Calling it again has no effect.
    pub fn start(self: &Arc<Self>) -> Result<(), ClientError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ClientError::NoRuntime)?;
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        runtime.spawn(Arc::clone(self).run());
        Ok(())
    }

    /// Drop the current connection (if any) and let the loop reconnect
    pub fn force_reset(&self) -> bool {
        self.slot.force_reset()
    }

    /// Weak reset handle for the outbound side
    pub fn reset_handle(&self) -> ResetHandle {
        ResetHandle {
            slot: Arc::downgrade(&self.slot),
        }
    }

    /// Stop the listener for good, interrupting any read or backoff wait.
    /// Idempotent.
    pub fn request_close(&self) {
        if !self.shutdown.is_cancelled() {
            tracing::debug!("Close requested for inbound listener");
        }
        self.shutdown.cancel();
        if !self.started.load(Ordering::SeqCst) {
            // Never ran; nothing to wait for
            self.state.send_replace(ListenerState::Closing);
            self.stopped.cancel();
        }
    }

    /// Wait until the background task has stopped
    pub async fn await_termination(&self) {
        self.stopped.cancelled().await;
    }

    /// Whether the background task has stopped
    pub fn is_terminated(&self) -> bool {
        self.stopped.is_cancelled()
    }

    /// Current state
    pub fn state(&self) -> ListenerState {
        *self.state.borrow()
    }

    /// Receiver notified on every state transition
    pub fn subscribe_state(&self) -> watch::Receiver<ListenerState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: ListenerState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::trace!("Listener state {} -> {}", previous, state);
        }
    }

    async fn run(self: Arc<Self>) {
        let _stopped = self.stopped.clone().drop_guard();
        let mut backoff = Backoff::from_config(&self.config.reconnect);

        while !self.shutdown.is_cancelled() {
            if self.connect_and_run().await {
                backoff.reset();
            }
            if self.shutdown.is_cancelled() {
                break;
            }

            let delay = backoff.next_delay();
            tracing::debug!("Reconnecting in {:?}", delay);
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.set_state(ListenerState::Closing);
        tracing::info!("Inbound listener stopped");
    }

    /// One full connection lifetime. Returns whether it reached streaming.
    async fn connect_and_run(&self) -> bool {
        let address = self.config.stream_address();
        let (generation, reset) = self.slot.install();
        self.set_state(ListenerState::Connecting);
        tracing::info!("Connecting to {}", address);

        let result = tokio::select! {
            _ = self.shutdown.cancelled() => None,
            result = self.session(&address, &reset) => Some(result),
        };

        let streamed = self.state() == ListenerState::Streaming;
        // Connection is dropped by now; leave the live states before
        // forgetting it, unless already replaced
        self.set_state(ListenerState::Disconnected);
        self.slot.release(generation);

        match result {
            None => {}
            Some(Ok(SessionEnd::EndOfStream)) => {
                tracing::info!("Server at {} closed the stream", address);
            }
            Some(Ok(SessionEnd::Reset)) => {
                tracing::info!("Connection to {} reset, reconnecting", address);
            }
            Some(Err(_)) if self.shutdown.is_cancelled() => {}
            Some(Err(e)) if e.is_connection_refused() => {
                tracing::warn!("Unable to connect to {}: no server listening ({})", address, e);
            }
            Some(Err(e)) => {
                tracing::warn!("Connection to {} failed: {}", address, e);
            }
        }

        streamed
    }

    async fn session(
        &self,
        address: &str,
        reset: &CancellationToken,
    ) -> Result<SessionEnd, ChannelError> {
        let connect = LineChannel::connect(
            address,
            self.config.connect_timeout,
            self.config.max_line_length,
        );
        let mut channel = tokio::select! {
            _ = reset.cancelled() => return Ok(SessionEnd::Reset),
            channel = connect => channel?,
        };
        tracing::info!("Connected to {}", address);

        self.set_state(ListenerState::Announcing);
        tokio::select! {
            _ = reset.cancelled() => return Ok(SessionEnd::Reset),
            result = channel.announce(&self.config.name) => result?,
        }

        self.set_state(ListenerState::Streaming);
        loop {
            let line = tokio::select! {
                _ = reset.cancelled() => return Ok(SessionEnd::Reset),
                line = channel.next_line() => line?,
            };

            match line {
                Some(line) => self.deliver(&line),
                None => return Ok(SessionEnd::EndOfStream),
            }
        }
    }

    fn deliver(&self, line: &str) {
        tracing::debug!("Received line: {}", line);
        self.dispatcher.dispatch(line);
        self.gate.notify(line);
    }
}
