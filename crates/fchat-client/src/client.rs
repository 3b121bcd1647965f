//! Chat client facade

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use fchat_core::ClientConfig;

use crate::dispatch::{Dispatcher, MessageObserver};
use crate::error::{ClientError, SendError};
use crate::gate::{WaitGate, WaitOutcome};
use crate::listener::ReconnectingListener;
use crate::sender::{OutboundSender, SendOutcome};
use crate::state::ListenerState;

/// Chat client: inbound stream plus outbound sender for one identity.
///
/// Creating the client starts the inbound listener right away; it keeps
/// reconnecting until [`close`](Self::close) is called or the client is
/// dropped.
///
/// ```ignore
/// let client = ChatClient::new(ClientConfig::new("alice", "localhost", 8888, 8080))?;
/// client.set_message_listener(|msg: &str| println!("{}", msg));
/// client.post_message("hello").await?;
/// client.wait_for("bye").await;
/// client.close();
/// client.join().await;
/// ```
pub struct ChatClient {
    config: Arc<ClientConfig>,
    listener: Arc<ReconnectingListener>,
    dispatcher: Arc<Dispatcher>,
    gate: Arc<WaitGate>,
    sender: OutboundSender,
}

impl ChatClient {
    /// Validate `config` and start listening.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let config = Arc::new(config);

        let shutdown = CancellationToken::new();
        let dispatcher = Arc::new(Dispatcher::new());
        let gate = Arc::new(WaitGate::new(shutdown.clone()));
        let listener = Arc::new(ReconnectingListener::new(
            Arc::clone(&config),
            Arc::clone(&dispatcher),
            Arc::clone(&gate),
            shutdown,
        ));
        let sender = OutboundSender::new(&config, listener.reset_handle())?;

        listener.start()?;
        tracing::debug!(
            "Chat client '{}' started (stream {}, requests {})",
            config.name,
            config.stream_address(),
            sender.url()
        );

        Ok(Self {
            config,
            listener,
            dispatcher,
            gate,
            sender,
        })
    }

    /// Name this client announces and signs messages with
    pub fn identity(&self) -> &str {
        &self.config.name
    }

    /// Configuration in use
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send a message.
    ///
    /// A refused connection is not an error: the inbound stream is reset
    /// and [`SendOutcome::ServerAbsent`] returned. Other failures are
    /// returned as [`SendError`].
    pub async fn post_message(&self, text: &str) -> Result<SendOutcome, SendError> {
        self.sender.send(text).await
    }

    /// Install the observer that receives inbound messages, replacing any
    /// previous one
    pub fn set_message_listener<O>(&self, observer: O)
    where
        O: MessageObserver + 'static,
    {
        self.dispatcher.set_observer(Arc::new(observer));
    }

    /// Remove the observer; inbound messages are dropped until a new one is
    /// set
    pub fn clear_message_listener(&self) {
        self.dispatcher.clear_observer();
    }

    /// Suspend until an inbound line trims to `text`, or the client closes
    pub async fn wait_for(&self, text: &str) -> WaitOutcome {
        self.gate.wait_for(text).await
    }

    /// Drop the current inbound connection and reconnect
    pub fn reset_connection(&self) -> bool {
        self.listener.force_reset()
    }

    /// Stop the inbound listener and interrupt pending waits. Idempotent.
    pub fn close(&self) {
        self.listener.request_close();
    }

    /// Wait until the inbound listener has fully stopped
    pub async fn join(&self) {
        self.listener.await_termination().await;
    }

    /// Current inbound listener state
    pub fn state(&self) -> ListenerState {
        self.listener.state()
    }

    /// Receiver notified on inbound listener state changes
    pub fn subscribe_state(&self) -> watch::Receiver<ListenerState> {
        self.listener.subscribe_state()
    }
}

impl Drop for ChatClient {
    fn drop(&mut self) {
        self.listener.request_close();
    }
}
