//! fchat-client: Dual-channel chat client
//!
//! Inbound messages arrive on a long-lived TCP stream kept alive by a
//! background [`ReconnectingListener`]; outbound messages are posted over
//! HTTP by the [`OutboundSender`]. When the request endpoint refuses a
//! connection the sender forces the listener to drop and re-establish its
//! stream, on the assumption that the server restarted.
//!
//! [`ChatClient`] wires the pieces together and is the type applications use.

pub mod backoff;
pub mod channel;
pub mod client;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod listener;
pub mod sender;
pub mod state;

pub use client::ChatClient;
pub use dispatch::{Dispatcher, MessageObserver};
pub use error::{ChannelError, ClientError, SendError};
pub use gate::{WaitGate, WaitOutcome};
pub use listener::{ConnectionSlot, ReconnectingListener, ResetHandle};
pub use sender::{OutboundSender, SendOutcome};
pub use state::ListenerState;
