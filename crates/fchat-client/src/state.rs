//! Inbound listener state

use std::fmt;

/// Lifecycle state of the reconnecting listener.
///
/// A connection handle is live only in `Connecting`, `Announcing` and
/// `Streaming`. `Closing` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerState {
    /// No connection; waiting to (re)connect
    Disconnected,
    /// Opening the TCP connection
    Connecting,
    /// Sending the identity line
    Announcing,
    /// Reading inbound lines
    Streaming,
    /// Close requested; no further attempts
    Closing,
}

impl ListenerState {
    /// Whether a connection handle exists in this state
    pub fn has_connection(self) -> bool {
        matches!(self, Self::Connecting | Self::Announcing | Self::Streaming)
    }

    /// Whether the listener has stopped for good
    pub fn is_terminal(self) -> bool {
        self == Self::Closing
    }
}

impl fmt::Display for ListenerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Announcing => "announcing",
            Self::Streaming => "streaming",
            Self::Closing => "closing",
        };
        f.write_str(name)
    }
}
