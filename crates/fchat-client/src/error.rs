//! Client error types

use std::io;
use std::time::Duration;

use fchat_core::ConfigError;
use fchat_protocol::ProtocolError;
use thiserror::Error;

/// Errors raised while constructing a client
#[derive(Error, Debug)]
pub enum ClientError {
    /// Configuration failed validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Identity cannot be sent as a header value
    #[error("Invalid identity {name:?}: {reason}")]
    InvalidIdentity { name: String, reason: String },

    /// HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    /// Not called from within a Tokio runtime
    #[error("A Tokio runtime is required to start the client")]
    NoRuntime,
}

/// Failure on the outbound channel that is surfaced to the caller.
///
/// A refused connection is not one of these; it is handled by forcing an
/// inbound reconnect instead.
#[derive(Error, Debug)]
pub enum SendError {
    /// Request could not be completed
    #[error("Failed to post message to {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Failures of a single inbound connection
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Connect did not complete in time
    #[error("Connection timed out after {0:?}")]
    Timeout(Duration),

    /// Socket error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Framing error
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl ChannelError {
    /// Whether the server actively refused the connection (nothing listening)
    pub fn is_connection_refused(&self) -> bool {
        match self {
            Self::Io(e) | Self::Protocol(ProtocolError::Io(e)) => {
                e.kind() == io::ErrorKind::ConnectionRefused
            }
            _ => false,
        }
    }
}

/// Whether an outbound request failed because nothing was listening
pub(crate) fn is_connection_refused(err: &reqwest::Error) -> bool {
    if !err.is_connect() {
        return false;
    }

    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return io_err.kind() == io::ErrorKind::ConnectionRefused;
        }
        source = cause.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_error_refused_detection() {
        let refused = ChannelError::Io(io::Error::from(io::ErrorKind::ConnectionRefused));
        assert!(refused.is_connection_refused());

        let reset = ChannelError::Io(io::Error::from(io::ErrorKind::ConnectionReset));
        assert!(!reset.is_connection_refused());

        let wrapped = ChannelError::Protocol(ProtocolError::Io(io::Error::from(
            io::ErrorKind::ConnectionRefused,
        )));
        assert!(wrapped.is_connection_refused());

        assert!(!ChannelError::Timeout(Duration::from_secs(1)).is_connection_refused());
    }
}
