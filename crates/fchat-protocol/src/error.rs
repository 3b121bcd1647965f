//! Protocol error types

use thiserror::Error;

/// Errors that can occur while framing the inbound stream
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Outgoing line contains a line break and would split into two records
    #[error("Line contains an embedded line break")]
    EmbeddedNewline,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Malformed control-script input
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScriptError {
    /// `cmd:sleep` argument is not a non-negative integer
    #[error("Invalid sleep duration '{value}': {reason}")]
    InvalidSleep { value: String, reason: String },

    /// `cmd:exit` argument is not an integer
    #[error("Invalid exit code '{value}': {reason}")]
    InvalidExitCode { value: String, reason: String },
}
