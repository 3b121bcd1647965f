//! fchat-protocol: Wire formats for the fchat messaging client
//!
//! The inbound channel is a plain TCP stream of newline-delimited UTF-8
//! lines, preceded by a single identity line written by the client. The
//! outbound channel is an HTTP POST whose header and content type are
//! fixed here so client and test fakes agree on them.

pub mod codec;
pub mod error;
pub mod script;

pub use codec::{LineCodec, DEFAULT_MAX_LINE_LENGTH};
pub use error::{ProtocolError, ScriptError};
pub use script::ScriptCommand;

/// Header carrying the sender identity on outbound requests
pub const AUTHOR_HEADER: &str = "author";

/// Content type of outbound request bodies
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Path outbound messages are posted to
pub const REQUEST_PATH: &str = "/";

/// Default port of the inbound stream endpoint
pub const DEFAULT_STREAM_PORT: u16 = 8888;

/// Default port of the outbound request endpoint
pub const DEFAULT_REQUEST_PORT: u16 = 8080;
