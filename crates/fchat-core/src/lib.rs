//! fchat-core: Configuration and shared error types for fchat
//!
//! This crate holds the client configuration (endpoints, identity,
//! reconnect and timeout tuning) used by the client library and the CLI.

pub mod config;
pub mod error;

pub use config::{BackoffConfig, ClientConfig};
pub use error::ConfigError;
