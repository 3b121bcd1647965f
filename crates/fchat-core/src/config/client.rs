//! Client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use fchat_protocol::{
    DEFAULT_MAX_LINE_LENGTH, DEFAULT_REQUEST_PORT, DEFAULT_STREAM_PORT, REQUEST_PATH,
};

use super::serde_utils::{duration_millis, duration_secs};
use crate::error::ConfigError;

/// Configuration for the chat client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Display name announced on the inbound stream and sent as the
    /// `author` header on outbound messages
    pub name: String,

    /// Server hostname or IP address
    pub host: String,

    /// Port of the inbound message stream (plain TCP)
    pub stream_port: u16,

    /// Port of the outbound request endpoint (HTTP)
    pub request_port: u16,

    /// Timeout for establishing the inbound connection
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,

    /// Timeout for a complete outbound request
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,

    /// Longest inbound line accepted; longer lines are dropped
    pub max_line_length: usize,

    /// Delay between a lost inbound connection and the next attempt
    pub reconnect: BackoffConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: whoami::username(),
            host: "localhost".to_string(),
            stream_port: DEFAULT_STREAM_PORT,
            request_port: DEFAULT_REQUEST_PORT,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            reconnect: BackoffConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration for the given identity and endpoints
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        stream_port: u16,
        request_port: u16,
    ) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            stream_port,
            request_port,
            ..Self::default()
        }
    }

    /// Host formatted for use in an address, bracketing bare IPv6 literals
    fn host_for_address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        }
    }

    /// `host:port` of the inbound stream endpoint
    pub fn stream_address(&self) -> String {
        format!("{}:{}", self.host_for_address(), self.stream_port)
    }

    /// URL outbound messages are posted to
    pub fn request_url(&self) -> String {
        format!(
            "http://{}:{}{}",
            self.host_for_address(),
            self.request_port,
            REQUEST_PATH
        )
    }

    /// Check the configuration before starting a client
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("name must not be empty".into()));
        }
        // The name is written as a single line and sent as a header value
        if self.name.chars().any(char::is_control) {
            return Err(ConfigError::Invalid(format!(
                "name {:?} must not contain line breaks or control characters",
                self.name
            )));
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".into()));
        }
        if self.stream_port == 0 || self.request_port == 0 {
            return Err(ConfigError::Invalid("ports must be non-zero".into()));
        }
        if self.max_line_length == 0 {
            return Err(ConfigError::Invalid(
                "max_line_length must be greater than zero".into(),
            ));
        }
        self.reconnect.validate()
    }
}

/// Reconnect delay configuration.
///
/// The default is a fixed one second delay (`multiplier` 1.0, no jitter).
/// Raising `multiplier` turns it into an exponential backoff capped at `max`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Initial delay
    #[serde(with = "duration_millis")]
    pub initial: Duration,

    /// Maximum delay
    #[serde(with = "duration_millis")]
    pub max: Duration,

    /// Multiplier for each retry
    pub multiplier: f64,

    /// Jitter factor (0.0 to 1.0)
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(1))
    }
}

impl BackoffConfig {
    /// Constant delay between attempts
    pub fn fixed(delay: Duration) -> Self {
        Self {
            initial: delay,
            max: delay,
            multiplier: 1.0,
            jitter: 0.0,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        // NaN fails every comparison, so check finiteness first
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ConfigError::Invalid(
                "reconnect.multiplier must be a finite number of at least 1.0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(ConfigError::Invalid(
                "reconnect.jitter must be between 0.0 and 1.0".into(),
            ));
        }
        if self.max < self.initial {
            return Err(ConfigError::Invalid(
                "reconnect.max must not be below reconnect.initial".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_protocol_ports() {
        let config = ClientConfig::default();
        assert_eq!(config.stream_port, 8888);
        assert_eq!(config.request_port, 8080);
        assert_eq!(config.reconnect, BackoffConfig::fixed(Duration::from_secs(1)));
    }

    #[test]
    fn test_addresses() {
        let config = ClientConfig::new("alice", "chat.local", 9000, 9001);
        assert_eq!(config.stream_address(), "chat.local:9000");
        assert_eq!(config.request_url(), "http://chat.local:9001/");

        let v6 = ClientConfig::new("alice", "::1", 9000, 9001);
        assert_eq!(v6.stream_address(), "[::1]:9000");
        assert_eq!(v6.request_url(), "http://[::1]:9001/");
    }

    #[test]
    fn test_validate_rejects_bad_names() {
        assert!(ClientConfig::new("alice", "localhost", 1, 2).validate().is_ok());
        assert!(ClientConfig::new("  ", "localhost", 1, 2).validate().is_err());
        assert!(ClientConfig::new("ali\nce", "localhost", 1, 2)
            .validate()
            .is_err());
    }

    #[test]
    fn test_validate_rejects_bad_backoff() {
        let mut config = ClientConfig::new("alice", "localhost", 1, 2);
        config.reconnect.jitter = 1.5;
        assert!(config.validate().is_err());

        config.reconnect = BackoffConfig::fixed(Duration::from_millis(100));
        config.reconnect.multiplier = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_finite_backoff() {
        for value in ["nan", "inf", "-inf"] {
            let config: ClientConfig = toml::from_str(&format!(
                "name = \"alice\"\n[reconnect]\ninitial = 100\nmax = 100\nmultiplier = {}\njitter = 0.0\n",
                value
            ))
            .unwrap();
            assert!(config.validate().is_err(), "multiplier = {} accepted", value);
        }

        let mut config = ClientConfig::new("alice", "localhost", 1, 2);
        config.reconnect.jitter = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
            name = "bob"
            host = "10.0.0.2"

            [reconnect]
            initial = 500
            max = 4000
            multiplier = 2.0
            jitter = 0.0
            "#,
        )
        .unwrap();

        assert_eq!(config.name, "bob");
        assert_eq!(config.stream_port, 8888);
        assert_eq!(config.reconnect.initial, Duration::from_millis(500));
        assert_eq!(config.reconnect.max, Duration::from_secs(4));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }
}
