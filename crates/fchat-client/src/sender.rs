//! Outbound message sender
//!
//! Each message is one HTTP POST carrying the text as the body and the
//! identity in the `author` header. Any response from the server counts as
//! delivery. A refused connection means the server process is gone, most
//! likely restarting, so instead of failing the send we reset the inbound
//! stream to pick up the new server.

use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;

use fchat_core::ClientConfig;
use fchat_protocol::{AUTHOR_HEADER, TEXT_CONTENT_TYPE};

use crate::error::{is_connection_refused, ClientError, SendError};
use crate::listener::ResetHandle;

/// Result of a send that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The server answered; its status is reported but not interpreted
    Delivered { status: StatusCode },
    /// Nothing was listening; the inbound stream was reset instead
    ServerAbsent,
}

/// Posts messages to the request endpoint
pub struct OutboundSender {
    http: reqwest::Client,
    url: String,
    author: HeaderValue,
    listener: ResetHandle,
}

impl OutboundSender {
    /// Create a sender for the configured request endpoint
    pub fn new(config: &ClientConfig, listener: ResetHandle) -> Result<Self, ClientError> {
        let author =
            HeaderValue::from_str(&config.name).map_err(|e| ClientError::InvalidIdentity {
                name: config.name.clone(),
                reason: e.to_string(),
            })?;

        // Talk to the chat server directly, never through an environment proxy
        let http = reqwest::Client::builder()
            .no_proxy()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            url: config.request_url(),
            author,
            listener,
        })
    }

    /// URL messages are posted to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Post one message and wait for the server's answer
    pub async fn send(&self, payload: &str) -> Result<SendOutcome, SendError> {
        tracing::info!("Posting message: {}", payload);

        let result = self
            .http
            .post(&self.url)
            .header(AUTHOR_HEADER, self.author.clone())
            .header(CONTENT_TYPE, TEXT_CONTENT_TYPE)
            .body(payload.to_owned())
            .send()
            .await;

        match result {
            Ok(response) => {
                let status = response.status();
                match response.text().await {
                    Ok(body) => tracing::info!("Message sent: {} {}", status, body.trim()),
                    Err(e) => tracing::debug!("Message sent: {} (body unreadable: {})", status, e),
                }
                Ok(SendOutcome::Delivered { status })
            }
            Err(e) if is_connection_refused(&e) => {
                tracing::warn!(
                    "Could not connect to {}, re-initializing inbound stream: {}",
                    self.url,
                    e
                );
                self.listener.force_reset();
                Ok(SendOutcome::ServerAbsent)
            }
            Err(e) => Err(SendError::Request {
                url: self.url.clone(),
                source: e,
            }),
        }
    }
}
