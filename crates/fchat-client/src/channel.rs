//! Line-oriented inbound channel
//!
//! Wraps a byte stream in [`LineCodec`] framing: one identity line goes out
//! right after connecting, then text lines come in until the peer closes.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use fchat_protocol::LineCodec;

use crate::error::ChannelError;

/// A connected inbound stream framed into text lines
pub struct LineChannel<T = TcpStream> {
    framed: Framed<T, LineCodec>,
}

impl LineChannel<TcpStream> {
    /// Open a TCP connection to `address`, bounded by `timeout`
    pub async fn connect(
        address: &str,
        timeout: Duration,
        max_line_length: usize,
    ) -> Result<Self, ChannelError> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(address))
            .await
            .map_err(|_| ChannelError::Timeout(timeout))??;

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("Failed to set TCP_NODELAY: {}", e);
        }

        Ok(Self::new(stream, max_line_length))
    }
}

impl<T> LineChannel<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Frame an already-open byte stream
    pub fn new(io: T, max_line_length: usize) -> Self {
        Self {
            framed: Framed::new(io, LineCodec::with_max_length(max_line_length)),
        }
    }

    /// Send the identity line and flush it
    pub async fn announce(&mut self, identity: &str) -> Result<(), ChannelError> {
        self.framed.send(identity).await?;
        Ok(())
    }

    /// Read the next line; `None` at end of stream
    pub async fn next_line(&mut self) -> Result<Option<String>, ChannelError> {
        match self.framed.next().await {
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_announce_then_read_lines() {
        let (client, mut server) = tokio::io::duplex(1024);
        let mut channel = LineChannel::new(client, 1024);

        channel.announce("alice").await.unwrap();

        let mut buf = [0u8; 6];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"alice\n");

        server.write_all(b"hello\r\nworld\n").await.unwrap();
        assert_eq!(channel.next_line().await.unwrap().as_deref(), Some("hello"));
        assert_eq!(channel.next_line().await.unwrap().as_deref(), Some("world"));

        drop(server);
        assert!(channel.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unterminated_last_line_is_delivered() {
        let (client, mut server) = tokio::io::duplex(64);
        let mut channel = LineChannel::new(client, 64);

        server.write_all(b"bye").await.unwrap();
        drop(server);

        assert_eq!(channel.next_line().await.unwrap().as_deref(), Some("bye"));
        assert!(channel.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port with nothing listening
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let result = LineChannel::connect(&address, Duration::from_secs(5), 1024).await;
        match result {
            Err(e) => assert!(e.is_connection_refused(), "unexpected error: {}", e),
            Ok(_) => panic!("connect should fail with nothing listening"),
        }
    }
}
