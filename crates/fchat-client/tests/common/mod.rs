//! Loopback fakes for the two server endpoints

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::Router;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;

use fchat_client::MessageObserver;
use fchat_core::{BackoffConfig, ClientConfig};

/// Generous upper bound for things that should happen promptly
pub const PROMPT: Duration = Duration::from_secs(5);

/// Fake inbound stream endpoint
pub struct StreamServer {
    listener: TcpListener,
}

/// One accepted inbound connection
pub struct StreamConn {
    pub identity: String,
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl StreamServer {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stream server");
        Self { listener }
    }

    pub fn port(&self) -> u16 {
        self.listener.local_addr().unwrap().port()
    }

    /// Accept the next connection and read its identity line
    pub async fn accept_within(&self, limit: Duration) -> StreamConn {
        let (stream, _) = timeout(limit, self.listener.accept())
            .await
            .expect("No connection attempt within the time limit")
            .expect("Accept failed");
        StreamConn::handshake(stream).await
    }

    pub async fn accept(&self) -> StreamConn {
        self.accept_within(PROMPT).await
    }
}

impl StreamConn {
    async fn handshake(stream: TcpStream) -> Self {
        let (read, writer) = stream.into_split();
        let mut reader = BufReader::new(read);
        let mut identity = String::new();
        timeout(PROMPT, reader.read_line(&mut identity))
            .await
            .expect("Client did not announce itself")
            .expect("Failed to read identity");
        assert!(identity.ends_with('\n'), "identity line not terminated");
        identity.pop();

        Self {
            identity,
            reader,
            writer,
        }
    }

    pub async fn send_line(&mut self, line: &str) {
        self.writer
            .write_all(format!("{}\n", line).as_bytes())
            .await
            .expect("Failed to write line");
        self.writer.flush().await.expect("Failed to flush");
    }

    /// Wait for the client side to close the connection
    pub async fn closed_by_client(mut self) -> bool {
        let mut rest = String::new();
        match timeout(PROMPT, self.reader.read_line(&mut rest)).await {
            Ok(Ok(0)) | Ok(Err(_)) => true,
            _ => false,
        }
    }
}

/// A captured outbound request
#[derive(Debug, Clone)]
pub struct Posted {
    pub author: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

async fn record(
    State(tx): State<mpsc::UnboundedSender<Posted>>,
    headers: HeaderMap,
    body: String,
) -> &'static str {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };
    let _ = tx.send(Posted {
        author: header("author"),
        content_type: header("content-type"),
        body,
    });
    "OK"
}

/// Fake request endpoint capturing every POST
pub async fn spawn_request_server() -> (u16, mpsc::UnboundedReceiver<Posted>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let app = Router::new().route("/", post(record)).with_state(tx);
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind request server");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (port, rx)
}

/// Port with nothing listening on it
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    drop(listener);
    addr.port()
}

pub fn config(name: &str, stream_port: u16, request_port: u16) -> ClientConfig {
    ClientConfig::new(name, "127.0.0.1", stream_port, request_port)
}

/// Config with a short reconnect delay for tests that don't time the backoff
pub fn fast_config(name: &str, stream_port: u16, request_port: u16) -> ClientConfig {
    let mut config = config(name, stream_port, request_port);
    config.reconnect = BackoffConfig::fixed(Duration::from_millis(50));
    config
}

/// Observer forwarding every message into a channel
pub fn channel_observer() -> (impl MessageObserver, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let observer = move |msg: &str| {
        let _ = tx.send(msg.to_string());
    };
    (observer, rx)
}

pub async fn next_message(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
    timeout(PROMPT, rx.recv())
        .await
        .expect("No message within the time limit")
        .expect("Observer channel closed")
}
