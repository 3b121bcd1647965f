//! Outbound sender integration tests

mod common;

use tokio::net::TcpListener;
use tokio::time::timeout;

use fchat_client::{ChatClient, SendError, SendOutcome};

use common::{closed_port, fast_config, spawn_request_server, StreamServer, PROMPT};

#[tokio::test]
async fn test_post_message_carries_author_and_body() {
    let server = StreamServer::bind().await;
    let (request_port, mut posted) = spawn_request_server().await;
    let client = ChatClient::new(fast_config("alice", server.port(), request_port)).unwrap();

    let outcome = client.post_message("hello, wörld").await.unwrap();
    assert!(matches!(outcome, SendOutcome::Delivered { status } if status.is_success()));

    let request = timeout(PROMPT, posted.recv()).await.unwrap().unwrap();
    assert_eq!(request.author.as_deref(), Some("alice"));
    assert_eq!(
        request.content_type.as_deref(),
        Some("text/plain; charset=utf-8")
    );
    assert_eq!(request.body, "hello, wörld");

    client.close();
}

#[tokio::test]
async fn test_sends_keep_program_order() {
    let server = StreamServer::bind().await;
    let (request_port, mut posted) = spawn_request_server().await;
    let client = ChatClient::new(fast_config("bob", server.port(), request_port)).unwrap();

    for text in ["one", "two", "three"] {
        client.post_message(text).await.unwrap();
    }

    for expected in ["one", "two", "three"] {
        let request = timeout(PROMPT, posted.recv()).await.unwrap().unwrap();
        assert_eq!(request.body, expected);
    }
}

#[tokio::test]
async fn test_refused_send_resets_inbound_stream() {
    let server = StreamServer::bind().await;
    let client = ChatClient::new(fast_config("carol", server.port(), closed_port().await)).unwrap();

    let conn = server.accept().await;

    let outcome = client.post_message("anyone there?").await.unwrap();
    assert_eq!(outcome, SendOutcome::ServerAbsent);

    // The old stream is dropped and a fresh one announced
    assert!(conn.closed_by_client().await);
    let conn = server.accept().await;
    assert_eq!(conn.identity, "carol");

    client.close();
}

#[tokio::test]
async fn test_refused_send_without_stream_is_quiet() {
    let client =
        ChatClient::new(fast_config("dave", closed_port().await, closed_port().await)).unwrap();

    let outcome = client.post_message("hello?").await.unwrap();
    assert_eq!(outcome, SendOutcome::ServerAbsent);

    client.close();
    timeout(PROMPT, client.join()).await.unwrap();
}

#[tokio::test]
async fn test_other_failures_are_surfaced() {
    // Accepts the connection, then hangs up without answering
    let rude = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let request_port = rude.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((socket, _)) = rude.accept().await {
            drop(socket);
        }
    });

    let client =
        ChatClient::new(fast_config("erin", closed_port().await, request_port)).unwrap();

    let result = client.post_message("lost").await;
    assert!(matches!(result, Err(SendError::Request { .. })));

    client.close();
}
