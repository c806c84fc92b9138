//! Round trips over a real socket.

use std::time::Duration;
use streamhub::json;
use streamhub::server::Server;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

mod common;

use common::TempDir;

/// Sends `raw` and returns everything the server wrote before closing.
async fn exchange(addr: std::net::SocketAddr, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut out = String::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_string(&mut out))
        .await
        .unwrap()
        .unwrap();
    out
}

fn split(response: &str) -> (&str, &str) {
    response.split_once("\r\n\r\n").unwrap()
}

#[tokio::test]
async fn serves_requests_until_shutdown() {
    let dir = TempDir::new();
    let server = Server::bind("127.0.0.1:0", common::dispatcher(&dir))
        .await
        .unwrap()
        .max_connections(4);
    let addr = server.local_addr().unwrap();

    let (stop, stopped) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.serve_with_shutdown(async {
        let _ = stopped.await;
    }));

    let body = json!({ "username": "xqc", "followers": 10 }).to_string();
    let request = format!(
        "POST /streamers HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    let response = exchange(addr, &request).await;
    let (head, body) = split(&response);
    assert!(head.starts_with("HTTP/1.1 201 Created"));
    assert!(head.contains("Content-Type: application/json"));
    assert!(head.contains("Connection: close"));
    let created: streamhub::Value = serde_json::from_str(body).unwrap();
    assert_eq!(created["id"], 1);

    let response = exchange(addr, "GET /streamers/1 HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
    let (head, body) = split(&response);
    assert!(head.starts_with("HTTP/1.1 200 OK"));
    assert!(head.contains(&format!("Content-Length: {}", body.len())));
    assert_eq!(serde_json::from_str::<streamhub::Value>(body).unwrap(), created);

    let response = exchange(addr, "BREW /pot HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 400 Bad Request"));
    assert!(response.ends_with(r#"{"error":"unsupported method"}"#));

    stop.send(()).unwrap();
    handle.await.unwrap().unwrap();
}
