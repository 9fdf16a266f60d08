//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// What a programmable backend answers with.
pub struct MockReply {
    pub status: u16,
    pub content_type: Option<&'static str>,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
    /// Send the body with `Transfer-Encoding: chunked` in pieces of this size.
    pub chunk_size: Option<usize>,
}

#[allow(dead_code)]
impl MockReply {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: None,
            headers: Vec::new(),
            body: body.into(),
            chunk_size: None,
        }
    }

    pub fn chunked(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    pub fn with_content_type(mut self, content_type: &'static str) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

/// Read the request head (up to the blank line) and return it as text.
async fn read_request_head(socket: &mut TcpStream) -> String {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                head.extend_from_slice(&buf[..n]);
                if head.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
        }
    }
    String::from_utf8_lossy(&head).into_owned()
}

/// Start a programmable mock backend on an ephemeral port.
///
/// The closure receives the raw request head.
#[allow(dead_code)]
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MockReply> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let head = read_request_head(&mut socket).await;
                        let reply = f(head).await;
                        let reason = StatusCode::from_u16(reply.status)
                            .ok()
                            .and_then(|s| s.canonical_reason())
                            .unwrap_or("Unknown");

                        let mut response =
                            format!("HTTP/1.1 {} {}\r\nConnection: close\r\n", reply.status, reason);
                        match reply.chunk_size {
                            Some(_) => response.push_str("Transfer-Encoding: chunked\r\n"),
                            None => response
                                .push_str(&format!("Content-Length: {}\r\n", reply.body.len())),
                        }
                        if let Some(content_type) = reply.content_type {
                            response.push_str(&format!("Content-Type: {}\r\n", content_type));
                        }
                        for (name, value) in &reply.headers {
                            response.push_str(&format!("{}: {}\r\n", name, value));
                        }
                        response.push_str("\r\n");

                        let _ = socket.write_all(response.as_bytes()).await;
                        match reply.chunk_size {
                            Some(size) => {
                                for chunk in reply.body.chunks(size.max(1)) {
                                    let frame = format!("{:x}\r\n", chunk.len());
                                    if socket.write_all(frame.as_bytes()).await.is_err()
                                        || socket.write_all(chunk).await.is_err()
                                        || socket.write_all(b"\r\n").await.is_err()
                                    {
                                        break;
                                    }
                                    let _ = socket.flush().await;
                                }
                                let _ = socket.write_all(b"0\r\n\r\n").await;
                            }
                            None => {
                                let _ = socket.write_all(&reply.body).await;
                            }
                        }
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a backend that reads each request and hangs up without answering.
#[allow(dead_code)]
pub async fn start_dropping_backend(accepted: Arc<AtomicU32>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            accepted.fetch_add(1, Ordering::SeqCst);
            let _ = read_request_head(&mut socket).await;
            drop(socket);
        }
    });

    addr
}

/// A client that never reuses connections, so every attempt is a fresh one.
#[allow(dead_code)]
pub fn fresh_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
