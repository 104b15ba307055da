//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use studio_api_client::config::{BreakerScope, CircuitBreakerConfig, ClientConfig};

/// What the mock backend saw for one request.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    /// Path including the query string.
    pub target: String,
    /// Lowercase header names.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl SeenRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A canned reply from the mock backend.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: u16,
    pub body: String,
    pub headers: Vec<(String, String)>,
    pub delay: Duration,
}

impl MockReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            headers: vec![("Content-Type".into(), "application/json".into())],
            delay: Duration::ZERO,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Handle to a running mock backend.
#[derive(Clone)]
pub struct MockBackend {
    pub addr: SocketAddr,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn hits(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

/// Start a programmable mock backend on an ephemeral port.
///
/// `f` is called once per request with the parsed request.
pub async fn start_programmable_backend<F, Fut>(f: F) -> MockBackend
where
    F: Fn(SeenRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MockReply> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let backend = MockBackend {
        addr,
        seen: seen.clone(),
    };

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let f = f.clone();
                    let seen = seen.clone();
                    tokio::spawn(async move {
                        let _ = serve_one(socket, f.as_ref(), &seen).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    backend
}

/// Backend answering every request with the same reply.
pub async fn start_mock_backend(status: u16, body: &'static str) -> MockBackend {
    start_programmable_backend(move |_| async move { MockReply::new(status, body) }).await
}

/// Backend replaying `replies` in order, repeating the last one.
pub async fn start_scripted_backend(replies: Vec<MockReply>) -> MockBackend {
    let replies = Arc::new(replies);
    let next = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    start_programmable_backend(move |_| {
        let replies = replies.clone();
        let i = next.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        async move { replies[i.min(replies.len() - 1)].clone() }
    })
    .await
}

async fn serve_one<F, Fut>(
    socket: TcpStream,
    f: &F,
    seen: &Mutex<Vec<SeenRequest>>,
) -> std::io::Result<()>
where
    F: Fn(SeenRequest) -> Fut,
    Fut: Future<Output = MockReply>,
{
    let mut reader = BufReader::new(socket);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).await?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((k, v)) = line.split_once(':') {
            headers.push((k.trim().to_ascii_lowercase(), v.trim().to_string()));
        }
    }

    let length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await?;

    let request = SeenRequest {
        method,
        target,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    };
    seen.lock().unwrap().push(request.clone());

    let reply = f(request).await;
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    let mut response = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        reply.status,
        reason(reply.status),
        reply.body.len()
    );
    for (k, v) in &reply.headers {
        response.push_str(&format!("{}: {}\r\n", k, v));
    }
    response.push_str("\r\n");
    response.push_str(&reply.body);

    let mut socket = reader.into_inner();
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// Client config pointed at `backend` with short delays for tests.
pub fn fast_config(backend: &MockBackend) -> ClientConfig {
    ClientConfig {
        base_destination: backend.url(),
        request_timeout_ms: 2_000,
        max_retry_attempts: 3,
        base_retry_delay_ms: 10,
        breaker_scope: BreakerScope::Destination,
        ..ClientConfig::default()
    }
}

pub fn breaker_config(failure_threshold: u32, timeout_ms: u64) -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        failure_threshold,
        success_threshold: 2,
        timeout_ms,
    }
}

/// A unique scratch path for file-backed stores.
pub fn temp_store_path() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("studio-client-test-{}.json", uuid::Uuid::new_v4()))
}
