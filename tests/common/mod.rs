//! Shared utilities for integration tests: a scriptable ICY upstream and a
//! helper that runs the relay server on an ephemeral port.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use radio_relay::config::RelayConfig;
use radio_relay::relay::SessionTracker;
use radio_relay::{HttpServer, Shutdown};

/// What the stream (GET) response body looks like.
#[derive(Clone)]
pub enum BodyPlan {
    /// Send these bytes, then close.
    Fixed(Vec<u8>),
    /// Send `chunk` bytes every `interval` until the peer goes away.
    Endless { chunk: usize, interval: Duration },
}

#[derive(Clone)]
pub struct UpstreamPlan {
    pub probe_status: u16,
    pub probe_headers: Vec<(&'static str, &'static str)>,
    /// Status of the stream (GET) response.
    pub stream_status: u16,
    /// Accept the GET but never send a response head.
    pub stall_stream_head: bool,
    pub stream_headers: Vec<(&'static str, &'static str)>,
    pub body: BodyPlan,
}

impl Default for UpstreamPlan {
    fn default() -> Self {
        Self {
            probe_status: 200,
            probe_headers: Vec::new(),
            stream_status: 200,
            stall_stream_head: false,
            stream_headers: vec![("Content-Type", "audio/mpeg")],
            body: BodyPlan::Fixed(b"ID3audio".to_vec()),
        }
    }
}

/// Observations made by the mock upstream.
#[derive(Default)]
pub struct UpstreamStats {
    pub connections: AtomicUsize,
    pub heads: AtomicUsize,
    pub gets: AtomicUsize,
    /// Set when an endless body write failed because the peer left.
    pub stream_closed: AtomicBool,
    /// `Icy-MetaData` request header values, in arrival order.
    pub icy_metadata: Mutex<Vec<Option<String>>>,
}

pub struct MockUpstream {
    pub addr: SocketAddr,
    pub stats: Arc<UpstreamStats>,
}

impl MockUpstream {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

fn status_line(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        404 => "404 Not Found",
        405 => "405 Method Not Allowed",
        500 => "500 Internal Server Error",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

/// Read one request head. Returns (method, icy-metadata header).
async fn read_request(socket: &mut TcpStream) -> Option<(String, Option<String>)> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut tmp).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
    }

    let head = String::from_utf8_lossy(&buf).to_string();
    let mut lines = head.split("\r\n");
    let method = lines.next()?.split(' ').next()?.to_string();
    let icy = lines
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("icy-metadata"))
        .map(|(_, v)| v.trim().to_string());
    Some((method, icy))
}

fn render_headers(headers: &[(&str, &str)]) -> String {
    headers.iter().map(|(k, v)| format!("{}: {}\r\n", k, v)).collect()
}

async fn serve(mut socket: TcpStream, plan: UpstreamPlan, stats: Arc<UpstreamStats>) {
    let Some((method, icy)) = read_request(&mut socket).await else {
        return;
    };
    stats.icy_metadata.lock().unwrap().push(icy);

    if method == "HEAD" {
        stats.heads.fetch_add(1, Ordering::SeqCst);
        let response = format!(
            "HTTP/1.1 {}\r\n{}Content-Length: 0\r\nConnection: close\r\n\r\n",
            status_line(plan.probe_status),
            render_headers(&plan.probe_headers)
        );
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
        return;
    }

    stats.gets.fetch_add(1, Ordering::SeqCst);
    if plan.stall_stream_head {
        // Hold the connection open without answering.
        tokio::time::sleep(Duration::from_secs(30)).await;
        return;
    }
    if plan.stream_status != 200 {
        let response = format!(
            "HTTP/1.1 {}\r\n{}Content-Length: 0\r\nConnection: close\r\n\r\n",
            status_line(plan.stream_status),
            render_headers(&plan.stream_headers)
        );
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
        return;
    }

    let head = format!(
        "HTTP/1.1 200 OK\r\n{}Connection: close\r\n\r\n",
        render_headers(&plan.stream_headers)
    );
    if socket.write_all(head.as_bytes()).await.is_err() {
        return;
    }

    match plan.body {
        BodyPlan::Fixed(bytes) => {
            let _ = socket.write_all(&bytes).await;
            let _ = socket.shutdown().await;
        }
        BodyPlan::Endless { chunk, interval } => {
            let data = vec![0x55u8; chunk];
            loop {
                if socket.write_all(&data).await.is_err() || socket.flush().await.is_err() {
                    stats.stream_closed.store(true, Ordering::SeqCst);
                    break;
                }
                tokio::time::sleep(interval).await;
            }
        }
    }
}

/// Start a mock ICY upstream on an ephemeral port.
pub async fn start_upstream(plan: UpstreamPlan) -> MockUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let stats = Arc::new(UpstreamStats::default());

    let task_stats = stats.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    task_stats.connections.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(serve(socket, plan.clone(), task_stats.clone()));
                }
                Err(_) => break,
            }
        }
    });

    MockUpstream { addr, stats }
}

/// An address nothing listens on.
pub fn refused_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub struct RunningRelay {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub sessions: SessionTracker,
    pub handle: tokio::task::JoinHandle<()>,
}

impl RunningRelay {
    pub fn endpoint(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Run the relay server with `config` on an ephemeral port.
pub async fn start_relay(mut config: RelayConfig) -> RunningRelay {
    config.upstream.use_system_proxy = false;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config).unwrap();
    let sessions = server.sessions();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let (_, config_updates) = mpsc::unbounded_channel();

    let handle = tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    RunningRelay {
        addr,
        shutdown,
        sessions,
        handle,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Poll `cond` every 20ms until it holds or `limit` passes.
pub async fn eventually<F: Fn() -> bool>(limit: Duration, cond: F) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    cond()
}
