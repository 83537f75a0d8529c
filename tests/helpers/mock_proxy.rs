use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// HTTP CONNECT proxy that relays bytes to the requested target.
///
/// When `required_auth` is set, requests without that exact
/// `Proxy-Authorization` value are refused with 407.
pub struct MockConnectProxy {
    listener: TcpListener,
    port: u16,
    required_auth: Option<String>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl MockConnectProxy {
    pub async fn new() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        Ok(Self {
            listener,
            port,
            required_auth: None,
            seen: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn require_auth(mut self, value: impl Into<String>) -> Self {
        self.required_auth = Some(value.into());
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port` proxy string for this proxy.
    pub fn address(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    /// CONNECT request heads received so far.
    pub fn seen(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.seen)
    }

    pub fn start(self) -> tokio::task::JoinHandle<()> {
        let required_auth = Arc::new(self.required_auth);
        tokio::spawn(async move {
            while let Ok((client, _)) = self.listener.accept().await {
                let seen = Arc::clone(&self.seen);
                let required_auth = Arc::clone(&required_auth);
                tokio::spawn(async move {
                    if let Err(e) = relay(client, seen, required_auth.as_deref()).await {
                        tracing::warn!("proxy relay ended: {}", e);
                    }
                });
            }
        })
    }
}

async fn relay(
    mut client: TcpStream,
    seen: Arc<Mutex<Vec<String>>>,
    required_auth: Option<&str>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = client.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let head = String::from_utf8_lossy(&buf).into_owned();
    seen.lock().unwrap().push(head.clone());

    let target = head
        .split_whitespace()
        .nth(1)
        .unwrap_or_default()
        .to_string();
    let auth = head
        .split("\r\n")
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("proxy-authorization"))
        .map(|(_, v)| v.trim().to_string());

    if let Some(expected) = required_auth {
        if auth.as_deref() != Some(expected) {
            client
                .write_all(b"HTTP/1.1 407 Proxy Authentication Required\r\nContent-Length: 0\r\n\r\n")
                .await?;
            return Ok(());
        }
    }

    let mut upstream = match TcpStream::connect(target.as_str()).await {
        Ok(upstream) => upstream,
        Err(_) => {
            client.write_all(b"HTTP/1.1 502 Bad Gateway\r\nContent-Length: 0\r\n\r\n").await?;
            return Ok(());
        }
    };
    client.write_all(b"HTTP/1.1 200 Connection established\r\n\r\n").await?;
    tokio::io::copy_bidirectional(&mut client, &mut upstream).await?;
    Ok(())
}
