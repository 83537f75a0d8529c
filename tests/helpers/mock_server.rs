use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use boring::ssl::SslAcceptor;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::timeout;

/// Path that answers only after [`SLOW_DELAY`].
pub const SLOW_PATH: &str = "/slow";
pub const SLOW_DELAY: Duration = Duration::from_secs(3);

/// A simple HTTP/1.1 mock server.
///
/// Every response body starts with `"{METHOD} {path}\n"` followed by the
/// request header lines as received, so tests can check what went on the
/// wire. Each response also sets `session=abc`.
pub struct MockHttpServer {
    listener: TcpListener,
    port: u16,
    connections: Arc<AtomicUsize>,
}

impl MockHttpServer {
    /// Create a new mock server bound to a random port.
    pub async fn new() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        Ok(Self {
            listener,
            port,
            connections: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn url_tls(&self) -> String {
        format!("https://127.0.0.1:{}", self.port)
    }

    /// Counter of accepted TCP connections.
    pub fn connections(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.connections)
    }

    /// Serve plain HTTP/1.1 in a background task.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while let Ok((stream, _)) = self.listener.accept().await {
                self.connections.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(handle_connection(stream));
            }
        })
    }

    /// Serve HTTP/1.1 over TLS in a background task.
    pub fn start_tls(self, acceptor: SslAcceptor) -> tokio::task::JoinHandle<()> {
        let acceptor = Arc::new(acceptor);
        tokio::spawn(async move {
            while let Ok((stream, _)) = self.listener.accept().await {
                self.connections.fetch_add(1, Ordering::SeqCst);
                let acceptor = Arc::clone(&acceptor);
                tokio::spawn(async move {
                    match tokio_boring::accept(&acceptor, stream).await {
                        Ok(tls) => handle_connection(tls).await,
                        Err(e) => tracing::warn!("TLS accept failed: {}", e),
                    }
                });
            }
        })
    }
}

/// Read one request and answer it; the connection is closed afterwards.
async fn handle_connection<S>(mut stream: S)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = match timeout(Duration::from_secs(5), stream.read(&mut chunk)).await {
            Ok(Ok(n)) if n > 0 => n,
            _ => return,
        };
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.split("\r\n").filter(|l| !l.is_empty());
    let request_line = lines.next().unwrap_or_default().to_string();
    let header_lines: Vec<&str> = lines.collect();

    // Drain the body so the client never sees a reset.
    let content_length = header_lines
        .iter()
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        match stream.read(&mut chunk).await {
            Ok(n) if n > 0 => buf.extend_from_slice(&chunk[..n]),
            _ => return,
        }
    }
    let body = String::from_utf8_lossy(&buf[header_end..header_end + content_length]).into_owned();

    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default();
    let path = parts.next().unwrap_or("/");

    if path == SLOW_PATH {
        tokio::time::sleep(SLOW_DELAY).await;
    }

    let mut reply_body = format!("{} {}\n", method, path);
    for line in &header_lines {
        reply_body.push_str(line);
        reply_body.push('\n');
    }
    reply_body.push_str(&body);

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nSet-Cookie: session=abc; Path=/\r\nConnection: close\r\n\r\n{}",
        reply_body.len(),
        reply_body
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.flush().await;
    let _ = stream.shutdown().await;
}
