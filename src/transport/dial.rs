//! Connection acquisition: direct TCP or an HTTP CONNECT tunnel.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{Error, Result};
use crate::proxy::ProxyEndpoint;

/// Bound on reaching the proxy and completing the CONNECT exchange.
pub const PROXY_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest CONNECT reply header block we accept.
const MAX_TUNNEL_RESPONSE: usize = 8 * 1024;

/// Dial `host:port` over TCP.
pub async fn dial_direct(host: &str, port: u16) -> Result<TcpStream> {
    let stream = TcpStream::connect((host, port))
        .await
        .map_err(|e| Error::connection(format!("Failed to connect to {}:{}: {}", host, port, e)))?;
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(host, port, "TCP_NODELAY not set: {}", e);
    }
    tracing::debug!(host, port, "connected directly");
    Ok(stream)
}

/// Open a tunnel to `host:port` through `proxy`, bounded by `timeout`.
pub async fn dial_via_proxy(
    proxy: &ProxyEndpoint,
    host: &str,
    port: u16,
    timeout: Duration,
) -> Result<TcpStream> {
    let attempt = async {
        let stream = TcpStream::connect((proxy.host(), proxy.port()))
            .await
            .map_err(|e| {
                Error::connection(format!("Failed to connect to proxy {}: {}", proxy.authority(), e))
            })?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(proxy = %proxy.authority(), "TCP_NODELAY not set: {}", e);
        }
        tunnel(stream, proxy, host, port).await
    };

    let stream = tokio::time::timeout(timeout, attempt)
        .await
        .map_err(|_| Error::ConnectTimeout(timeout))??;
    tracing::debug!(host, port, proxy = %proxy.authority(), "tunnel established");
    Ok(stream)
}

/// Acquire a stream to `host:port`.
///
/// With proxies configured only the first one is tried; a failure there is
/// returned as is and the rest of the list is not consulted.
pub async fn acquire(
    proxies: &[ProxyEndpoint],
    host: &str,
    port: u16,
    proxy_timeout: Duration,
) -> Result<TcpStream> {
    if proxies.is_empty() {
        return dial_direct(host, port).await;
    }

    if let Some(proxy) = proxies.first() {
        return dial_via_proxy(proxy, host, port, proxy_timeout)
            .await
            .inspect_err(|e| {
                tracing::warn!(proxy = %proxy.authority(), "invalid proxy: {}", e);
            });
    }
    Err(Error::NoWorkingProxy)
}

/// CONNECT request for `host:port`.
fn connect_request(proxy: &ProxyEndpoint, host: &str, port: u16) -> Vec<u8> {
    let authority = format_authority(host, port);
    let mut request = format!("CONNECT {0} HTTP/1.1\r\nHost: {0}\r\n", authority);
    if let Some(auth) = proxy.basic_auth() {
        request.push_str("Proxy-Authorization: ");
        request.push_str(&auth);
        request.push_str("\r\n");
    }
    request.push_str("\r\n");
    request.into_bytes()
}

/// IPv6 literals need brackets in authority-form.
pub(crate) fn format_authority(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

async fn tunnel(mut stream: TcpStream, proxy: &ProxyEndpoint, host: &str, port: u16) -> Result<TcpStream> {
    stream
        .write_all(&connect_request(proxy, host, port))
        .await
        .map_err(|e| Error::connection(format!("Failed to send CONNECT: {}", e)))?;

    let mut buffer = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        if let Some(end) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break end + 4;
        }
        if buffer.len() > MAX_TUNNEL_RESPONSE {
            return Err(Error::connection("Proxy CONNECT response too large"));
        }
        let n = stream
            .read(&mut chunk)
            .await
            .map_err(|e| Error::connection(format!("Failed to read CONNECT response: {}", e)))?;
        if n == 0 {
            return Err(Error::connection("Proxy closed connection during CONNECT"));
        }
        buffer.extend_from_slice(&chunk[..n]);
    };

    let mut headers = [httparse::EMPTY_HEADER; 32];
    let mut response = httparse::Response::new(&mut headers);
    response
        .parse(&buffer[..header_end])
        .map_err(|e| Error::connection(format!("Malformed CONNECT response: {}", e)))?;

    match response.code {
        Some(code) if (200..300).contains(&code) => {}
        Some(code) => {
            return Err(Error::connection(format!(
                "Proxy refused tunnel to {}: {} {}",
                format_authority(host, port),
                code,
                response.reason.unwrap_or("")
            )))
        }
        None => return Err(Error::connection("CONNECT response without status")),
    }

    // The origin never speaks first, so anything here would be lost.
    if buffer.len() > header_end {
        return Err(Error::connection("Unexpected data after CONNECT response"));
    }
    Ok(stream)
}
