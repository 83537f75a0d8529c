//! Fingerprinting HTTP transport.
//!
//! - Connection acquisition: direct TCP or CONNECT tunnel ([`dial`])
//! - TLS via BoringSSL with a chosen Client Hello ([`connector`])
//! - HTTP/1.1 over raw framing ([`h1`]) or HTTP/2 via h2 ([`h2`]), picked by ALPN

pub mod connector;
pub mod dial;
pub mod h1;
pub mod h2;

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::fingerprint::ClientHello;
use crate::proxy::ProxyEndpoint;
use crate::request::Request;
use crate::response::Response;

use self::connector::{MaybeHttpsStream, NegotiatedProtocol, TlsConnector, TlsOptions};
use self::h1::H1Connection;
use self::h2::H2Session;

/// Sends requests with a controlled TLS Client Hello.
///
/// Every [`round_trip`](Self::round_trip) acquires its own connection and owns
/// it until the response is read, so one transport can be shared across tasks
/// (for example behind an `Arc`) without requests interfering.
#[derive(Debug)]
pub struct Transport {
    client_hello: RwLock<ClientHello>,
    proxies: Vec<ProxyEndpoint>,
    connector: TlsConnector,
    proxy_connect_timeout: Duration,
}

impl Transport {
    /// Create a transport presenting `client_hello`, tunneling through the
    /// first of `proxies` when any are given.
    ///
    /// Server certificates are NOT verified. Use
    /// [`with_tls_options`](Self::with_tls_options) with
    /// [`TlsOptions::verified`] to turn verification on.
    pub fn new(client_hello: ClientHello, proxies: Vec<ProxyEndpoint>) -> Self {
        Self::with_tls_options(
            client_hello,
            proxies,
            TlsOptions::danger_accept_invalid_certs(),
        )
    }

    /// Create a transport with explicit certificate trust settings.
    pub fn with_tls_options(
        client_hello: ClientHello,
        proxies: Vec<ProxyEndpoint>,
        tls: TlsOptions,
    ) -> Self {
        Self {
            client_hello: RwLock::new(client_hello),
            proxies,
            connector: TlsConnector::new(tls),
            proxy_connect_timeout: dial::PROXY_CONNECT_TIMEOUT,
        }
    }

    /// Override the bound on proxy tunnel establishment.
    pub fn proxy_connect_timeout(mut self, timeout: Duration) -> Self {
        self.proxy_connect_timeout = timeout;
        self
    }

    /// Replace the identity used by handshakes started after this returns.
    pub async fn set_client_hello(&self, client_hello: ClientHello) {
        let mut current = self.client_hello.write().await;
        tracing::debug!(from = %*current, to = %client_hello, "client hello replaced");
        *current = client_hello;
    }

    /// Snapshot of the current identity.
    pub async fn client_hello(&self) -> ClientHello {
        self.client_hello.read().await.clone()
    }

    pub fn proxies(&self) -> &[ProxyEndpoint] {
        &self.proxies
    }

    pub fn tls_options(&self) -> &TlsOptions {
        self.connector.options()
    }

    /// Send one request and read its response.
    pub async fn round_trip(&self, request: Request) -> Result<Response> {
        match request.uri().scheme_str() {
            Some("https") => {
                let stream = self.acquire(&request).await?;
                self.https_round_trip(stream, request).await
            }
            Some("http") => {
                let stream = self.acquire(&request).await?;
                http_round_trip(MaybeHttpsStream::Http(stream), request).await
            }
            other => Err(Error::UnsupportedScheme(other.unwrap_or_default().to_string())),
        }
    }

    async fn acquire(&self, request: &Request) -> Result<TcpStream> {
        dial::acquire(
            &self.proxies,
            request.host(),
            request.port(),
            self.proxy_connect_timeout,
        )
        .await
    }

    async fn https_round_trip(&self, stream: TcpStream, request: Request) -> Result<Response> {
        // The lock is released before the handshake starts.
        let client_hello = self.client_hello().await;

        let tls = self
            .connector
            .handshake(stream, request.host(), &client_hello.tls_fingerprint())
            .await?;
        let stream = MaybeHttpsStream::Https(tls);

        let protocol = stream.negotiated_protocol();
        tracing::debug!(host = request.host(), hello = %client_hello, ?protocol, "handshake complete");

        match protocol {
            NegotiatedProtocol::Http2 => {
                let session = H2Session::handshake(stream, &client_hello.http2_settings()).await?;
                session.send_request(request).await
            }
            NegotiatedProtocol::Http11 => http_round_trip(stream, request).await,
            NegotiatedProtocol::Other(proto) => Err(Error::UnsupportedProtocol(proto)),
        }
    }
}

async fn http_round_trip(stream: MaybeHttpsStream, request: Request) -> Result<Response> {
    let mut conn = H1Connection::new(stream);
    let result = conn.send_request(&request).await;
    conn.close().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_client_hello_visible_to_next_snapshot() {
        let transport = Transport::new(ClientHello::Chrome102, Vec::new());
        let before = transport.client_hello().await;

        transport.set_client_hello(ClientHello::Firefox120).await;

        assert_eq!(before, ClientHello::Chrome102);
        assert_eq!(transport.client_hello().await, ClientHello::Firefox120);
    }

    #[tokio::test]
    async fn test_unsupported_scheme() {
        let transport = Transport::new(ClientHello::default(), Vec::new());
        let request = Request::get("ftp://example.com/file").unwrap();
        let err = transport.round_trip(request).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedScheme(ref s) if s == "ftp"));
    }

    #[test]
    fn test_new_transport_skips_verification() {
        let transport = Transport::new(ClientHello::default(), Vec::new());
        assert!(transport.tls_options().danger_accept_invalid_certs);

        let verified =
            Transport::with_tls_options(ClientHello::default(), Vec::new(), TlsOptions::verified());
        assert!(!verified.tls_options().danger_accept_invalid_certs);
    }

    #[test]
    fn test_transport_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Transport>();
    }
}
