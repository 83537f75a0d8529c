//! # Guise
//!
//! HTTP client transport with TLS Client Hello fingerprint control.
//!
//! Guise presents a browser-like Client Hello through BoringSSL, optionally
//! tunnels through an HTTP CONNECT proxy, and speaks HTTP/1.1 or HTTP/2
//! depending on what the server selects via ALPN.

pub mod client;
pub mod cookie;
pub mod error;
pub mod fingerprint;
pub mod proxy;
pub mod request;
pub mod response;
pub mod transport;

// Re-exports
pub use client::{Client, ClientBuilder, ClientConfig, RequestBuilder};
pub use cookie::{Cookie, CookieJar};
pub use error::{Error, ErrorPhase, Result};
pub use fingerprint::{CertCompression, ClientHello, Http2Settings, TlsFingerprint};
pub use proxy::{parse_proxies, ProxyCredentials, ProxyEndpoint};
pub use request::Request;
pub use response::Response;
pub use transport::connector::TlsOptions;
pub use transport::Transport;
