//! Error types for guise crate.

use std::io;
use std::time::Duration;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Phase of a round trip an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPhase {
    /// Dialing the origin or establishing a proxy tunnel.
    Acquisition,
    /// TLS negotiation.
    Handshake,
    /// HTTP/1.1 or HTTP/2 exchange after the connection is ready.
    Protocol,
    /// Invalid caller-supplied configuration.
    Configuration,
    /// Client-level concerns (deadline, body decoding).
    Client,
}

/// Errors that can occur during HTTP operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Dial or tunnel failure.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Proxy list was non-empty but no proxy produced a connection.
    #[error("No working proxy available")]
    NoWorkingProxy,

    /// Proxy connection establishment exceeded its bound.
    #[error("Connect timeout after {0:?}")]
    ConnectTimeout(Duration),

    /// TLS/SSL error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// ALPN negotiated a protocol we do not speak.
    #[error("Unsupported HTTP version: {0}")]
    UnsupportedProtocol(String),

    /// URL scheme is neither http nor https.
    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),

    /// Serializing or writing an HTTP/1.1 request failed.
    #[error("HTTP/1.1 write error: {0}")]
    Write(String),

    /// The HTTP/1.1 response could not be parsed.
    #[error("HTTP/1.1 parse error: {0}")]
    Parse(String),

    /// HTTP/2 session or stream failure.
    #[error("HTTP/2 session error: {0}")]
    Session(String),

    /// Malformed proxy string.
    #[error("Invalid proxy string: {0}")]
    InvalidProxy(String),

    /// Request URL could not be parsed or joined.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Other invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// URL parsing error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Total request deadline exceeded.
    #[error("Request deadline exceeded after {0:?}")]
    Timeout(Duration),

    /// Decompression error.
    #[error("Decompression error: {0}")]
    Decompression(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an HTTP/1.1 write error.
    pub fn write(message: impl Into<String>) -> Self {
        Self::Write(message.into())
    }

    /// Create an HTTP/1.1 parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Create an HTTP/2 session error.
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Which phase of the round trip produced this error.
    pub fn phase(&self) -> ErrorPhase {
        match self {
            Self::Connection(_) | Self::NoWorkingProxy | Self::ConnectTimeout(_) => {
                ErrorPhase::Acquisition
            }
            Self::Tls(_) => ErrorPhase::Handshake,
            Self::UnsupportedProtocol(_)
            | Self::UnsupportedScheme(_)
            | Self::Write(_)
            | Self::Parse(_)
            | Self::Session(_) => ErrorPhase::Protocol,
            Self::InvalidProxy(_) | Self::InvalidUrl(_) | Self::Config(_) | Self::UrlParse(_) => {
                ErrorPhase::Configuration
            }
            Self::Timeout(_) | Self::Decompression(_) | Self::Json(_) | Self::Io(_) => {
                ErrorPhase::Client
            }
        }
    }

    /// Whether this error came from connection acquisition.
    pub fn is_connect(&self) -> bool {
        self.phase() == ErrorPhase::Acquisition
    }
}
