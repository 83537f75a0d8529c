//! Upstream proxy endpoints.
//!
//! Proxies are given as `host:port` or `host:port:username:password` and are
//! owned by the transport that uses them.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::error::{Error, Result};

/// Basic credentials for a proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyCredentials {
    pub username: String,
    pub password: String,
}

/// A resolved proxy target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    host: String,
    port: u16,
    credentials: Option<ProxyCredentials>,
}

impl ProxyEndpoint {
    /// Create an endpoint without credentials.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            credentials: None,
        }
    }

    /// Attach basic credentials.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(ProxyCredentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Parse `host:port` or `host:port:username:password`.
    pub fn parse(raw: &str) -> Result<Self> {
        let fields: Vec<&str> = raw.split(':').collect();
        let (host, port) = match fields.as_slice() {
            [host, port] | [host, port, _, _] => (*host, *port),
            _ => return Err(Error::InvalidProxy(raw.to_string())),
        };

        if host.is_empty() {
            return Err(Error::InvalidProxy(raw.to_string()));
        }
        let port: u16 = port
            .parse()
            .map_err(|_| Error::InvalidProxy(raw.to_string()))?;

        let endpoint = Self::new(host, port);
        match fields.as_slice() {
            [_, _, username, password] => Ok(endpoint.with_credentials(*username, *password)),
            _ => Ok(endpoint),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn credentials(&self) -> Option<&ProxyCredentials> {
        self.credentials.as_ref()
    }

    /// `host:port` of the proxy itself.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `Proxy-Authorization` header value, if credentials are set.
    pub fn basic_auth(&self) -> Option<String> {
        self.credentials.as_ref().map(|c| {
            let plain = format!("{}:{}", c.username, c.password);
            format!("Basic {}", BASE64.encode(plain))
        })
    }
}

impl FromStr for ProxyEndpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.credentials {
            Some(c) => write!(f, "{}:{}:{}:{}", self.host, self.port, c.username, c.password),
            None => write!(f, "{}:{}", self.host, self.port),
        }
    }
}

/// Parse a list of proxy strings, failing on the first malformed entry.
pub fn parse_proxies<S: AsRef<str>>(raw: &[S]) -> Result<Vec<ProxyEndpoint>> {
    raw.iter().map(|p| ProxyEndpoint::parse(p.as_ref())).collect()
}
