//! Outbound request as seen by the transport.

use bytes::Bytes;
use http::{Method, Uri};

use crate::error::{Error, Result};

/// A single HTTP request with an absolute URI and ordered headers.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: Vec<(String, String)>,
    body: Option<Bytes>,
}

impl Request {
    /// Create a request. The URI must be absolute (scheme and host).
    pub fn new(method: Method, uri: Uri) -> Result<Self> {
        if uri.scheme().is_none() || uri.host().is_none() {
            return Err(Error::InvalidUrl(format!("URI must be absolute: {}", uri)));
        }
        Ok(Self {
            method,
            uri,
            headers: Vec::new(),
            body: None,
        })
    }

    /// Parse `url` and create a request.
    pub fn parse(method: Method, url: &str) -> Result<Self> {
        let uri: Uri = url
            .parse()
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))?;
        Self::new(method, uri)
    }

    pub fn get(url: &str) -> Result<Self> {
        Self::parse(Method::GET, url)
    }

    pub fn post(url: &str) -> Result<Self> {
        Self::parse(Method::POST, url)
    }

    /// Append a header, keeping insertion order on the wire.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Vec<(String, String)> {
        &mut self.headers
    }

    pub fn body_bytes(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Whether a header with this name is present (case-insensitive).
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// Host without port. IPv6 literals come back without brackets, ready
    /// for dialing and SNI.
    pub fn host(&self) -> &str {
        // `new` guarantees a host.
        let host = self.uri.host().unwrap_or_default();
        host.strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host)
    }

    /// Port from the URI, or the scheme default (443 for https, 80 otherwise).
    pub fn port(&self) -> u16 {
        self.uri
            .port_u16()
            .unwrap_or(if self.uri.scheme_str() == Some("https") {
                443
            } else {
                80
            })
    }

    pub(crate) fn into_parts(self) -> (Method, Uri, Vec<(String, String)>, Option<Bytes>) {
        (self.method, self.uri, self.headers, self.body)
    }
}
