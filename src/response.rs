//! Fully buffered response produced by either protocol strategy.

use std::io::Read;

use bytes::Bytes;
use http::Version;

use crate::error::{Error, Result};

/// Status, ordered header fields and the raw body of one exchange.
#[derive(Debug)]
pub struct Response {
    pub status: u16,
    /// Header fields as `(name, value)` in wire order, names as received.
    pub headers: Vec<(String, String)>,
    body: Bytes,
    version: Version,
    /// Set by the client to the URL that was requested.
    pub effective_url: Option<String>,
}

/// Content codings understood by [`Response::decoded_body`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Coding {
    Identity,
    Gzip,
    Deflate,
    Brotli,
    Zstd,
}

impl Coding {
    /// Unknown codings are passed through untouched.
    fn from_header(value: Option<&str>) -> Self {
        let Some(value) = value else {
            return Self::Identity;
        };
        match value.trim().to_ascii_lowercase().as_str() {
            "gzip" | "x-gzip" => Self::Gzip,
            "deflate" => Self::Deflate,
            "br" => Self::Brotli,
            "zstd" => Self::Zstd,
            _ => Self::Identity,
        }
    }

    fn decode(self, data: &[u8]) -> Result<Bytes> {
        let mut out = Vec::new();
        let outcome = match self {
            Self::Identity => return Ok(Bytes::copy_from_slice(data)),
            Self::Gzip => flate2::read::GzDecoder::new(data).read_to_end(&mut out),
            // Servers label both zlib-wrapped and raw deflate this way.
            Self::Deflate => flate2::read::ZlibDecoder::new(data)
                .read_to_end(&mut out)
                .or_else(|_| {
                    out.clear();
                    flate2::read::DeflateDecoder::new(data).read_to_end(&mut out)
                }),
            Self::Brotli => brotli::Decompressor::new(data, 4096).read_to_end(&mut out),
            Self::Zstd => zstd::stream::read::Decoder::new(data)
                .and_then(|mut decoder| decoder.read_to_end(&mut out)),
        };
        outcome.map_err(|e| Error::Decompression(format!("{:?}: {}", self, e)))?;
        Ok(Bytes::from(out))
    }
}

impl Response {
    pub fn new(status: u16, version: Version, headers: Vec<(String, String)>, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
            version,
            effective_url: None,
        }
    }

    /// Record the URL this response answers.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.effective_url = Some(url.into());
        self
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Protocol label: "HTTP/1.0", "HTTP/1.1" or "HTTP/2".
    pub fn http_version(&self) -> &'static str {
        match self.version {
            Version::HTTP_09 => "HTTP/0.9",
            Version::HTTP_10 => "HTTP/1.0",
            Version::HTTP_2 => "HTTP/2",
            Version::HTTP_3 => "HTTP/3",
            _ => "HTTP/1.1",
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First value of the named header (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Every value of the named header, in wire order.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Body exactly as received.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Body with `Content-Encoding` removed (gzip, deflate, br, zstd).
    pub fn decoded_body(&self) -> Result<Bytes> {
        Coding::from_header(self.header("content-encoding")).decode(&self.body)
    }

    pub fn text(&self) -> Result<String> {
        let decoded = self.decoded_body()?;
        String::from_utf8(decoded.to_vec())
            .map_err(|e| Error::Decompression(format!("body is not UTF-8: {}", e)))
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.decoded_body()?)?)
    }
}
