//! HTTP/1.1 request writer and response reader over a single stream.
//!
//! Uses httparse for response parsing and raw I/O so header order on the
//! wire is exactly the caller's. One request per connection; nothing is
//! pooled.

use bytes::Bytes;
use http::{Method, Version};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::request::Request;
use crate::response::Response;
use crate::transport::connector::MaybeHttpsStream;
use crate::transport::dial::format_authority;

/// Maximum response header size (64KB).
const MAX_HEADERS_SIZE: usize = 64 * 1024;

/// Maximum number of headers to parse.
const MAX_HEADERS_COUNT: usize = 100;

const READ_CHUNK: usize = 8192;

/// Largest body accepted under any framing (256MB).
const MAX_BODY_SIZE: usize = 256 * 1024 * 1024;

/// Longest chunk-size line, extensions included.
const MAX_CHUNK_LINE: usize = 4096;

/// HTTP/1.1 exchange on an owned stream.
pub struct H1Connection {
    stream: MaybeHttpsStream,
}

impl H1Connection {
    pub fn new(stream: MaybeHttpsStream) -> Self {
        Self { stream }
    }

    /// Write `request` and read its response.
    pub async fn send_request(&mut self, request: &Request) -> Result<Response> {
        let head = build_request_head(request)?;
        self.stream
            .write_all(&head)
            .await
            .map_err(|e| Error::write(format!("Failed to write request: {}", e)))?;

        if let Some(body) = request.body_bytes() {
            self.stream
                .write_all(body)
                .await
                .map_err(|e| Error::write(format!("Failed to write body: {}", e)))?;
        }

        self.stream
            .flush()
            .await
            .map_err(|e| Error::write(format!("Failed to flush: {}", e)))?;

        self.read_response(request.method()).await
    }

    /// Close the connection, sending close_notify on TLS streams.
    pub async fn close(mut self) {
        if let Err(e) = self.stream.shutdown().await {
            tracing::debug!("HTTP/1.1 shutdown: {}", e);
        }
    }

    /// Read the final response, skipping 1xx interim responses.
    async fn read_response(&mut self, method: &Method) -> Result<Response> {
        // Bytes after an interim response belong to the next one.
        let mut buffer = Vec::with_capacity(READ_CHUNK);

        loop {
            while find_header_end(&buffer).is_none() {
                if buffer.len() >= MAX_HEADERS_SIZE {
                    return Err(Error::parse("Response headers too large"));
                }
                if self.fill(&mut buffer).await? == 0 {
                    return Err(Error::parse("Connection closed before response headers"));
                }
            }

            let (response, consumed) = self.parse_response(&buffer, method).await?;
            buffer.drain(..consumed.min(buffer.len()));

            if (100..200).contains(&response.status) {
                continue;
            }
            return Ok(response);
        }
    }

    /// Parse headers from `buffer` and read the body, returning bytes of
    /// `buffer` used.
    async fn parse_response(&mut self, buffer: &[u8], method: &Method) -> Result<(Response, usize)> {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS_COUNT];
        let mut response = httparse::Response::new(&mut headers);

        let headers_len = match response
            .parse(buffer)
            .map_err(|e| Error::parse(format!("Failed to parse response: {}", e)))?
        {
            httparse::Status::Complete(len) => len,
            httparse::Status::Partial => return Err(Error::parse("Incomplete response headers")),
        };

        let status = response
            .code
            .ok_or_else(|| Error::parse("Missing status code"))?;
        let version = match response.version {
            Some(0) => Version::HTTP_10,
            _ => Version::HTTP_11,
        };

        let response_headers: Vec<(String, String)> = response
            .headers
            .iter()
            .filter(|h| !h.name.is_empty())
            .map(|h| (h.name.to_string(), String::from_utf8_lossy(h.value).into_owned()))
            .collect();

        // HEAD, 1xx, 204 and 304 never carry a body.
        let has_body = !matches!(status, 100..=199 | 204 | 304) && *method != Method::HEAD;
        if !has_body {
            return Ok((Response::new(status, version, response_headers, Bytes::new()), headers_len));
        }

        let transfer_encoding = find_header_value(&response_headers, "transfer-encoding");
        let is_chunked = transfer_encoding
            .and_then(|v| v.split(',').next_back())
            .map(|s| s.trim().eq_ignore_ascii_case("chunked"))
            .unwrap_or(false);

        // Transfer-Encoding overrides Content-Length.
        let content_length = match (transfer_encoding, find_header_value(&response_headers, "content-length")) {
            (None, Some(cl)) => Some(parse_content_length(cl)?),
            _ => None,
        };

        let body_start = &buffer[headers_len..];
        let (body, consumed) = if is_chunked {
            (self.read_chunked_body(body_start.to_vec()).await?, buffer.len())
        } else if let Some(len) = content_length {
            let body = self.read_fixed_body(body_start, len).await?;
            (body, headers_len + body_start.len().min(len))
        } else {
            (self.read_until_close(body_start).await?, buffer.len())
        };

        Ok((Response::new(status, version, response_headers, body), consumed))
    }

    async fn fill(&mut self, buffer: &mut Vec<u8>) -> Result<usize> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = self
            .stream
            .read(&mut chunk)
            .await
            .map_err(|e| Error::parse(format!("Failed to read response: {}", e)))?;
        buffer.extend_from_slice(&chunk[..n]);
        Ok(n)
    }

    async fn read_until_close(&mut self, initial: &[u8]) -> Result<Bytes> {
        let mut body = initial.to_vec();
        while self.fill(&mut body).await? > 0 {
            if body.len() > MAX_BODY_SIZE {
                return Err(Error::parse("Response body exceeds size limit"));
            }
        }
        Ok(Bytes::from(body))
    }

    /// A short body (connection closed early) is an error.
    async fn read_fixed_body(&mut self, initial: &[u8], content_length: usize) -> Result<Bytes> {
        if content_length > MAX_BODY_SIZE {
            return Err(Error::parse(format!(
                "Content-Length {} exceeds size limit",
                content_length
            )));
        }
        // Grows with what actually arrives.
        let mut body = Vec::with_capacity(content_length.min(READ_CHUNK * 8));
        body.extend_from_slice(&initial[..initial.len().min(content_length)]);

        while body.len() < content_length {
            if self.fill(&mut body).await? == 0 {
                return Err(Error::parse(format!(
                    "Connection closed before receiving full body (got {} of {} bytes)",
                    body.len(),
                    content_length
                )));
            }
        }
        body.truncate(content_length);
        Ok(Bytes::from(body))
    }

    /// chunked-body = *chunk last-chunk trailer-section CRLF
    async fn read_chunked_body(&mut self, initial: Vec<u8>) -> Result<Bytes> {
        let mut body = Vec::new();
        let mut buffer = initial;

        loop {
            let (chunk_size, line_end) = loop {
                if let Some(found) = find_chunk_size(&buffer)? {
                    break found;
                }
                if self.fill(&mut buffer).await? == 0 {
                    return Err(Error::parse("Connection closed while reading chunk size"));
                }
            };
            buffer.drain(..line_end);

            if chunk_size == 0 {
                self.consume_trailers(&mut buffer).await?;
                break;
            }

            let chunk_end = chunk_size
                .checked_add(2)
                .filter(|_| body.len() + chunk_size <= MAX_BODY_SIZE)
                .ok_or_else(|| Error::parse("Chunked body exceeds size limit"))?;
            while buffer.len() < chunk_end {
                if self.fill(&mut buffer).await? == 0 {
                    return Err(Error::parse("Connection closed while reading chunk data"));
                }
            }
            if &buffer[chunk_size..chunk_end] != b"\r\n" {
                return Err(Error::parse("Chunk data not terminated by CRLF"));
            }

            body.extend_from_slice(&buffer[..chunk_size]);
            buffer.drain(..chunk_end);
        }

        Ok(Bytes::from(body))
    }

    /// Skip trailer fields up to the terminating empty line.
    async fn consume_trailers(&mut self, buffer: &mut Vec<u8>) -> Result<()> {
        loop {
            if let Some(pos) = find_crlf(buffer) {
                buffer.drain(..pos + 2);
                if pos == 0 {
                    return Ok(());
                }
                continue;
            }
            if buffer.len() > MAX_HEADERS_SIZE {
                return Err(Error::parse("Trailer section too large"));
            }
            // A missing final CRLF before close is tolerated.
            if self.fill(buffer).await? == 0 {
                return Ok(());
            }
        }
    }
}

/// Serialize the request line and header block.
///
/// Host comes first, then caller headers in order, then Connection and
/// Content-Length unless the caller set them.
fn build_request_head(request: &Request) -> Result<Vec<u8>> {
    let headers = request.headers();
    for (name, value) in headers {
        validate_header_name(name)?;
        validate_header_value(value)?;
    }

    let uri = request.uri();
    let mut head = Vec::with_capacity(1024);

    head.extend_from_slice(request.method().as_str().as_bytes());
    head.push(b' ');
    let target = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    head.extend_from_slice(if target.is_empty() { "/" } else { target }.as_bytes());
    head.extend_from_slice(b" HTTP/1.1\r\n");

    head.extend_from_slice(b"Host: ");
    head.extend_from_slice(host_field(request.host(), uri.port_u16()).as_bytes());
    head.extend_from_slice(b"\r\n");

    for (name, value) in headers {
        if name.eq_ignore_ascii_case("host") {
            continue;
        }
        head.extend_from_slice(name.as_bytes());
        head.extend_from_slice(b": ");
        head.extend_from_slice(value.as_bytes());
        head.extend_from_slice(b"\r\n");
    }

    if !request.has_header("connection") {
        head.extend_from_slice(b"Connection: keep-alive\r\n");
    }

    // Never both Content-Length and Transfer-Encoding.
    if let Some(body) = request.body_bytes() {
        if !request.has_header("transfer-encoding") && !request.has_header("content-length") {
            head.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
        }
    }

    head.extend_from_slice(b"\r\n");
    Ok(head)
}

fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

/// Host header value; IPv6 literals are bracketed again.
fn host_field(host: &str, port: Option<u16>) -> String {
    match (host.contains(':'), port) {
        (_, Some(port)) => format_authority(host, port),
        (true, None) => format!("[{}]", host),
        (false, None) => host.to_string(),
    }
}

fn find_header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(hname, _)| hname.eq_ignore_ascii_case(name))
        .map(|(_, hvalue)| hvalue.as_str())
}

/// Parse a chunk size line, returning (size, end_of_line_position), or
/// `None` while the line is still incomplete.
/// Chunk extensions after `;` are ignored.
fn find_chunk_size(buffer: &[u8]) -> Result<Option<(usize, usize)>> {
    let Some(i) = find_crlf(buffer) else {
        if buffer.len() > MAX_CHUNK_LINE {
            return Err(Error::parse("Chunk size line too long"));
        }
        return Ok(None);
    };
    let invalid = || {
        Error::parse(format!(
            "Invalid chunk size line: {:?}",
            String::from_utf8_lossy(&buffer[..i])
        ))
    };

    let line = std::str::from_utf8(&buffer[..i]).map_err(|_| invalid())?;
    let size_part = line.split(';').next().unwrap_or_default().trim();
    if size_part.is_empty() || !size_part.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let size = usize::from_str_radix(size_part, 16).map_err(|_| invalid())?;
    if size > MAX_BODY_SIZE {
        return Err(Error::parse(format!("Chunk size {:#x} exceeds size limit", size)));
    }
    Ok(Some((size, i + 2)))
}

fn find_crlf(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\r\n")
}

/// Header names must be RFC 9110 tokens.
fn validate_header_name(name: &str) -> Result<()> {
    if name.is_empty() || !name.bytes().all(is_tchar) {
        return Err(Error::write(format!("Invalid header name: {:?}", name)));
    }
    Ok(())
}

fn is_tchar(b: u8) -> bool {
    matches!(b,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' |
        b'^' | b'_' | b'`' | b'|' | b'~' | b'0'..=b'9' | b'A'..=b'Z' | b'a'..=b'z'
    )
}

/// Reject NUL, CR and LF (header injection).
fn validate_header_value(value: &str) -> Result<()> {
    if value.bytes().any(|b| b == 0 || b == b'\r' || b == b'\n') {
        return Err(Error::write(
            "Invalid character in header value (CR/LF/NUL not allowed)",
        ));
    }
    Ok(())
}

/// Repeated Content-Length values must agree.
fn parse_content_length(value: &str) -> Result<usize> {
    let mut lengths = value.split(',').map(|s| {
        s.trim()
            .parse::<usize>()
            .map_err(|_| Error::parse(format!("Invalid Content-Length: {}", value)))
    });

    let first = lengths
        .next()
        .ok_or_else(|| Error::parse("Empty Content-Length"))??;
    for len in lengths {
        if len? != first {
            return Err(Error::parse(format!("Conflicting Content-Length values: {}", value)));
        }
    }
    Ok(first)
}
