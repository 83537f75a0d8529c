//! HTTP/2 client session built on the h2 crate.
//!
//! Each session is created over one TLS stream, sends the identity's SETTINGS
//! and carries a single request stream. The connection driver runs on its own
//! task and finishes once the session handle and the response body are gone.

use bytes::Bytes;
use h2::client::{Builder, SendRequest};
use http::header::{HeaderName, HeaderValue};

use crate::error::{Error, Result};
use crate::fingerprint::Http2Settings;
use crate::request::Request;
use crate::response::Response;
use crate::transport::connector::MaybeHttpsStream;

/// Connection-specific fields that HTTP/2 forbids (RFC 9113 section 8.2.2).
const CONNECTION_SPECIFIC_HEADERS: &[&str] = &[
    "connection",
    "host",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "upgrade",
];

/// Multiplexed client session over one connection.
pub struct H2Session {
    send_request: SendRequest<Bytes>,
}

impl H2Session {
    /// Perform the HTTP/2 preface with `settings` and spawn the driver.
    pub async fn handshake(stream: MaybeHttpsStream, settings: &Http2Settings) -> Result<Self> {
        let builder = configure_builder(settings);

        let handshake = builder.handshake::<_, Bytes>(stream);
        let (send_request, connection) = match settings.handshake_timeout {
            Some(limit) => tokio::time::timeout(limit, handshake)
                .await
                .map_err(|_| Error::session(format!("HTTP/2 handshake timed out after {:?}", limit)))?,
            None => handshake.await,
        }
        .map_err(|e| Error::session(format!("HTTP/2 handshake failed: {}", e)))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("HTTP/2 connection error: {}", e);
            }
        });

        Ok(Self { send_request })
    }

    /// Send `request` as one stream and collect the full response.
    pub async fn send_request(self, request: Request) -> Result<Response> {
        let mut sender = self
            .send_request
            .ready()
            .await
            .map_err(|e| Error::session(format!("HTTP/2 not ready: {}", e)))?;

        let (method, uri, headers, body) = request.into_parts();
        let head = build_request(method, uri, &headers)?;
        let end_of_stream = body.as_ref().map_or(true, |b| b.is_empty());

        let (response_future, mut send_stream) = sender
            .send_request(head, end_of_stream)
            .map_err(|e| Error::session(format!("Failed to send HTTP/2 request: {}", e)))?;

        if let Some(body) = body.filter(|b| !b.is_empty()) {
            send_stream
                .send_data(body, true)
                .map_err(|e| Error::session(format!("Failed to send request body: {}", e)))?;
        }

        let response = response_future
            .await
            .map_err(|e| Error::session(format!("HTTP/2 response error: {}", e)))?;

        let status = response.status().as_u16();
        let response_headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned())
            })
            .collect();

        let mut body = response.into_body();
        let mut body_bytes = Vec::new();
        while let Some(chunk) = body.data().await {
            let chunk =
                chunk.map_err(|e| Error::session(format!("Failed to read response body: {}", e)))?;
            body_bytes.extend_from_slice(&chunk);
            let _ = body.flow_control().release_capacity(chunk.len());
        }

        Ok(Response::new(
            status,
            http::Version::HTTP_2,
            response_headers,
            Bytes::from(body_bytes),
        ))
    }
}

fn configure_builder(settings: &Http2Settings) -> Builder {
    let mut builder = Builder::new();
    if let Some(size) = settings.header_table_size {
        builder.header_table_size(size);
    }
    if let Some(push) = settings.enable_push {
        builder.enable_push(push);
    }
    if let Some(max) = settings.max_concurrent_streams {
        builder.max_concurrent_streams(max);
    }
    if let Some(size) = settings.initial_window_size {
        builder.initial_window_size(size);
    }
    if let Some(size) = settings.max_frame_size {
        builder.max_frame_size(size);
    }
    if let Some(size) = settings.max_header_list_size {
        builder.max_header_list_size(size);
    }
    if let Some(size) = settings.connection_window_size {
        builder.initial_connection_window_size(size);
    }
    builder
}

/// Build the request head; h2 derives the pseudo-headers from the URI.
fn build_request(
    method: http::Method,
    uri: http::Uri,
    headers: &[(String, String)],
) -> Result<http::Request<()>> {
    let mut request = http::Request::builder().method(method).uri(uri);

    for (name, value) in headers {
        if name.starts_with(':') || is_connection_specific(name, value) {
            continue;
        }
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::session(format!("Invalid header name {:?}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::session(format!("Invalid header value for {}: {}", name, e)))?;
        request = request.header(name, value);
    }

    request
        .body(())
        .map_err(|e| Error::session(format!("Failed to build request: {}", e)))
}

/// `te` is only allowed with the value "trailers".
fn is_connection_specific(name: &str, value: &str) -> bool {
    CONNECTION_SPECIFIC_HEADERS
        .iter()
        .any(|h| name.eq_ignore_ascii_case(h))
        || (name.eq_ignore_ascii_case("te") && !value.eq_ignore_ascii_case("trailers"))
}
