//! BoringSSL handshake with a controlled Client Hello.

use boring::ssl::{SslConnector, SslMethod, SslSessionCacheMode, SslVerifyMode, SslVersion};
use boring::x509::X509;
use std::io;
use std::io::Read;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_boring::SslStream;

use crate::error::{Error, Result};
use crate::fingerprint::{CertCompression, TlsFingerprint};

use boring_sys::{CRYPTO_BUFFER, SSL, SSL_CTX};
use std::os::raw::c_int;

/// Hand a decompressed certificate back to BoringSSL.
///
/// # Safety
/// `out` must be the output pointer BoringSSL passed to the callback.
unsafe fn emit_certificate(out: *mut *mut CRYPTO_BUFFER, data: &[u8]) -> c_int {
    // CRYPTO_BUFFER_new copies the data.
    let buffer = boring_sys::CRYPTO_BUFFER_new(data.as_ptr(), data.len(), std::ptr::null_mut());
    if buffer.is_null() {
        return 0;
    }
    *out = buffer;
    1
}

/// Brotli certificate decompression callback (RFC 8879).
unsafe extern "C" fn decompress_brotli_cert(
    _ssl: *mut SSL,
    out: *mut *mut CRYPTO_BUFFER,
    uncompressed_len: usize,
    in_: *const u8,
    in_len: usize,
) -> c_int {
    let compressed = std::slice::from_raw_parts(in_, in_len);
    let mut decompressed = Vec::with_capacity(uncompressed_len);
    let mut decoder = brotli::Decompressor::new(compressed, uncompressed_len.max(1));
    match decoder.read_to_end(&mut decompressed) {
        Ok(_) if decompressed.len() == uncompressed_len => emit_certificate(out, &decompressed),
        _ => 0,
    }
}

/// Zlib certificate decompression callback (RFC 8879).
unsafe extern "C" fn decompress_zlib_cert(
    _ssl: *mut SSL,
    out: *mut *mut CRYPTO_BUFFER,
    uncompressed_len: usize,
    in_: *const u8,
    in_len: usize,
) -> c_int {
    let compressed = std::slice::from_raw_parts(in_, in_len);
    let mut decompressed = Vec::with_capacity(uncompressed_len);
    let mut decoder = flate2::read::ZlibDecoder::new(compressed);
    match decoder.read_to_end(&mut decompressed) {
        Ok(_) if decompressed.len() == uncompressed_len => emit_certificate(out, &decompressed),
        _ => 0,
    }
}

/// Certificate trust settings for the handshake.
#[derive(Debug, Clone, Default)]
pub struct TlsOptions {
    /// Accept any server certificate and skip hostname checks.
    ///
    /// Off by default; the fingerprinting transport turns it on explicitly.
    pub danger_accept_invalid_certs: bool,
    /// Extra trust anchors (DER or PEM), used when verification is on.
    pub root_certs: Vec<Vec<u8>>,
}

impl TlsOptions {
    /// Options that verify against the system store.
    pub fn verified() -> Self {
        Self::default()
    }

    /// Options that trust any certificate the server presents.
    pub fn danger_accept_invalid_certs() -> Self {
        Self {
            danger_accept_invalid_certs: true,
            root_certs: Vec::new(),
        }
    }

    /// Add a trust anchor (DER or PEM).
    pub fn with_root_certificate(mut self, cert: impl Into<Vec<u8>>) -> Self {
        self.root_certs.push(cert.into());
        self
    }
}

/// Builds a BoringSSL context per handshake from a [`TlsFingerprint`].
#[derive(Debug, Clone, Default)]
pub struct TlsConnector {
    options: TlsOptions,
}

impl TlsConnector {
    pub fn new(options: TlsOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TlsOptions {
        &self.options
    }

    fn configure_ssl(&self, fp: &TlsFingerprint) -> Result<SslConnector> {
        let mut builder = SslConnector::builder(SslMethod::tls_client())
            .map_err(|e| Error::tls(format!("Failed to create SSL connector: {}", e)))?;

        if self.options.danger_accept_invalid_certs {
            builder.set_verify(SslVerifyMode::NONE);
        } else {
            for cert_bytes in &self.options.root_certs {
                let cert = X509::from_der(cert_bytes)
                    .or_else(|_| X509::from_pem(cert_bytes))
                    .map_err(|e| Error::tls(format!("Invalid root certificate: {}", e)))?;
                builder
                    .cert_store_mut()
                    .add_cert(cert)
                    .map_err(|e| Error::tls(format!("Failed to add root certificate: {}", e)))?;
            }
        }

        if !fp.cipher_list.is_empty() {
            builder
                .set_cipher_list(&fp.cipher_list.join(":"))
                .map_err(|e| Error::tls(format!("Failed to set cipher list: {}", e)))?;
        }

        if !fp.curves.is_empty() {
            builder
                .set_curves_list(&fp.curves.join(":"))
                .map_err(|e| Error::tls(format!("Failed to set curves: {}", e)))?;
        }

        if !fp.sigalgs.is_empty() {
            builder
                .set_sigalgs_list(&fp.sigalgs.join(":"))
                .map_err(|e| Error::tls(format!("Failed to set signature algorithms: {}", e)))?;
        }

        if fp.ocsp_stapling {
            builder.enable_ocsp_stapling();
        }
        if fp.signed_cert_timestamps {
            builder.enable_signed_cert_timestamps();
        }

        unsafe {
            let ctx = builder.as_ptr() as *mut SSL_CTX;
            boring_sys::SSL_CTX_set_grease_enabled(ctx, fp.grease as c_int);
            boring_sys::SSL_CTX_set_permute_extensions(ctx, fp.permute_extensions as c_int);

            // Client side only decompresses.
            match fp.cert_compression {
                CertCompression::Brotli => {
                    boring_sys::SSL_CTX_add_cert_compression_alg(
                        ctx,
                        boring_sys::TLSEXT_cert_compression_brotli as u16,
                        None,
                        Some(decompress_brotli_cert),
                    );
                }
                CertCompression::Zlib => {
                    boring_sys::SSL_CTX_add_cert_compression_alg(
                        ctx,
                        boring_sys::TLSEXT_cert_compression_zlib as u16,
                        None,
                        Some(decompress_zlib_cert),
                    );
                }
                CertCompression::None => {}
            }
        }

        builder
            .set_min_proto_version(Some(SslVersion::TLS1_2))
            .map_err(|e| Error::tls(format!("Failed to set min TLS version: {}", e)))?;
        builder
            .set_max_proto_version(Some(SslVersion::TLS1_3))
            .map_err(|e| Error::tls(format!("Failed to set max TLS version: {}", e)))?;

        builder.set_session_cache_mode(SslSessionCacheMode::CLIENT);

        let alpn = fp.alpn_wire();
        if !alpn.is_empty() {
            builder
                .set_alpn_protos(&alpn)
                .map_err(|e| Error::tls(format!("Failed to set ALPN: {}", e)))?;
        }

        Ok(builder.build())
    }

    /// Run the TLS handshake over `stream`, presenting `fp` in the Client Hello.
    ///
    /// SNI is set to `host` (BoringSSL omits it for IP literals).
    pub async fn handshake(
        &self,
        stream: TcpStream,
        host: &str,
        fp: &TlsFingerprint,
    ) -> Result<SslStream<TcpStream>> {
        let ssl_connector = self.configure_ssl(fp)?;

        let mut ssl_config = ssl_connector
            .configure()
            .map_err(|e| Error::tls(format!("Failed to configure SSL: {}", e)))?;
        if self.options.danger_accept_invalid_certs {
            ssl_config.set_verify_hostname(false);
        }

        tokio_boring::connect(ssl_config, host, stream)
            .await
            .map_err(|e| Error::tls(format!("TLS handshake failed: {}", e)))
    }
}

/// Application protocol agreed through ALPN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiatedProtocol {
    /// "h2"
    Http2,
    /// "http/1.1", or nothing negotiated
    Http11,
    /// Anything else the server selected.
    Other(String),
}

impl NegotiatedProtocol {
    pub fn from_alpn(alpn: Option<&[u8]>) -> Self {
        match alpn {
            Some(b"h2") => Self::Http2,
            None | Some(b"") | Some(b"http/1.1") => Self::Http11,
            Some(other) => Self::Other(String::from_utf8_lossy(other).into_owned()),
        }
    }

    pub fn is_h2(&self) -> bool {
        matches!(self, Self::Http2)
    }
}

/// Stream that can be either HTTP (plain TCP) or HTTPS (TLS).
#[derive(Debug)]
pub enum MaybeHttpsStream {
    /// Plain TCP stream for HTTP.
    Http(TcpStream),
    /// TLS-wrapped stream for HTTPS.
    Https(SslStream<TcpStream>),
}

impl MaybeHttpsStream {
    /// Protocol negotiated during the TLS handshake.
    ///
    /// Plain TCP has no negotiation and always reports HTTP/1.1.
    pub fn negotiated_protocol(&self) -> NegotiatedProtocol {
        match self {
            MaybeHttpsStream::Http(_) => NegotiatedProtocol::Http11,
            MaybeHttpsStream::Https(stream) => {
                NegotiatedProtocol::from_alpn(stream.ssl().selected_alpn_protocol())
            }
        }
    }
}

impl AsyncRead for MaybeHttpsStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut *self {
            MaybeHttpsStream::Http(stream) => Pin::new(stream).poll_read(cx, buf),
            MaybeHttpsStream::Https(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for MaybeHttpsStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut *self {
            MaybeHttpsStream::Http(stream) => Pin::new(stream).poll_write(cx, buf),
            MaybeHttpsStream::Https(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            MaybeHttpsStream::Http(stream) => Pin::new(stream).poll_flush(cx),
            MaybeHttpsStream::Https(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut *self {
            MaybeHttpsStream::Http(stream) => Pin::new(stream).poll_shutdown(cx),
            MaybeHttpsStream::Https(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}
