//! Client Hello identities.

use std::fmt;

use super::http2::Http2Settings;
use super::tls::TlsFingerprint;

/// Which TLS Client Hello shape the transport presents.
///
/// Opaque to the transport: it only asks for the [`TlsFingerprint`] and
/// [`Http2Settings`] behind the identity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ClientHello {
    /// Chrome 102 on Windows.
    #[default]
    Chrome102,
    /// Chrome 131 on macOS. Extension order is randomized per handshake.
    Chrome131,
    /// Firefox 120.
    Firefox120,
    /// Safari 17 on macOS.
    Safari17,
    /// BoringSSL defaults, no impersonation.
    Boring,
    /// Caller-built shape.
    Custom(Box<TlsFingerprint>),
}

impl ClientHello {
    /// Build a custom identity.
    pub fn custom(fingerprint: TlsFingerprint) -> Self {
        Self::Custom(Box::new(fingerprint))
    }

    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Chrome102 => "chrome_102",
            Self::Chrome131 => "chrome_131",
            Self::Firefox120 => "firefox_120",
            Self::Safari17 => "safari_17",
            Self::Boring => "boring",
            Self::Custom(_) => "custom",
        }
    }

    /// Get the TLS fingerprint for this identity.
    pub fn tls_fingerprint(&self) -> TlsFingerprint {
        match self {
            Self::Chrome102 => TlsFingerprint::chrome_102(),
            Self::Chrome131 => TlsFingerprint::chrome_131(),
            Self::Firefox120 => TlsFingerprint::firefox_120(),
            Self::Safari17 => TlsFingerprint::safari_17(),
            Self::Boring => TlsFingerprint::default(),
            Self::Custom(fp) => (**fp).clone(),
        }
    }

    /// HTTP/2 SETTINGS sent alongside this identity.
    pub fn http2_settings(&self) -> Http2Settings {
        match self {
            Self::Chrome102 | Self::Chrome131 => Http2Settings::chrome(),
            Self::Firefox120 => Http2Settings::firefox(),
            Self::Safari17 => Http2Settings::safari(),
            Self::Boring | Self::Custom(_) => Http2Settings::library_defaults(),
        }
    }

    /// Get the User-Agent string for this identity.
    pub fn user_agent(&self) -> &'static str {
        match self {
            Self::Chrome102 => {
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/102.0.0.0 Safari/537.36"
            }
            Self::Chrome131 => {
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
            }
            Self::Firefox120 => {
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0"
            }
            Self::Safari17 => {
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15"
            }
            Self::Boring | Self::Custom(_) => concat!("guise/", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl fmt::Display for ClientHello {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
