//! HTTP/2 fingerprint configuration (SETTINGS frame).

use std::time::Duration;

/// HTTP/2 SETTINGS for fingerprinting.
///
/// `None` leaves the setting out of the initial SETTINGS frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Http2Settings {
    pub header_table_size: Option<u32>,
    pub enable_push: Option<bool>,
    pub max_concurrent_streams: Option<u32>,
    pub initial_window_size: Option<u32>,
    pub max_frame_size: Option<u32>,
    pub max_header_list_size: Option<u32>,
    /// Connection-level window, announced through WINDOW_UPDATE on stream 0.
    pub connection_window_size: Option<u32>,
    /// Bound on the HTTP/2 preface exchange.
    pub handshake_timeout: Option<Duration>,
}

impl Default for Http2Settings {
    fn default() -> Self {
        Self::chrome()
    }
}

impl Http2Settings {
    /// Chrome: 65535 + WINDOW_UPDATE of 15663105.
    pub fn chrome() -> Self {
        Self {
            header_table_size: Some(65536),
            enable_push: Some(false),
            max_concurrent_streams: Some(1000),
            initial_window_size: Some(6291456),
            max_frame_size: None,
            max_header_list_size: Some(262144),
            connection_window_size: Some(15728640),
            handshake_timeout: Some(Duration::from_secs(10)),
        }
    }

    /// Firefox: 65535 + WINDOW_UPDATE of 12517377.
    pub fn firefox() -> Self {
        Self {
            header_table_size: Some(65536),
            enable_push: Some(false),
            max_concurrent_streams: None,
            initial_window_size: Some(131072),
            max_frame_size: Some(16384),
            max_header_list_size: None,
            connection_window_size: Some(12582912),
            handshake_timeout: Some(Duration::from_secs(10)),
        }
    }

    /// Safari 17: 65535 + WINDOW_UPDATE of 10420225.
    pub fn safari() -> Self {
        Self {
            header_table_size: None,
            enable_push: Some(false),
            max_concurrent_streams: Some(100),
            initial_window_size: Some(2097152),
            max_frame_size: None,
            max_header_list_size: None,
            connection_window_size: Some(10485760),
            handshake_timeout: Some(Duration::from_secs(10)),
        }
    }

    /// Settings of the `h2` crate, unmodified.
    pub fn library_defaults() -> Self {
        Self {
            header_table_size: None,
            enable_push: None,
            max_concurrent_streams: None,
            initial_window_size: None,
            max_frame_size: None,
            max_header_list_size: None,
            connection_window_size: None,
            handshake_timeout: Some(Duration::from_secs(10)),
        }
    }
}
