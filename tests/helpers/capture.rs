use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// Cipher suites and ALPN offered in one Client Hello.
#[derive(Debug, Clone)]
pub struct CapturedHello {
    pub cipher_suites: Vec<u16>,
    pub alpn: Vec<String>,
}

impl CapturedHello {
    /// GREASE values have the form 0x?A?A.
    pub fn has_grease(&self) -> bool {
        self.cipher_suites
            .iter()
            .any(|&c| c & 0x0f0f == 0x0a0a && c >> 8 == c & 0xff)
    }

    pub fn offers(&self, suite: u16) -> bool {
        self.cipher_suites.contains(&suite)
    }
}

/// TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA, offered by Firefox but not Chrome.
pub const ECDHE_ECDSA_AES_256_CBC_SHA: u16 = 0xc00a;

/// How long a captured connection is held open before it is dropped.
pub const HOLD: Duration = Duration::from_millis(800);

/// Listener that reads the first TLS record of each connection, reports the
/// Client Hello, then holds the socket for [`HOLD`] and closes it, failing the
/// client's handshake.
pub struct HelloCapture {
    listener: TcpListener,
    port: u16,
}

impl HelloCapture {
    pub async fn new() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        Ok(Self { listener, port })
    }

    pub fn url(&self) -> String {
        format!("https://127.0.0.1:{}/", self.port)
    }

    pub fn start(self) -> mpsc::UnboundedReceiver<CapturedHello> {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = self.listener.accept().await {
                let tx = tx.clone();
                tokio::spawn(async move {
                    match read_client_hello(&mut stream).await {
                        Some(hello) => {
                            let _ = tx.send(hello);
                        }
                        None => tracing::warn!("no Client Hello captured"),
                    }
                    tokio::time::sleep(HOLD).await;
                });
            }
        });
        rx
    }
}

async fn read_client_hello(stream: &mut TcpStream) -> Option<CapturedHello> {
    let mut header = [0u8; 5];
    stream.read_exact(&mut header).await.ok()?;
    if header[0] != 0x16 {
        return None;
    }
    let len = u16::from_be_bytes([header[3], header[4]]) as usize;
    let mut record = vec![0u8; len];
    stream.read_exact(&mut record).await.ok()?;
    parse_client_hello(&record)
}

/// Parse a handshake message holding a Client Hello.
fn parse_client_hello(msg: &[u8]) -> Option<CapturedHello> {
    let mut r = Reader { buf: msg, pos: 0 };
    if r.u8()? != 0x01 {
        return None;
    }
    r.skip(3)?; // handshake length
    r.skip(2 + 32)?; // legacy_version, random
    let session_id_len = r.u8()? as usize;
    r.skip(session_id_len)?;

    let suites_len = r.u16()? as usize;
    let cipher_suites = (0..suites_len / 2).map(|_| r.u16()).collect::<Option<Vec<_>>>()?;

    let compression_len = r.u8()? as usize;
    r.skip(compression_len)?;

    let mut alpn = Vec::new();
    let extensions_len = r.u16()? as usize;
    let extensions_end = r.pos + extensions_len;
    while r.pos < extensions_end {
        let ext_type = r.u16()?;
        let ext_len = r.u16()? as usize;
        let data = r.take(ext_len)?;
        if ext_type == 0x0010 {
            let mut ext = Reader { buf: data, pos: 2 };
            while ext.pos < data.len() {
                let name_len = ext.u8()? as usize;
                alpn.push(String::from_utf8_lossy(ext.take(name_len)?).into_owned());
            }
        }
    }

    Some(CapturedHello {
        cipher_suites,
        alpn,
    })
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let slice = self.buf.get(self.pos..self.pos + n)?;
        self.pos += n;
        Some(slice)
    }

    fn skip(&mut self, n: usize) -> Option<()> {
        self.take(n).map(|_| ())
    }

    fn u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    fn u16(&mut self) -> Option<u16> {
        self.take(2).map(|b| u16::from_be_bytes([b[0], b[1]]))
    }
}
