use std::sync::Arc;

use boring::ssl::SslAcceptor;
use bytes::Bytes;
use tokio::net::TcpListener;

/// HTTP/2 server over TLS built on `h2::server`.
///
/// Each stream is answered with `"h2 {METHOD} {path}"`.
pub struct MockH2Server {
    listener: TcpListener,
    port: u16,
}

impl MockH2Server {
    /// Create a new mock H2 server bound to a random port.
    pub async fn new() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        Ok(Self { listener, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn url_tls(&self) -> String {
        format!("https://127.0.0.1:{}", self.port)
    }

    /// Accept TLS connections in a background task. `acceptor` must select h2.
    pub fn start_tls(self, acceptor: SslAcceptor) -> tokio::task::JoinHandle<()> {
        let acceptor = Arc::new(acceptor);
        tokio::spawn(async move {
            while let Ok((stream, _)) = self.listener.accept().await {
                let acceptor = Arc::clone(&acceptor);
                tokio::spawn(async move {
                    let tls = match tokio_boring::accept(&acceptor, stream).await {
                        Ok(tls) => tls,
                        Err(e) => {
                            tracing::warn!("TLS accept failed: {}", e);
                            return;
                        }
                    };
                    serve(tls).await;
                });
            }
        })
    }
}

async fn serve<S>(stream: S)
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let mut conn = match h2::server::handshake(stream).await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::warn!("h2 server handshake failed: {}", e);
            return;
        }
    };

    while let Some(result) = conn.accept().await {
        let Ok((request, mut respond)) = result else {
            break;
        };
        tokio::spawn(async move {
            let body = format!("h2 {} {}", request.method(), request.uri().path());
            let response = http::Response::builder()
                .status(200)
                .header("content-type", "text/plain")
                .header("set-cookie", "session=abc; Path=/")
                .body(())
                .unwrap();
            if let Ok(mut send) = respond.send_response(response, false) {
                let _ = send.send_data(Bytes::from(body), true);
            }
        });
    }
}
