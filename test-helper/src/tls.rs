use std::fs;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use rustls::{Certificate, PrivateKey, ServerConfig};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;

use crate::get_unused_addr;

/// The path of a PEM file in the certificate fixtures.
///
/// - `ca.pem` signs `server.pem` and `client.pem`.
/// - `other-ca.pem` is an unrelated CA, trusting it rejects `server.pem`.
/// - `server-key.pem` and `client-key.pem` are the matching PKCS#8 keys.
pub fn cert_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("certs").join(name)
}

/// An HTTPS server presenting `server.pem` which answers every request
/// with the same `200 OK` JSON body.
///
/// The server stops when the handle is dropped.
pub struct TlsEtcd {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TlsEtcd {
    /// Starts the server.
    ///
    /// This must be called from within a tokio runtime.
    pub async fn spawn(body: impl Into<String>) -> io::Result<Self> {
        let acceptor = TlsAcceptor::from(Arc::new(server_config()?));
        let addr = get_unused_addr();
        let listener = TcpListener::bind(addr).await?;
        let response = Arc::new(ok_response(&body.into()));

        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let acceptor = acceptor.clone();
                let response = response.clone();
                tokio::spawn(async move {
                    // Handshake failures are expected when clients distrust the server.
                    if let Ok(mut stream) = acceptor.accept(stream).await {
                        if read_request_head(&mut stream).await.is_ok() {
                            let _ = stream.write_all(response.as_bytes()).await;
                            let _ = stream.shutdown().await;
                        }
                    }
                });
            }
        });

        Ok(Self { addr, handle })
    }

    #[inline]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The client URL the server is reachable on.
    pub fn client_url(&self) -> String {
        format!("https://{}", self.addr)
    }
}

impl Drop for TlsEtcd {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn server_config() -> io::Result<ServerConfig> {
    let certs = rustls_pemfile::certs(&mut fs::read(cert_path("server.pem"))?.as_slice())?
        .into_iter()
        .map(Certificate)
        .collect();
    let key = rustls_pemfile::pkcs8_private_keys(
        &mut fs::read(cert_path("server-key.pem"))?.as_slice(),
    )?
    .into_iter()
    .next()
    .map(PrivateKey)
    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing server key"))?;

    ServerConfig::builder()
        .with_safe_defaults()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn ok_response(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        body.len(),
        body,
    )
}

async fn read_request_head<S>(stream: &mut S) -> io::Result<()>
where
    S: AsyncRead + Unpin,
{
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        head.extend_from_slice(&buf[..n]);
    }
    Ok(())
}
