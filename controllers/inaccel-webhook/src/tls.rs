//! TLS termination for the admission webhook.
//!
//! The API server only talks HTTPS to webhooks. The certificate and key are
//! read once at startup from PEM files; a failed handshake drops that one
//! connection and the listener keeps accepting.

use crate::error::ControllerError;
use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::{server::TlsStream, TlsAcceptor};
use tracing::{debug, warn};

/// Handshakes slower than this are dropped
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Load a server configuration from a PEM certificate chain and private key.
pub fn load_server_config(
    cert_path: &Path,
    key_path: &Path,
) -> Result<rustls::ServerConfig, ControllerError> {
    let mut cert_reader = BufReader::new(open(cert_path)?);
    let certs = rustls_pemfile::certs(&mut cert_reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            ControllerError::Tls(format!("invalid certificate {}: {}", cert_path.display(), e))
        })?;
    if certs.is_empty() {
        return Err(ControllerError::Tls(format!(
            "no certificate found in {}",
            cert_path.display()
        )));
    }

    let mut key_reader = BufReader::new(open(key_path)?);
    let key = rustls_pemfile::private_key(&mut key_reader)
        .map_err(|e| ControllerError::Tls(format!("invalid key {}: {}", key_path.display(), e)))?
        .ok_or_else(|| {
            ControllerError::Tls(format!("no private key found in {}", key_path.display()))
        })?;

    let mut config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| ControllerError::Tls(e.to_string()))?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(config)
}

fn open(path: &Path) -> Result<File, ControllerError> {
    File::open(path)
        .map_err(|e| ControllerError::Tls(format!("cannot read {}: {}", path.display(), e)))
}

/// TCP listener that hands out TLS streams to `axum::serve`.
pub struct TlsListener {
    listener: TcpListener,
    acceptor: TlsAcceptor,
}

impl std::fmt::Debug for TlsListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsListener")
            .field("listener", &self.listener)
            .finish_non_exhaustive()
    }
}

impl TlsListener {
    /// Bind `addr` and terminate TLS with `config`.
    pub async fn bind(addr: SocketAddr, config: rustls::ServerConfig) -> Result<Self, ControllerError> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            acceptor: TlsAcceptor::from(Arc::new(config)),
        })
    }
}

impl axum::serve::Listener for TlsListener {
    type Io = TlsStream<TcpStream>;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        loop {
            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    // Usually EMFILE; give the process a moment to release descriptors
                    warn!("Failed to accept connection: {}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            };

            match tokio::time::timeout(HANDSHAKE_TIMEOUT, self.acceptor.accept(stream)).await {
                Ok(Ok(tls)) => return (tls, addr),
                Ok(Err(e)) => debug!("TLS handshake with {} failed: {}", addr, e),
                Err(_) => debug!("TLS handshake with {} timed out", addr),
            }
        }
    }

    fn local_addr(&self) -> std::io::Result<Self::Addr> {
        self.listener.local_addr()
    }
}
