//! TLS byte-stream endpoint: a `handshake()` step and a bounded
//! `shutdown()`. `tokio-rustls` already drives the handshake to
//! completion internally rather than surfacing discrete "want
//! read"/"want write" pauses, so this adapter's `handshake()` collapses
//! that into the same Reader/Writer-style "one await, then done or a
//! classified error" shape the rest of this crate uses.

use std::io::Cursor;
use std::sync::Arc;

use rustls::ServerConfig as RustlsServerConfig;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::server::TlsStream as ServerTlsStream;
use tokio_rustls::TlsAcceptor;

use wireframe_core::config::TlsConfig;

use crate::error::TransportError;

/// Bounded shutdown attempts before giving up on a peer that won't
/// complete the close handshake.
pub const MAX_SHUTDOWN_ATTEMPTS: u32 = 10;

/// Server-side TLS adapter: builds a `rustls::ServerConfig` from
/// [`TlsConfig`]'s cert/key paths once, then performs the handshake for
/// each accepted connection.
pub struct TlsServerAdapter {
    acceptor: TlsAcceptor,
}

impl TlsServerAdapter {
    pub fn from_config(config: &TlsConfig) -> Result<Self, TransportError> {
        let cert_path = config
            .cert_path
            .as_ref()
            .ok_or_else(|| TransportError::TlsConfig("cert_path is required".into()))?;
        let key_path = config
            .key_path
            .as_ref()
            .ok_or_else(|| TransportError::TlsConfig("key_path is required".into()))?;

        let certs = load_certs(cert_path)?;
        let key = load_private_key(key_path)?;

        let mut server_config = RustlsServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(|e| TransportError::TlsConfig(e.to_string()))?;
        // Offer http/1.1 only; an "h2" selection by the peer is out of
        // scope here and handled by rejecting the connection upstream
        // rather than silently degrading.
        server_config.alpn_protocols = vec![b"http/1.1".to_vec()];

        Ok(Self {
            acceptor: TlsAcceptor::from(Arc::new(server_config)),
        })
    }

    /// Drive the handshake for one accepted TCP connection to completion.
    pub async fn handshake<S>(&self, stream: S) -> Result<ServerTlsStream<S>, TransportError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        match self.acceptor.accept(stream).await {
            Ok(stream) => {
                tracing::debug!("TLS handshake completed");
                Ok(stream)
            }
            Err(e) => {
                tracing::warn!(error = %e, "TLS handshake failed");
                Err(TransportError::TlsHandshake(e))
            }
        }
    }
}

/// Best-effort TLS shutdown: `close_notify` plus the underlying socket
/// shutdown, retried up to [`MAX_SHUTDOWN_ATTEMPTS`] times before the
/// caller abandons the connection.
pub async fn shutdown<S>(stream: &mut ServerTlsStream<S>) -> Result<(), TransportError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    use tokio::io::AsyncWriteExt;
    let mut attempts = 0;
    loop {
        match stream.shutdown().await {
            Ok(()) => return Ok(()),
            Err(e) if attempts + 1 >= MAX_SHUTDOWN_ATTEMPTS => {
                tracing::warn!(error = %e, attempts, "giving up on TLS shutdown");
                return Err(TransportError::TlsHandshake(e));
            }
            Err(e) => {
                attempts += 1;
                tracing::debug!(error = %e, attempts, "retrying TLS shutdown");
                continue;
            }
        }
    }
}

fn load_certs(path: &std::path::Path) -> Result<Vec<CertificateDer<'static>>, TransportError> {
    let bytes = std::fs::read(path)
        .map_err(|e| TransportError::TlsConfig(format!("reading {}: {e}", path.display())))?;
    let mut reader = Cursor::new(bytes);
    rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TransportError::TlsConfig(format!("parsing cert chain: {e}")))
}

fn load_private_key(path: &std::path::Path) -> Result<PrivateKeyDer<'static>, TransportError> {
    let bytes = std::fs::read(path)
        .map_err(|e| TransportError::TlsConfig(format!("reading {}: {e}", path.display())))?;
    let mut reader = Cursor::new(bytes);
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| TransportError::TlsConfig(format!("parsing private key: {e}")))?
        .ok_or_else(|| TransportError::TlsConfig("no private key found in key_path".into()))
}
