use thiserror::Error;
use wireframe_core::error::{codes, WireError};

/// Transport-layer failures that don't belong in `wireframe-core` itself
/// (bind/accept, TLS setup) but still need to fold into the engine's
/// [`WireError`] taxonomy once a connection is handed off to it.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to bind listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),
    #[error("TLS handshake failed: {0}")]
    TlsHandshake(std::io::Error),
}

impl From<TransportError> for WireError {
    fn from(err: TransportError) -> Self {
        match &err {
            TransportError::Bind { .. } | TransportError::Accept(_) => {
                WireError::new(codes::RECV_ERROR, err.to_string())
            }
            TransportError::TlsConfig(_) => WireError::new(codes::CONFIG_INVALID, err.to_string()),
            TransportError::TlsHandshake(_) => WireError::new(codes::INTERNAL, err.to_string()),
        }
    }
}
