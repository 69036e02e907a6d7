use tokio::net::{TcpListener, TcpStream};

use crate::channel::TcpChannel;
use crate::error::TransportError;

/// A bound listening socket plus the accept loop.
pub struct TcpEndpoint {
    listener: TcpListener,
}

impl TcpEndpoint {
    pub async fn bind(host: &str, port: u16) -> Result<Self, TransportError> {
        let addr = format!("{host}:{port}");
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| TransportError::Bind { addr, source })?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept one connection, applying `TCP_NODELAY` — the one socket
    /// option this layer sets, since HTTP request/response framing doesn't
    /// benefit from Nagle's batching.
    pub async fn accept(&self) -> Result<(TcpChannel, std::net::SocketAddr), TransportError> {
        let (stream, addr) = self.listener.accept().await.map_err(TransportError::Accept)?;
        stream.set_nodelay(true).map_err(TransportError::Accept)?;
        Ok((TcpChannel::new(stream), addr))
    }
}

/// Open an outbound connection for the HTTP client core.
pub async fn connect(host: &str, port: u16) -> Result<TcpChannel, TransportError> {
    let stream = TcpStream::connect((host, port))
        .await
        .map_err(TransportError::Accept)?;
    stream.set_nodelay(true).map_err(TransportError::Accept)?;
    Ok(TcpChannel::new(stream))
}
