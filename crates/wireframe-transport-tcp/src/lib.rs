//! TCP transport for wireframe-core: a listener/accept loop and, behind
//! the `tls` feature, a rustls-based TLS adapter. Both endpoint types
//! implement `AsyncRead + AsyncWrite`, so `wireframe_core::server::serve_connection`
//! is generic over either.

pub mod channel;
pub mod error;
pub mod listener;
#[cfg(feature = "tls")]
pub mod tls;

pub use channel::TcpChannel;
pub use error::TransportError;
pub use listener::{connect, TcpEndpoint};
#[cfg(feature = "tls")]
pub use tls::{TlsServerAdapter, MAX_SHUTDOWN_ATTEMPTS};
