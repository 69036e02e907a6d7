use std::error::Error as StdError;
use std::fmt;
use std::net::SocketAddr;

/// Stable, machine-readable error identity for the wire engine.
///
/// Every fallible operation in this crate returns a [`WireError`] rather than
/// a bare string: parsers, the reader/writer pair, the router, and the
/// static-file and WebSocket engines all funnel into the same type so that
/// callers (and the connection lifecycle's error-to-status mapping in
/// [`status_for`]) can match on [`WireError::code`] instead of parsing text.
#[derive(Debug)]
pub struct WireError {
    code: &'static str,
    message: String,
    cause: Option<Box<dyn StdError + Send + Sync + 'static>>,
    peer_addr: Option<SocketAddr>,
}

impl WireError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
            peer_addr: None,
        }
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn with_cause(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn with_peer_addr(mut self, peer: SocketAddr) -> Self {
        self.peer_addr = Some(peer);
        self
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Whether the connection this error occurred on must be closed rather
    /// than kept alive: any error that leaves connection state
    /// indeterminate forbids keep-alive reuse.
    pub fn forces_close(&self) -> bool {
        !matches!(self.code, codes::INCOMPLETE)
    }
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl StdError for WireError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_ref()
            .map(|boxed| boxed.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<std::io::Error> for WireError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
                WireError::new(codes::CONNECTION_CLOSE, "peer closed the connection").with_cause(err)
            }
            ErrorKind::TimedOut => {
                WireError::new(codes::TIMEOUT, "I/O operation timed out").with_cause(err)
            }
            _ => WireError::new(codes::RECV_ERROR, "transport I/O error").with_cause(err),
        }
    }
}

/// Stable error codes shared across parsing, I/O, and dispatch.
pub mod codes {
    pub const INCOMPLETE: &str = "wire.incomplete";
    pub const CONNECTION_CLOSE: &str = "wire.connection_close";
    pub const RECV_ERROR: &str = "wire.recv_error";
    pub const SEND_ERROR: &str = "wire.send_error";
    pub const TIMEOUT: &str = "wire.timeout";
    pub const HEADER_TOO_LARGE: &str = "wire.header_too_large";
    pub const BAD_REQUEST: &str = "wire.bad_request";
    pub const FORBIDDEN: &str = "wire.forbidden";
    pub const RANGE_NOT_SATISFIABLE: &str = "wire.range_not_satisfiable";
    pub const VERSION_NOT_SUPPORTED: &str = "wire.version_not_supported";
    pub const URI_TOO_LONG: &str = "wire.uri_too_long";
    pub const PAYLOAD_TOO_LARGE: &str = "wire.payload_too_large";
    pub const METHOD_NOT_ALLOWED: &str = "wire.method_not_allowed";
    pub const NOT_FOUND: &str = "wire.not_found";
    pub const INVALID_CHUNK_FORMAT: &str = "wire.invalid_chunk_format";
    pub const INVALID_CHUNK_LENGTH: &str = "wire.invalid_chunk_length";
    pub const BODY_LENGTH_MISMATCH: &str = "wire.body_length_mismatch";
    pub const INVALID_UTF8: &str = "wire.invalid_utf8";
    pub const WS_PROTOCOL_ERROR: &str = "ws.protocol_error";
    pub const WS_MESSAGE_TOO_LARGE: &str = "ws.message_too_large";
    pub const WS_UPGRADE_FAILED: &str = "ws.upgrade_failed";
    pub const TLS_WANT_READ: &str = "tls.want_read";
    pub const TLS_WANT_WRITE: &str = "tls.want_write";
    pub const INTERNAL: &str = "wire.internal";
    pub const CONFIG_INVALID: &str = "wire.config_invalid";
    pub const ROUTE_CONFLICT: &str = "wire.route_conflict";
}

/// HTTP status produced for an error that must be turned into a response.
/// Errors that never reach the wire (e.g. `TLS_WANT_READ`, `INCOMPLETE`) are
/// not part of the response-producing subset and return `None`.
pub fn status_for(code: &str) -> Option<u16> {
    use codes::*;
    Some(match code {
        HEADER_TOO_LARGE => 431,
        BAD_REQUEST => 400,
        FORBIDDEN => 403,
        RANGE_NOT_SATISFIABLE => 416,
        VERSION_NOT_SUPPORTED => 505,
        URI_TOO_LONG => 414,
        PAYLOAD_TOO_LARGE => 413,
        METHOD_NOT_ALLOWED => 405,
        NOT_FOUND => 404,
        INVALID_CHUNK_FORMAT | INVALID_CHUNK_LENGTH | BODY_LENGTH_MISMATCH => 400,
        WS_UPGRADE_FAILED => 400,
        INTERNAL => 500,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_is_total_for_response_producing_codes() {
        let expect = [
            (codes::HEADER_TOO_LARGE, 431),
            (codes::BAD_REQUEST, 400),
            (codes::VERSION_NOT_SUPPORTED, 505),
            (codes::URI_TOO_LONG, 414),
            (codes::PAYLOAD_TOO_LARGE, 413),
            (codes::METHOD_NOT_ALLOWED, 405),
            (codes::NOT_FOUND, 404),
            (codes::INVALID_CHUNK_FORMAT, 400),
            (codes::BODY_LENGTH_MISMATCH, 400),
            (codes::WS_UPGRADE_FAILED, 400),
            (codes::INTERNAL, 500),
        ];
        for (code, status) in expect {
            assert_eq!(status_for(code), Some(status));
        }
        assert_eq!(status_for(codes::INCOMPLETE), None);
        assert_eq!(status_for(codes::TLS_WANT_READ), None);
    }

    #[test]
    fn io_error_classification() {
        let closed = std::io::Error::from(std::io::ErrorKind::UnexpectedEof);
        assert_eq!(WireError::from(closed).code(), codes::CONNECTION_CLOSE);
        let timed_out = std::io::Error::from(std::io::ErrorKind::TimedOut);
        assert_eq!(WireError::from(timed_out).code(), codes::TIMEOUT);
    }
}
