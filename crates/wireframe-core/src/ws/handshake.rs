//! Upgrade validation and `Sec-WebSocket-Accept` derivation.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::RngCore;
use sha1::{Digest, Sha1};

use crate::error::{codes, WireError};
use crate::message::{HeaderMap, Method, Request, Response};

const GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// `BASE64(SHA1(key || GUID))`, per RFC 6455 §1.3.
pub fn derive_accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(GUID.as_bytes());
    STANDARD.encode(hasher.finalize())
}

/// Validate an inbound upgrade request: method GET, `Connection` contains
/// `Upgrade`, `Upgrade` equals `websocket`, `Sec-WebSocket-Version` equals
/// 13, `Sec-WebSocket-Key` present and non-empty. Returns the client's key
/// on success.
pub fn validate_upgrade_request(req: &Request) -> Result<&str, WireError> {
    if req.method != Method::Get {
        return Err(upgrade_failed("upgrade request must use GET"));
    }
    if !req.headers.contains_token("Connection", "upgrade") {
        return Err(upgrade_failed("missing Connection: Upgrade"));
    }
    if !req
        .headers
        .get("Upgrade")
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
    {
        return Err(upgrade_failed("missing Upgrade: websocket"));
    }
    if req.headers.get("Sec-WebSocket-Version") != Some("13") {
        return Err(upgrade_failed("Sec-WebSocket-Version must be 13"));
    }
    let key = req
        .headers
        .get("Sec-WebSocket-Key")
        .filter(|k| !k.is_empty())
        .ok_or_else(|| upgrade_failed("missing Sec-WebSocket-Key"))?;
    Ok(key)
}

/// Build the 101 response for a validated upgrade, optionally echoing a
/// negotiated subprotocol.
pub fn build_upgrade_response(client_key: &str, subprotocol: Option<&str>) -> Response {
    let mut resp = Response::new(101)
        .with_header("Upgrade", "websocket")
        .with_header("Connection", "Upgrade")
        .with_header("Sec-WebSocket-Accept", derive_accept_key(client_key));
    if let Some(proto) = subprotocol {
        resp = resp.with_header("Sec-WebSocket-Protocol", proto.to_string());
    }
    resp
}

/// Generate a fresh random 16-byte key, base64-encoded, for a client
/// upgrade request.
pub fn generate_client_key() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}

/// Build the client-side upgrade request for `path` against `host`.
pub fn build_upgrade_request(host: &str, path: &str, key: &str) -> Request {
    let mut headers = HeaderMap::new();
    headers.insert("Host", host.to_string());
    headers.insert("Connection", "Upgrade");
    headers.insert("Upgrade", "websocket");
    headers.insert("Sec-WebSocket-Version", "13");
    headers.insert("Sec-WebSocket-Key", key.to_string());
    Request::new(
        Method::Get,
        path.to_string(),
        crate::message::Version::Http11,
        headers,
    )
}

/// Verify a server's 101 response against the key this client sent.
/// Mismatch is a fatal protocol error.
pub fn verify_accept_response(sent_key: &str, response: &Response) -> Result<(), WireError> {
    if response.status.0 != 101 {
        return Err(upgrade_failed("server did not return 101"));
    }
    let expected = derive_accept_key(sent_key);
    let actual = response
        .headers
        .get("Sec-WebSocket-Accept")
        .ok_or_else(|| upgrade_failed("missing Sec-WebSocket-Accept"))?;
    if actual != expected {
        return Err(upgrade_failed("Sec-WebSocket-Accept mismatch"));
    }
    Ok(())
}

fn upgrade_failed(msg: &'static str) -> WireError {
    WireError::new(codes::WS_UPGRADE_FAILED, msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_key_matches_rfc_example() {
        assert_eq!(
            derive_accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }

    #[test]
    fn validates_a_well_formed_upgrade_request() {
        let mut headers = HeaderMap::new();
        headers.insert("Connection", "Upgrade");
        headers.insert("Upgrade", "websocket");
        headers.insert("Sec-WebSocket-Version", "13");
        headers.insert("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ==");
        let req = Request::new(
            Method::Get,
            "/ws".to_string(),
            crate::message::Version::Http11,
            headers,
        );
        assert_eq!(
            validate_upgrade_request(&req).unwrap(),
            "dGhlIHNhbXBsZSBub25jZQ=="
        );
    }

    #[test]
    fn rejects_missing_version() {
        let mut headers = HeaderMap::new();
        headers.insert("Connection", "Upgrade");
        headers.insert("Upgrade", "websocket");
        headers.insert("Sec-WebSocket-Key", "key");
        let req = Request::new(
            Method::Get,
            "/ws".to_string(),
            crate::message::Version::Http11,
            headers,
        );
        assert_eq!(
            validate_upgrade_request(&req).unwrap_err().code(),
            codes::WS_UPGRADE_FAILED
        );
    }

    #[test]
    fn client_roundtrip_verifies() {
        let key = "dGhlIHNhbXBsZSBub25jZQ==";
        let resp = build_upgrade_response(key, None);
        verify_accept_response(key, &resp).unwrap();
    }
}
