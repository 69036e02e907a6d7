use super::{Request, Response};

/// Serialize a response head + (non-chunked) body into wire bytes,
/// auto-inserting `Content-Length` when the caller didn't set one and the
/// response isn't chunked.
pub fn encode_response(resp: &Response) -> Vec<u8> {
    let mut out = Vec::with_capacity(256 + resp.body.len());
    out.extend_from_slice(resp.version.as_str().as_bytes());
    out.push(b' ');
    out.extend_from_slice(resp.status.0.to_string().as_bytes());
    out.push(b' ');
    out.extend_from_slice(resp.status.reason().as_bytes());
    out.extend_from_slice(b"\r\n");
    resp.headers.write_to(&mut out);
    let is_chunked = resp.headers.contains_token("Transfer-Encoding", "chunked");
    if !is_chunked && !resp.headers.contains("Content-Length") {
        out.extend_from_slice(format!("Content-Length: {}\r\n", resp.body.len()).as_bytes());
    }
    out.extend_from_slice(b"\r\n");
    if !is_chunked {
        out.extend_from_slice(resp.body.as_slice());
    }
    out
}

/// Serialize a request head + (non-chunked) body, used by the HTTP client
/// side of the Composed Awaitable.
pub fn encode_request(req: &Request) -> Vec<u8> {
    let mut out = Vec::with_capacity(256 + req.body.len());
    out.extend_from_slice(req.method.as_str().as_bytes());
    out.push(b' ');
    out.extend_from_slice(req.target.as_bytes());
    out.push(b' ');
    out.extend_from_slice(req.version.as_str().as_bytes());
    out.extend_from_slice(b"\r\n");
    req.headers.write_to(&mut out);
    let is_chunked = req.headers.contains_token("Transfer-Encoding", "chunked");
    if !is_chunked && !req.headers.contains("Content-Length") && !req.body.is_empty() {
        out.extend_from_slice(format!("Content-Length: {}\r\n", req.body.len()).as_bytes());
    }
    out.extend_from_slice(b"\r\n");
    if !is_chunked {
        out.extend_from_slice(req.body.as_slice());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Version;

    #[test]
    fn response_gets_content_length_auto_inserted() {
        let resp = Response::new(200).with_body("hi");
        let bytes = encode_response(&resp);
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Length: 2\r\n"));
        assert!(text.ends_with("\r\n\r\nhi"));
    }

    #[test]
    fn chunked_response_omits_body_and_length() {
        let resp = Response::new(200)
            .with_header("Transfer-Encoding", "chunked")
            .with_body("ignored-because-chunked");
        let bytes = encode_response(&resp);
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains("Content-Length"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn response_tolerates_version_1_0() {
        let resp = Response::new(200).with_version(Version::Http10);
        let text = String::from_utf8(encode_response(&resp)).unwrap();
        assert!(text.starts_with("HTTP/1.0 200 OK\r\n"));
    }
}
