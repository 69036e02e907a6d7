use crate::error::{codes, WireError};
use crate::message::{HeaderMap, Method, Request, Response, StatusCode, Version};
use std::str::FromStr;

/// Result of one [`HeadParser::feed`] call: how many bytes of the fed
/// iovecs were consumed, and whether the head is fully parsed.
#[derive(Debug, Clone, Copy)]
pub struct HeadProgress {
    pub consumed: usize,
    pub complete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    ReqMethod,
    ReqUri,
    ReqVersion,
    ReqVersionCr,
    RespVersion,
    RespCode,
    RespStatus,
    RespStatusCr,
    HeaderLineStart,
    HeaderKey,
    HeaderSpace,
    HeaderValue,
    HeaderValueCr,
    HeaderEndCr,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadKind {
    Request,
    Response,
}

/// Byte-fed incremental parser for a request or status line plus headers.
/// The same instance can be suspended between `feed` calls any number of
/// times — intermediate tokens live on `self`, never on the caller's
/// stack — which is what makes fragmentation invariance possible: feeding
/// the same bytes one at a time or all at once produces an identical
/// result.
pub struct HeadParser {
    kind: HeadKind,
    phase: Phase,
    token: Vec<u8>,
    method: Option<Method>,
    target: Option<String>,
    version: Option<Version>,
    status_code: Option<u16>,
    headers: HeaderMap,
    cur_header_name: Option<String>,
}

impl HeadParser {
    pub fn new(kind: HeadKind) -> Self {
        let phase = match kind {
            HeadKind::Request => Phase::ReqMethod,
            HeadKind::Response => Phase::RespVersion,
        };
        Self {
            kind,
            phase,
            token: Vec::new(),
            method: None,
            target: None,
            version: None,
            status_code: None,
            headers: HeaderMap::new(),
            cur_header_name: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Feed readable bytes, given as up to two slices (a `RingBuffer`'s
    /// `readable_regions()`). Never assumes the two slices are contiguous:
    /// every byte is pushed through the same state-transition function
    /// regardless of which slice it came from.
    pub fn feed(&mut self, regions: (&[u8], &[u8])) -> Result<HeadProgress, WireError> {
        if self.phase == Phase::Done {
            return Ok(HeadProgress {
                consumed: 0,
                complete: true,
            });
        }
        let mut consumed = 0usize;
        for &byte in regions.0.iter().chain(regions.1.iter()) {
            consumed += 1;
            self.step(byte)?;
            if self.phase == Phase::Done {
                return Ok(HeadProgress {
                    consumed,
                    complete: true,
                });
            }
        }
        Ok(HeadProgress {
            consumed,
            complete: false,
        })
    }

    fn step(&mut self, byte: u8) -> Result<(), WireError> {
        match self.phase {
            Phase::ReqMethod => {
                if byte == b' ' {
                    if self.token.is_empty() {
                        return Err(bad_request("empty method"));
                    }
                    let raw = String::from_utf8_lossy(&self.token).into_owned();
                    self.method = Some(Method::from_str(&raw).unwrap());
                    self.token.clear();
                    self.phase = Phase::ReqUri;
                } else if byte == b'\r' || byte == b'\n' {
                    return Err(bad_request("unexpected line end in method"));
                } else {
                    self.token.push(byte);
                }
            }
            Phase::ReqUri => {
                if byte == b' ' {
                    if self.token.is_empty() {
                        return Err(bad_request("empty request-target"));
                    }
                    self.target = Some(String::from_utf8_lossy(&self.token).into_owned());
                    self.token.clear();
                    self.phase = Phase::ReqVersion;
                } else if byte == b'\r' || byte == b'\n' {
                    return Err(bad_request("unexpected line end in request-target"));
                } else {
                    self.token.push(byte);
                }
            }
            Phase::ReqVersion => {
                if byte == b'\r' {
                    self.version = Some(parse_version(&self.token)?);
                    self.token.clear();
                    self.phase = Phase::ReqVersionCr;
                } else if byte == b'\n' {
                    return Err(bad_request("bare LF after version"));
                } else {
                    self.token.push(byte);
                }
            }
            Phase::ReqVersionCr => {
                if byte == b'\n' {
                    self.phase = Phase::HeaderLineStart;
                } else {
                    return Err(bad_request("expected LF after CR"));
                }
            }
            Phase::RespVersion => {
                if byte == b' ' {
                    if self.token.is_empty() {
                        return Err(bad_request("empty version"));
                    }
                    self.version = Some(parse_version(&self.token)?);
                    self.token.clear();
                    self.phase = Phase::RespCode;
                } else if byte == b'\r' || byte == b'\n' {
                    return Err(bad_request("unexpected line end in version"));
                } else {
                    self.token.push(byte);
                }
            }
            Phase::RespCode => {
                if byte == b' ' {
                    self.finish_status_code()?;
                    self.phase = Phase::RespStatus;
                } else if byte == b'\r' {
                    self.finish_status_code()?;
                    self.phase = Phase::RespStatusCr;
                } else if byte.is_ascii_digit() {
                    self.token.push(byte);
                } else {
                    return Err(WireError::new(codes::BAD_REQUEST, "invalid status code digit"));
                }
            }
            Phase::RespStatus => {
                // Reason phrase: consumed and discarded, never stored.
                if byte == b'\r' {
                    self.phase = Phase::RespStatusCr;
                } else if byte == b'\n' {
                    return Err(bad_request("bare LF in reason phrase"));
                }
            }
            Phase::RespStatusCr => {
                if byte == b'\n' {
                    self.phase = Phase::HeaderLineStart;
                } else {
                    return Err(bad_request("expected LF after CR"));
                }
            }
            Phase::HeaderLineStart => {
                if byte == b'\r' {
                    self.phase = Phase::HeaderEndCr;
                } else if byte == b'\n' {
                    return Err(bad_request("bare LF at header line start"));
                } else {
                    self.token.push(byte);
                    self.phase = Phase::HeaderKey;
                }
            }
            Phase::HeaderKey => {
                if byte == b':' {
                    if self.token.is_empty() {
                        return Err(bad_request("empty header name"));
                    }
                    self.cur_header_name =
                        Some(String::from_utf8_lossy(&self.token).into_owned());
                    self.token.clear();
                    self.phase = Phase::HeaderSpace;
                } else if byte == b'\r' || byte == b'\n' {
                    return Err(bad_request("malformed header line"));
                } else {
                    self.token.push(byte);
                }
            }
            Phase::HeaderSpace => {
                if byte == b' ' {
                    // skip leading optional whitespace
                } else if byte == b'\r' {
                    self.finish_header();
                    self.phase = Phase::HeaderValueCr;
                } else {
                    self.token.push(byte);
                    self.phase = Phase::HeaderValue;
                }
            }
            Phase::HeaderValue => {
                if byte == b'\r' {
                    self.finish_header();
                    self.phase = Phase::HeaderValueCr;
                } else if byte == b'\n' {
                    return Err(bad_request("bare LF in header value"));
                } else {
                    self.token.push(byte);
                }
            }
            Phase::HeaderValueCr => {
                if byte == b'\n' {
                    self.phase = Phase::HeaderLineStart;
                } else {
                    return Err(bad_request("expected LF after CR"));
                }
            }
            Phase::HeaderEndCr => {
                if byte == b'\n' {
                    self.phase = Phase::Done;
                } else {
                    return Err(bad_request("expected LF after CR"));
                }
            }
            Phase::Done => unreachable!("feed() returns before stepping past Done"),
        }
        Ok(())
    }

    fn finish_status_code(&mut self) -> Result<(), WireError> {
        let s = std::str::from_utf8(&self.token)
            .map_err(|_| bad_request("non-ascii status code"))?;
        let code: u16 = s
            .parse()
            .map_err(|_| WireError::new(codes::BAD_REQUEST, "invalid status code"))?;
        self.status_code = Some(code);
        self.token.clear();
        Ok(())
    }

    fn finish_header(&mut self) {
        let name = self
            .cur_header_name
            .take()
            .unwrap_or_else(|| String::from("x-unknown"));
        let value = String::from_utf8_lossy(&self.token).into_owned();
        let value = value.trim_end_matches(' ').to_string();
        self.headers.insert(name, value);
        self.token.clear();
    }

    pub fn kind(&self) -> HeadKind {
        self.kind
    }

    /// Consume the completed parser, producing a [`Request`]. Panics if
    /// not [`HeadParser::is_done`] or constructed with
    /// [`HeadKind::Response`].
    pub fn into_request(self) -> Request {
        assert!(self.is_done());
        Request::new(
            self.method.expect("method set by Done"),
            self.target.expect("target set by Done"),
            self.version.expect("version set by Done"),
            self.headers,
        )
    }

    /// Consume the completed parser, producing a [`Response`].
    pub fn into_response(self) -> Response {
        assert!(self.is_done());
        Response {
            version: self.version.expect("version set by Done"),
            status: StatusCode(self.status_code.expect("status set by Done")),
            headers: self.headers,
            body: crate::message::Body::empty(),
        }
    }
}

fn bad_request(msg: &'static str) -> WireError {
    WireError::new(codes::BAD_REQUEST, msg)
}

fn parse_version(token: &[u8]) -> Result<Version, WireError> {
    match token {
        b"HTTP/1.1" => Ok(Version::Http11),
        b"HTTP/1.0" => Ok(Version::Http10),
        _ => Err(WireError::new(
            codes::VERSION_NOT_SUPPORTED,
            format!("unsupported version {:?}", String::from_utf8_lossy(token)),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(parser: &mut HeadParser, bytes: &[u8]) -> HeadProgress {
        let mut last = HeadProgress {
            consumed: 0,
            complete: false,
        };
        let mut offset = 0;
        while offset < bytes.len() && !last.complete {
            last = parser.feed((&bytes[offset..], &[])).unwrap();
            offset += last.consumed;
        }
        last
    }

    #[test]
    fn parses_simple_get_request() {
        let mut p = HeadParser::new(HeadKind::Request);
        let progress = feed_all(
            &mut p,
            b"GET /hello?x=1 HTTP/1.1\r\nHost: example.com\r\n\r\n",
        );
        assert!(progress.complete);
        let req = p.into_request();
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.path(), "/hello");
        assert_eq!(req.headers.get("host"), Some("example.com"));
    }

    #[test]
    fn one_byte_at_a_time_matches_single_shot() {
        let input = b"POST /a HTTP/1.1\r\nContent-Length: 5\r\n\r\n";
        let mut whole = HeadParser::new(HeadKind::Request);
        let whole_progress = feed_all(&mut whole, input);

        let mut stepped = HeadParser::new(HeadKind::Request);
        let mut consumed_total = 0;
        for b in input {
            let progress = stepped.feed((&[*b], &[])).unwrap();
            consumed_total += progress.consumed;
            if progress.complete {
                break;
            }
        }
        assert_eq!(whole_progress.consumed, consumed_total);
        assert_eq!(whole.into_request().headers.get("content-length"), stepped.into_request().headers.get("content-length"));
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut p = HeadParser::new(HeadKind::Request);
        let err = feed_all_err(&mut p, b"GET / HTTP/2.0\r\n\r\n");
        assert_eq!(err.code(), codes::VERSION_NOT_SUPPORTED);
    }

    #[test]
    fn rejects_bare_lf() {
        let mut p = HeadParser::new(HeadKind::Request);
        let err = feed_all_err(&mut p, b"GET / HTTP/1.1\n\n");
        assert_eq!(err.code(), codes::BAD_REQUEST);
    }

    #[test]
    fn parses_response_without_reason_phrase() {
        let mut p = HeadParser::new(HeadKind::Response);
        let progress = feed_all(&mut p, b"HTTP/1.1 204\r\n\r\n");
        assert!(progress.complete);
        let resp = p.into_response();
        assert_eq!(resp.status.0, 204);
    }

    #[test]
    fn parses_response_with_reason_phrase() {
        let mut p = HeadParser::new(HeadKind::Response);
        let progress = feed_all(&mut p, b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
        assert!(progress.complete);
        assert_eq!(p.into_response().status.0, 200);
    }

    fn feed_all_err(parser: &mut HeadParser, bytes: &[u8]) -> WireError {
        let mut offset = 0;
        loop {
            match parser.feed((&bytes[offset..], &[])) {
                Ok(progress) => {
                    offset += progress.consumed;
                    if progress.complete || offset >= bytes.len() {
                        panic!("expected parse error");
                    }
                }
                Err(e) => return e,
            }
        }
    }
}
