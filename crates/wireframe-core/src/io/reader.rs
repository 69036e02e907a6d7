use tokio::io::{AsyncRead, AsyncReadExt};

use crate::buffer::RingBuffer;
use crate::error::{codes, WireError};
use crate::message::{Body, Request, Response};
use crate::parse::{ChunkedDecoder, HeadKind, HeadParser};

/// Default ring capacity backing a [`Reader`], matching the default header
/// size ceiling.
pub const DEFAULT_HEADER_LIMIT: usize = 8 * 1024;

enum BodyMode {
    None,
    Fixed(u64),
    Chunked(ChunkedDecoder),
}

enum Stage {
    Head(HeadParser),
    Body {
        head: PartialHead,
        mode: BodyMode,
        received: u64,
        body: Vec<u8>,
    },
    Completed(PartialHead),
    Done,
}

/// The head fields captured once [`HeadParser`] completes, before the
/// matching body has finished arriving.
enum PartialHead {
    Request(Request),
    Response(Response),
}

/// Outcome of one [`Reader::get_request`]/[`Reader::get_response`] call.
pub enum ReadOutcome<T> {
    /// The message is fully assembled.
    Complete(T),
    /// More I/O is needed; call again.
    Pending,
}

/// Reads a single HTTP message (request or response) incrementally off an
/// `AsyncRead` stream: each call makes at most one socket read, and the
/// caller retries on `Pending` until
/// `Complete`. Backed by a fixed-capacity [`RingBuffer`] that also doubles
/// as the header-size ceiling — a head that doesn't fit before the ring
/// fills up is rejected as `HeaderTooLarge` rather than silently growing.
pub struct Reader<S> {
    stream: S,
    ring: RingBuffer,
    stage: Stage,
    head_bytes_seen: usize,
    max_header_size: usize,
}

impl<S: AsyncRead + Unpin> Reader<S> {
    pub fn new(stream: S) -> Self {
        Self::with_limits(stream, DEFAULT_HEADER_LIMIT, DEFAULT_HEADER_LIMIT)
    }

    pub fn with_limits(stream: S, ring_capacity: usize, max_header_size: usize) -> Self {
        Self {
            stream,
            ring: RingBuffer::with_capacity(ring_capacity),
            stage: Stage::Head(HeadParser::new(HeadKind::Request)),
            head_bytes_seen: 0,
            max_header_size,
        }
    }

    /// Reset internal state to parse the next request on the same
    /// connection, preserving any bytes already buffered past the previous
    /// message's end (HTTP/1.1 pipelining or simply an over-read).
    pub fn begin_next_request(&mut self) {
        self.stage = Stage::Head(HeadParser::new(HeadKind::Request));
        self.head_bytes_seen = 0;
    }

    pub fn begin_next_response(&mut self) {
        self.stage = Stage::Head(HeadParser::new(HeadKind::Response));
        self.head_bytes_seen = 0;
    }

    pub async fn get_request(&mut self) -> Result<ReadOutcome<Request>, WireError> {
        match self.drive().await? {
            ReadOutcome::Complete(PartialHead::Request(req)) => Ok(ReadOutcome::Complete(req)),
            ReadOutcome::Complete(PartialHead::Response(_)) => {
                unreachable!("Reader started with HeadKind::Request")
            }
            ReadOutcome::Pending => Ok(ReadOutcome::Pending),
        }
    }

    pub async fn get_response(&mut self) -> Result<ReadOutcome<Response>, WireError> {
        match self.drive().await? {
            ReadOutcome::Complete(PartialHead::Response(resp)) => Ok(ReadOutcome::Complete(resp)),
            ReadOutcome::Complete(PartialHead::Request(_)) => {
                unreachable!("Reader started with HeadKind::Response")
            }
            ReadOutcome::Pending => Ok(ReadOutcome::Pending),
        }
    }

    async fn drive(&mut self) -> Result<ReadOutcome<PartialHead>, WireError> {
        // First make progress on whatever's already buffered, with no I/O —
        // this is what lets pipelined bytes left over from a prior message
        // complete the next one without blocking on a read that may never
        // come.
        self.progress_stage()?;
        if matches!(self.stage, Stage::Completed(_)) {
            return Ok(ReadOutcome::Complete(self.take_completed()));
        }

        let (first, second) = self.ring.writable_regions();
        if first.is_empty() && second.is_empty() {
            return Err(WireError::new(
                codes::HEADER_TOO_LARGE,
                "ring buffer full before message finished parsing",
            ));
        }
        let n = if !first.is_empty() {
            self.stream.read(first).await.map_err(WireError::from)?
        } else {
            self.stream.read(second).await.map_err(WireError::from)?
        };
        if n == 0 {
            return Err(WireError::new(
                codes::CONNECTION_CLOSE,
                "peer closed the connection mid-message",
            ));
        }
        self.ring.produce(n);

        self.progress_stage()?;
        if matches!(self.stage, Stage::Completed(_)) {
            return Ok(ReadOutcome::Complete(self.take_completed()));
        }
        Ok(ReadOutcome::Pending)
    }

    /// Feeds every currently-readable byte into whichever stage is active,
    /// advancing through head parsing into body accumulation and finally
    /// to `Stage::Completed` without performing any I/O of its own.
    fn progress_stage(&mut self) -> Result<(), WireError> {
        loop {
            match &mut self.stage {
                Stage::Head(parser) => {
                    let regions = self.ring.readable_regions();
                    let progress = parser.feed(regions)?;
                    self.ring.consume(progress.consumed);
                    self.head_bytes_seen += progress.consumed;
                    if !progress.complete {
                        if self.head_bytes_seen > self.max_header_size {
                            return Err(WireError::new(
                                codes::HEADER_TOO_LARGE,
                                "request head exceeded configured limit",
                            ));
                        }
                        return Ok(());
                    }
                    let Stage::Head(parser) = std::mem::replace(&mut self.stage, Stage::Done)
                    else {
                        unreachable!()
                    };
                    let kind = parser.kind();
                    let (head, mode) = match kind {
                        HeadKind::Request => {
                            let req = parser.into_request();
                            let mode = body_mode_for(&req.headers);
                            (PartialHead::Request(req), mode)
                        }
                        HeadKind::Response => {
                            let resp = parser.into_response();
                            let mode = body_mode_for(&resp.headers);
                            (PartialHead::Response(resp), mode)
                        }
                    };
                    self.stage = Stage::Body {
                        head,
                        mode,
                        received: 0,
                        body: Vec::new(),
                    };
                    // loop again: a None body mode finishes immediately.
                }
                Stage::Body { mode, .. } if matches!(mode, BodyMode::None) => {
                    self.finish_body();
                }
                Stage::Body {
                    mode: BodyMode::Fixed(total),
                    received,
                    body,
                    ..
                } => {
                    let total = *total;
                    let regions = self.ring.readable_regions();
                    let remaining = (total - *received) as usize;
                    let take0 = regions.0.len().min(remaining);
                    body.extend_from_slice(&regions.0[..take0]);
                    let take1 = regions.1.len().min(remaining - take0);
                    body.extend_from_slice(&regions.1[..take1]);
                    let consumed = take0 + take1;
                    self.ring.consume(consumed);
                    *received += consumed as u64;
                    if *received == total {
                        self.finish_body();
                    } else {
                        return Ok(());
                    }
                }
                Stage::Body {
                    mode: BodyMode::Chunked(decoder),
                    body,
                    ..
                } => {
                    let regions = self.ring.readable_regions();
                    let progress = decoder.decode(regions, body)?;
                    self.ring.consume(progress.consumed);
                    if progress.is_last {
                        self.finish_body();
                    } else {
                        return Ok(());
                    }
                }
                Stage::Completed(_) | Stage::Done => return Ok(()),
            }
        }
    }

    fn finish_body(&mut self) {
        let Stage::Body { head, body, .. } = std::mem::replace(&mut self.stage, Stage::Done)
        else {
            unreachable!()
        };
        let body = Body::from_bytes(body);
        let completed = match head {
            PartialHead::Request(req) => PartialHead::Request(req.with_body(body)),
            PartialHead::Response(resp) => PartialHead::Response(resp.with_body(body)),
        };
        self.stage = Stage::Completed(completed);
    }

    fn take_completed(&mut self) -> PartialHead {
        match std::mem::replace(&mut self.stage, Stage::Done) {
            Stage::Completed(head) => head,
            _ => unreachable!("take_completed called without a completed message"),
        }
    }

    /// Tear down the reader for a protocol handoff (WebSocket upgrade):
    /// returns the underlying stream plus any bytes already buffered past
    /// the current message, so the next consumer doesn't lose them.
    pub fn into_parts(mut self) -> (S, Vec<u8>) {
        let (first, second) = self.ring.readable_regions();
        let mut leftover = Vec::with_capacity(first.len() + second.len());
        leftover.extend_from_slice(first);
        leftover.extend_from_slice(second);
        let len = leftover.len();
        self.ring.consume(len);
        (self.stream, leftover)
    }
}

fn body_mode_for(headers: &crate::message::HeaderMap) -> BodyMode {
    if headers.contains_token("Transfer-Encoding", "chunked") {
        return BodyMode::Chunked(ChunkedDecoder::new());
    }
    if let Some(len) = headers.get("Content-Length") {
        if let Ok(len) = len.trim().parse::<u64>() {
            return if len == 0 { BodyMode::None } else { BodyMode::Fixed(len) };
        }
    }
    BodyMode::None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f)
    }

    #[test]
    fn reads_simple_get_with_no_body() {
        block_on(async {
            let wire = b"GET /x HTTP/1.1\r\nHost: a\r\n\r\n".to_vec();
            let mut reader = Reader::new(Cursor::new(wire));
            loop {
                match reader.get_request().await.unwrap() {
                    ReadOutcome::Complete(req) => {
                        assert_eq!(req.path(), "/x");
                        assert!(req.body.is_empty());
                        break;
                    }
                    ReadOutcome::Pending => continue,
                }
            }
        });
    }

    #[test]
    fn reads_fixed_length_body() {
        block_on(async {
            let wire = b"POST /x HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello".to_vec();
            let mut reader = Reader::new(Cursor::new(wire));
            loop {
                match reader.get_request().await.unwrap() {
                    ReadOutcome::Complete(req) => {
                        assert_eq!(req.body.as_slice(), b"hello");
                        break;
                    }
                    ReadOutcome::Pending => continue,
                }
            }
        });
    }

    #[test]
    fn reads_chunked_body() {
        block_on(async {
            let wire = b"POST /x HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n"
                .to_vec();
            let mut reader = Reader::new(Cursor::new(wire));
            loop {
                match reader.get_request().await.unwrap() {
                    ReadOutcome::Complete(req) => {
                        assert_eq!(req.body.as_slice(), b"hello");
                        break;
                    }
                    ReadOutcome::Pending => continue,
                }
            }
        });
    }

    #[test]
    fn peer_close_mid_header_reports_connection_close() {
        block_on(async {
            let wire = b"GET /x HTTP/1.1\r\nHost: a".to_vec();
            let mut reader = Reader::new(Cursor::new(wire));
            let mut err = None;
            loop {
                match reader.get_request().await {
                    Ok(ReadOutcome::Pending) => continue,
                    Ok(ReadOutcome::Complete(_)) => panic!("should not complete"),
                    Err(e) => {
                        err = Some(e);
                        break;
                    }
                }
            }
            assert_eq!(err.unwrap().code(), codes::CONNECTION_CLOSE);
        });
    }

    #[test]
    fn oversized_head_rejected() {
        block_on(async {
            let mut wire = b"GET /".to_vec();
            wire.extend(std::iter::repeat(b'a').take(64));
            wire.extend_from_slice(b" HTTP/1.1\r\n\r\n");
            let mut reader = Reader::with_limits(Cursor::new(wire), 16, 16);
            let mut err = None;
            loop {
                match reader.get_request().await {
                    Ok(ReadOutcome::Pending) => continue,
                    Ok(ReadOutcome::Complete(_)) => panic!("should not complete"),
                    Err(e) => {
                        err = Some(e);
                        break;
                    }
                }
            }
            assert_eq!(err.unwrap().code(), codes::HEADER_TOO_LARGE);
        });
    }
}
