//! The Composed Awaitable: a three-state coordinator —
//! Invalid → Sending → Receiving → Invalid — that pairs a request emit
//! with a response parse over one connection, with an external
//! `.timeout(duration)` adapter.

use tokio::io::{split, AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::time::Duration;

use crate::error::{codes, WireError};
use crate::io::{ReadOutcome, Reader, Writer};
use crate::message::{HeaderMap, Method, Request, Response, Version};

enum State {
    Invalid,
    Sending(Request),
    Receiving,
}

/// Drives one request/response exchange at a time over a full-duplex
/// stream. Split into read/write halves so the Writer can finish sending
/// while the Reader is already primed to receive — the coordinator itself
/// is what serializes "send, then receive", not the stream.
pub struct ComposedAwaitable<S> {
    writer: Writer<WriteHalf<S>>,
    reader: Reader<ReadHalf<S>>,
    state: State,
}

impl<S: AsyncRead + AsyncWrite + Unpin> ComposedAwaitable<S> {
    pub fn new(stream: S) -> Self {
        Self::with_limits(stream, crate::io::DEFAULT_HEADER_LIMIT, crate::io::DEFAULT_HEADER_LIMIT)
    }

    pub fn with_limits(stream: S, ring_capacity: usize, max_header_size: usize) -> Self {
        let (read_half, write_half) = split(stream);
        Self {
            writer: Writer::new(write_half),
            reader: Reader::with_limits(read_half, ring_capacity, max_header_size),
            state: State::Invalid,
        }
    }

    /// Issue `GET path` against `host` and drive the coordinator to
    /// completion. Re-callable: each call starts from a fresh Invalid
    /// state and returns to Invalid on completion or error.
    pub async fn get(&mut self, host: &str, path: &str) -> Result<Response, WireError> {
        let mut headers = HeaderMap::new();
        headers.insert("Host", host.to_string());
        headers.insert("Connection", "keep-alive");
        let req = Request::new(Method::Get, path.to_string(), Version::Http11, headers);
        self.request(req).await
    }

    /// Same as [`Self::get`] but bounded by `duration`. On expiry the
    /// coordinator is reset to Invalid and a `Timeout` error is returned;
    /// any partial send/receive state is discarded.
    pub async fn get_with_timeout(
        &mut self,
        host: &str,
        path: &str,
        duration: Duration,
    ) -> Result<Response, WireError> {
        match tokio::time::timeout(duration, self.get(host, path)).await {
            Ok(result) => result,
            Err(_) => {
                self.state = State::Invalid;
                Err(WireError::new(codes::TIMEOUT, "request timed out"))
            }
        }
    }

    /// Send an arbitrary request and drive the coordinator to completion.
    pub async fn request(&mut self, req: Request) -> Result<Response, WireError> {
        self.state = State::Sending(req);
        loop {
            match std::mem::replace(&mut self.state, State::Invalid) {
                State::Sending(req) => match self.writer.send_request(&req).await {
                    Ok(true) => {
                        self.reader.begin_next_response();
                        self.state = State::Receiving;
                    }
                    Ok(false) => self.state = State::Sending(req),
                    Err(e) => return Err(e),
                },
                State::Receiving => match self.reader.get_response().await {
                    Ok(ReadOutcome::Complete(resp)) => return Ok(resp),
                    Ok(ReadOutcome::Pending) => self.state = State::Receiving,
                    Err(e) => return Err(e),
                },
                State::Invalid => {
                    return Err(WireError::new(
                        codes::INTERNAL,
                        "composed awaitable driven from Invalid state",
                    ))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// A duplex in-memory stream: reads come from a canned response,
    /// writes are captured for inspection.
    struct Duplex {
        inbound: std::io::Cursor<Vec<u8>>,
        outbound: Vec<u8>,
    }

    impl AsyncRead for Duplex {
        fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
            use std::io::Read;
            let mut tmp = vec![0u8; buf.remaining()];
            let n = self.inbound.read(&mut tmp)?;
            buf.put_slice(&tmp[..n]);
            Poll::Ready(Ok(()))
        }
    }

    impl AsyncWrite for Duplex {
        fn poll_write(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, data: &[u8]) -> Poll<std::io::Result<usize>> {
            self.outbound.extend_from_slice(data);
            Poll::Ready(Ok(data.len()))
        }
        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f)
    }

    #[test]
    fn get_completes_with_response_body() {
        block_on(async {
            let response = b"HTTP/1.1 200 OK\r\nContent-Length: 13\r\n\r\n{\"ok\":true}\r\n".to_vec();
            let stream = Duplex { inbound: std::io::Cursor::new(response), outbound: Vec::new() };
            let mut client = ComposedAwaitable::new(stream);
            let resp = client.get("example.com", "/api/data").await.unwrap();
            assert_eq!(resp.status.0, 200);
            assert_eq!(resp.body.as_slice(), b"{\"ok\":true}\r\n");
        });
    }

    #[test]
    fn reusing_after_completion_starts_fresh() {
        block_on(async {
            let response =
                b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nokHTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok".to_vec();
            let stream = Duplex { inbound: std::io::Cursor::new(response), outbound: Vec::new() };
            let mut client = ComposedAwaitable::new(stream);
            let first = client.get("example.com", "/a").await.unwrap();
            let second = client.get("example.com", "/b").await.unwrap();
            assert_eq!(first.status.0, 200);
            assert_eq!(second.status.0, 200);
        });
    }
}
