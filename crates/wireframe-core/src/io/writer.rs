use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{codes, WireError};
use crate::message::{encode_request, encode_response, Request, Response};
use crate::parse::chunked;
use crate::stream;

/// Writes a single HTTP message incrementally: each call performs at
/// most one socket write, and the caller
/// MUST retry with the same arguments until the call reports `true`
/// (complete). The writer remembers how many bytes of the current
/// operation it already sent across retries — callers never resend data
/// themselves.
pub struct Writer<S> {
    stream: S,
    pending: Vec<u8>,
    sent: usize,
}

impl<S: AsyncWrite + Unpin> Writer<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            pending: Vec::new(),
            sent: 0,
        }
    }

    /// Emit a response head (and body, for non-chunked responses).
    /// `Content-Length` is auto-inserted when absent and the response isn't
    /// chunked. Returns `Ok(true)` once the whole message has been written.
    pub async fn send_response(&mut self, resp: &Response) -> Result<bool, WireError> {
        self.begin_if_idle(|| encode_response(resp));
        self.drive().await
    }

    pub async fn send_request(&mut self, req: &Request) -> Result<bool, WireError> {
        self.begin_if_idle(|| encode_request(req));
        self.drive().await
    }

    /// Emit one chunk of a `Transfer-Encoding: chunked` body. `is_last`
    /// marks the terminating zero-length chunk; callers drive a chunked
    /// response by calling this repeatedly, each with `is_last = false`,
    /// finishing with one `is_last = true` call (which may itself carry
    /// trailing bytes).
    pub async fn send_chunk(&mut self, bytes: &[u8], is_last: bool) -> Result<bool, WireError> {
        self.begin_if_idle(|| chunked::encode(bytes, is_last));
        self.drive().await
    }

    /// Write exactly `bytes` with no framing applied, retry-until-complete
    /// like every other send method here. Used for a response body that was
    /// already serialized elsewhere (e.g. a static-file ZERO-COPY block).
    pub async fn send_raw(&mut self, bytes: &[u8]) -> Result<bool, WireError> {
        self.begin_if_idle(|| bytes.to_vec());
        self.drive().await
    }

    /// Send a full response, including a body supplied via
    /// [`Response::body_stream`] rather than [`Response::body`]. Drives the
    /// head to completion, then pulls chunks from the stream and drives
    /// each one to completion in turn — framed as chunked transfer if the
    /// response declared `Transfer-Encoding: chunked`, or written raw
    /// otherwise (the static-file engine's ZERO-COPY mode, which instead
    /// relies on an explicit `Content-Length`).
    pub async fn send_response_full(&mut self, mut resp: Response) -> Result<(), WireError> {
        let body_stream = resp.body_stream.take();
        let chunked = resp.headers.contains_token("Transfer-Encoding", "chunked");
        while !self.send_response(&resp).await? {}
        let Some(mut source) = body_stream else {
            return Ok(());
        };
        loop {
            match stream::next_chunk(source.as_mut()).await {
                Some(Ok(bytes)) => {
                    if chunked {
                        while !self.send_chunk(&bytes, false).await? {}
                    } else {
                        while !self.send_raw(&bytes).await? {}
                    }
                }
                Some(Err(e)) => return Err(e),
                None => {
                    if chunked {
                        while !self.send_chunk(&[], true).await? {}
                    }
                    return Ok(());
                }
            }
        }
    }

    fn begin_if_idle(&mut self, encode: impl FnOnce() -> Vec<u8>) {
        if self.pending.is_empty() && self.sent == 0 {
            self.pending = encode();
        }
    }

    async fn drive(&mut self) -> Result<bool, WireError> {
        if self.sent >= self.pending.len() {
            self.pending.clear();
            self.sent = 0;
            return Ok(true);
        }
        let n = self
            .stream
            .write(&self.pending[self.sent..])
            .await
            .map_err(WireError::from)?;
        if n == 0 {
            return Err(WireError::new(codes::SEND_ERROR, "write returned 0 bytes"));
        }
        self.sent += n;
        if self.sent >= self.pending.len() {
            self.pending.clear();
            self.sent = 0;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub async fn flush(&mut self) -> Result<(), WireError> {
        self.stream.flush().await.map_err(WireError::from)
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Response;

    /// A writer that only accepts a handful of bytes per call, to exercise
    /// the retry-until-complete contract.
    struct Stingy {
        buf: Vec<u8>,
        max_per_write: usize,
    }

    impl AsyncWrite for Stingy {
        fn poll_write(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            data: &[u8],
        ) -> std::task::Poll<std::io::Result<usize>> {
            let this = self.get_mut();
            let n = data.len().min(this.max_per_write);
            this.buf.extend_from_slice(&data[..n]);
            std::task::Poll::Ready(Ok(n))
        }
        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }
        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
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
    fn retries_until_complete_on_partial_writes() {
        block_on(async {
            let resp = Response::new(200).with_body("0123456789");
            let mut writer = Writer::new(Stingy {
                buf: Vec::new(),
                max_per_write: 3,
            });
            let mut calls = 0;
            loop {
                calls += 1;
                if writer.send_response(&resp).await.unwrap() {
                    break;
                }
                assert!(calls < 1000, "writer never completed");
            }
            assert!(calls > 1, "expected more than one write call");
            let out = String::from_utf8(writer.into_inner().buf).unwrap();
            assert!(out.ends_with("\r\n\r\n0123456789"));
        });
    }

    #[test]
    fn fresh_call_after_completion_serializes_again() {
        block_on(async {
            let mut writer = Writer::new(Stingy {
                buf: Vec::new(),
                max_per_write: 1024,
            });
            let a = Response::new(200).with_body("a");
            let b = Response::new(404).with_body("missing");
            assert!(writer.send_response(&a).await.unwrap());
            assert!(writer.send_response(&b).await.unwrap());
            let out = String::from_utf8(writer.into_inner().buf).unwrap();
            assert!(out.contains("200 OK"));
            assert!(out.contains("404 Not Found"));
        });
    }
}
