//! Read/write halves driving the frame codec and message reassembler over
//! a live socket. Data frames (`Message`) and unsolicited `Pong`s surface
//! to the caller for application-level handling; Ping and Close are
//! control-level obligations the protocol itself must satisfy, so
//! `WsReader` answers them inline — a Ping always gets a Pong, a Close
//! always gets a matching close frame followed by a socket shutdown —
//! before the event is handed up. The writer side is shared behind a
//! mutex (`WsHandle`) rather than owned exclusively by the reader, so a
//! heartbeat task can still send Pings concurrently with the receive loop
//! without racing the reader's own auto-replies.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::RngCore;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::error::WireError;
use crate::ws::close::{encode_close_payload, parse_close_payload, CloseCode};
use crate::ws::frame::{encode_frame, FrameDecoder, FrameProgress, Opcode, DEFAULT_MAX_FRAME_SIZE, DEFAULT_MAX_MESSAGE_SIZE};
use crate::ws::reassembly::{Reassembler, WsMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Server,
    Client,
}

/// One received unit of work for the connection's event loop to act on.
/// `Ping`/`Close` are reported only for visibility — by the time either
/// reaches the caller, `WsReader` has already sent the required reply (and,
/// for `Close`, shut the socket down), so there is nothing left to do but
/// log it or stop.
#[derive(Debug)]
pub enum WsEvent {
    Message(WsMessage),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close { code: CloseCode, reason: String },
}

/// A writer shared between the reader's automatic control-frame replies and
/// any task that wants to send application data or its own heartbeat
/// Pings. Cloning shares the same underlying socket handle; writes from
/// different clones are serialized by the inner mutex.
pub struct WsHandle<W> {
    writer: Arc<Mutex<WsWriter<W>>>,
    // Set the moment either side sends a Close frame, so that whichever
    // WsReader later sees the peer's Close (its own echo of ours, or the
    // peer's own initiation) knows whether to reply or just shut down.
    close_sent: Arc<AtomicBool>,
}

impl<W> Clone for WsHandle<W> {
    fn clone(&self) -> Self {
        Self { writer: self.writer.clone(), close_sent: self.close_sent.clone() }
    }
}

impl<W: AsyncWrite + Unpin> WsHandle<W> {
    pub async fn send_text(&self, text: &str) -> Result<(), WireError> {
        self.writer.lock().await.send_text(text).await
    }

    pub async fn send_binary(&self, bytes: &[u8]) -> Result<(), WireError> {
        self.writer.lock().await.send_binary(bytes).await
    }

    pub async fn send_ping(&self, payload: &[u8]) -> Result<(), WireError> {
        self.writer.lock().await.send_ping(payload).await
    }

    pub async fn send_pong(&self, payload: &[u8]) -> Result<(), WireError> {
        self.writer.lock().await.send_pong(payload).await
    }

    pub async fn send_close(&self, code: CloseCode, reason: &str) -> Result<(), WireError> {
        self.close_sent.store(true, Ordering::SeqCst);
        self.writer.lock().await.send_close(code, reason).await
    }
}

pub struct WsReader<R, W> {
    stream: R,
    decoder: FrameDecoder,
    reassembler: Reassembler,
    scratch: Vec<u8>,
    handle: WsHandle<W>,
}

impl<R: AsyncRead + Unpin, W: AsyncWrite + Unpin> WsReader<R, W> {
    /// Build a reader/handle pair sharing one writer. The returned
    /// `WsHandle` is what the caller keeps for sending its own messages
    /// (or Pings from a heartbeat task); the reader keeps a clone of the
    /// same handle purely to answer control frames.
    pub fn new(stream: R, writer: WsWriter<W>) -> (Self, WsHandle<W>) {
        Self::with_limits(stream, writer, DEFAULT_MAX_FRAME_SIZE, DEFAULT_MAX_MESSAGE_SIZE)
    }

    pub fn with_limits(
        stream: R,
        writer: WsWriter<W>,
        max_frame_size: u64,
        max_message_size: u64,
    ) -> (Self, WsHandle<W>) {
        let handle = WsHandle {
            writer: Arc::new(Mutex::new(writer)),
            close_sent: Arc::new(AtomicBool::new(false)),
        };
        let reader = Self {
            stream,
            decoder: FrameDecoder::new(max_frame_size),
            reassembler: Reassembler::new(max_message_size),
            scratch: vec![0u8; 4096],
            handle: handle.clone(),
        };
        (reader, handle)
    }

    /// Read and decode frames until one complete event is ready. Data
    /// frames are folded into the reassembler and only surfaced once a
    /// whole message is in hand. Ping and Close are answered here, before
    /// the event is returned, so the reply happens regardless of what the
    /// caller does with the event afterward.
    pub async fn recv_event(&mut self) -> Result<WsEvent, WireError> {
        loop {
            let n = self.stream.read(&mut self.scratch).await.map_err(WireError::from)?;
            if n == 0 {
                return Err(WireError::from(std::io::Error::from(
                    std::io::ErrorKind::UnexpectedEof,
                )));
            }
            for i in 0..n {
                if let FrameProgress::Complete(frame) = self.decoder.feed_byte(self.scratch[i])? {
                    match frame.opcode {
                        Opcode::Ping => {
                            self.handle.send_pong(&frame.payload).await?;
                            return Ok(WsEvent::Ping(frame.payload));
                        }
                        Opcode::Pong => return Ok(WsEvent::Pong(frame.payload)),
                        Opcode::Close => {
                            let (code, reason) = parse_close_payload(&frame.payload);
                            let already_initiated = self.handle.close_sent.swap(true, Ordering::SeqCst);
                            if !already_initiated {
                                self.handle.writer.lock().await.send_close(code, "").await?;
                            }
                            self.handle.writer.lock().await.shutdown().await?;
                            return Ok(WsEvent::Close { code, reason });
                        }
                        Opcode::Text | Opcode::Binary | Opcode::Continuation => {
                            if let Some(message) = self.reassembler.feed(frame)? {
                                return Ok(WsEvent::Message(message));
                            }
                        }
                    }
                }
            }
        }
    }
}

pub struct WsWriter<W> {
    stream: W,
    role: Role,
}

impl<W: AsyncWrite + Unpin> WsWriter<W> {
    pub fn new(stream: W, role: Role) -> Self {
        Self { stream, role }
    }

    fn mask_key(&self) -> Option<[u8; 4]> {
        match self.role {
            Role::Server => None,
            Role::Client => {
                let mut key = [0u8; 4];
                rand::thread_rng().fill_bytes(&mut key);
                Some(key)
            }
        }
    }

    async fn write_frame(&mut self, fin: bool, opcode: Opcode, payload: &[u8]) -> Result<(), WireError> {
        let bytes = encode_frame(fin, opcode, payload, self.mask_key());
        self.stream.write_all(&bytes).await.map_err(WireError::from)
    }

    pub async fn send_text(&mut self, text: &str) -> Result<(), WireError> {
        self.write_frame(true, Opcode::Text, text.as_bytes()).await
    }

    pub async fn send_binary(&mut self, bytes: &[u8]) -> Result<(), WireError> {
        self.write_frame(true, Opcode::Binary, bytes).await
    }

    pub async fn send_ping(&mut self, payload: &[u8]) -> Result<(), WireError> {
        self.write_frame(true, Opcode::Ping, payload).await
    }

    pub async fn send_pong(&mut self, payload: &[u8]) -> Result<(), WireError> {
        self.write_frame(true, Opcode::Pong, payload).await
    }

    pub async fn send_close(&mut self, code: CloseCode, reason: &str) -> Result<(), WireError> {
        let payload = encode_close_payload(code, reason);
        self.write_frame(true, Opcode::Close, &payload).await
    }

    /// Shut the underlying socket down after the close handshake completes.
    pub async fn shutdown(&mut self) -> Result<(), WireError> {
        self.stream.shutdown().await.map_err(WireError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    struct MemStream {
        data: std::io::Cursor<Vec<u8>>,
        out: Vec<u8>,
    }

    impl AsyncRead for MemStream {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            use std::io::Read;
            let mut tmp = vec![0u8; buf.remaining()];
            let n = self.data.read(&mut tmp)?;
            buf.put_slice(&tmp[..n]);
            Poll::Ready(Ok(()))
        }
    }

    impl AsyncWrite for MemStream {
        fn poll_write(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, data: &[u8]) -> Poll<std::io::Result<usize>> {
            self.out.extend_from_slice(data);
            Poll::Ready(Ok(data.len()))
        }
        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn mem(data: Vec<u8>) -> MemStream {
        MemStream { data: std::io::Cursor::new(data), out: Vec::new() }
    }

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f)
    }

    #[test]
    fn reads_a_masked_text_message() {
        block_on(async {
            let key = [9, 8, 7, 6];
            let wire = encode_frame(true, Opcode::Text, b"Hello", Some(key));
            let (mut reader, _handle) = WsReader::new(mem(wire), WsWriter::new(mem(Vec::new()), Role::Server));
            match reader.recv_event().await.unwrap() {
                WsEvent::Message(msg) => assert_eq!(msg.payload, b"Hello"),
                other => panic!("unexpected event: {other:?}"),
            }
        });
    }

    #[test]
    fn ping_is_answered_with_a_pong_before_the_event_surfaces() {
        block_on(async {
            let key = [1, 2, 3, 4];
            let wire = encode_frame(true, Opcode::Ping, b"ping-payload", Some(key));
            let write_stream = mem(Vec::new());
            let (mut reader, handle) = WsReader::new(mem(wire), WsWriter::new(write_stream, Role::Server));
            match reader.recv_event().await.unwrap() {
                WsEvent::Ping(payload) => assert_eq!(payload, b"ping-payload"),
                other => panic!("unexpected event: {other:?}"),
            }
            let written = handle.writer.lock().await;
            assert_eq!(written.stream.out[0] & 0x0f, 0xA, "expected a Pong opcode in the reply frame");
        });
    }

    #[test]
    fn close_is_answered_and_the_socket_is_shut_down() {
        block_on(async {
            let key = [1, 2, 3, 4];
            let wire = encode_frame(true, Opcode::Close, &encode_close_payload(CloseCode::Normal, ""), Some(key));
            let write_stream = mem(Vec::new());
            let (mut reader, handle) = WsReader::new(mem(wire), WsWriter::new(write_stream, Role::Server));
            match reader.recv_event().await.unwrap() {
                WsEvent::Close { code, .. } => assert_eq!(code, CloseCode::Normal),
                other => panic!("unexpected event: {other:?}"),
            }
            let written = handle.writer.lock().await;
            assert_eq!(written.stream.out[0] & 0x0f, 0x8, "expected a Close opcode in the reply frame");
        });
    }

    #[test]
    fn writer_masks_when_acting_as_client() {
        block_on(async {
            let mut writer = WsWriter::new(mem(Vec::new()), Role::Client);
            writer.send_text("Hi").await.unwrap();
            assert_eq!(writer.stream.out[1] & 0x80, 0x80, "MASK bit must be set");
        });
    }

    #[test]
    fn writer_does_not_mask_as_server() {
        block_on(async {
            let mut writer = WsWriter::new(mem(Vec::new()), Role::Server);
            writer.send_text("Hi").await.unwrap();
            assert_eq!(writer.stream.out[1] & 0x80, 0);
        });
    }
}
