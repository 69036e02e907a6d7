//! Per-connection lifecycle: parse → route → invoke → decide keep-alive,
//! with a WebSocket handoff branching off after a successful upgrade
//! response. Transport-agnostic — callers (the TCP listener in
//! `wireframe-transport-tcp`, or a test harness) supply any
//! `AsyncRead + AsyncWrite` endpoint, already past any TLS handshake.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::io::{split, AsyncRead, AsyncWrite, ReadBuf};

use crate::config::ServerConfig;
use crate::error::{codes, WireError};
use crate::io::{ReadOutcome, Reader, Writer};
use crate::message::{Request, Response};
use crate::router::Router;
use crate::ws::{WsHandle, WsReader, WsWriter};

/// A stream's already-buffered bytes replayed before further reads are
/// delegated to the real stream — used to hand a connection's leftover
/// bytes from the HTTP reader over to the WebSocket frame decoder without
/// losing them.
pub struct PrefixedStream<R> {
    leftover: std::io::Cursor<Vec<u8>>,
    inner: R,
}

impl<R: AsyncRead + Unpin> AsyncRead for PrefixedStream<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        let this = self.get_mut();
        if (this.leftover.position() as usize) < this.leftover.get_ref().len() {
            use std::io::Read;
            let mut tmp = vec![0u8; buf.remaining()];
            let n = this.leftover.read(&mut tmp)?;
            buf.put_slice(&tmp[..n]);
            return std::task::Poll::Ready(Ok(()));
        }
        Pin::new(&mut this.inner).poll_read(cx, buf)
    }
}

type BoxedRead = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWrite = Box<dyn AsyncWrite + Send + Unpin>;

pub type BoxedWsReader = WsReader<PrefixedStream<BoxedRead>, BoxedWrite>;
pub type BoxedWsWriter = WsHandle<BoxedWrite>;

/// A handler invoked once a WebSocket upgrade succeeds, taking ownership
/// of the connection for the rest of its life.
pub trait WsHandler: Send + Sync {
    fn call(
        &self,
        reader: BoxedWsReader,
        writer: BoxedWsWriter,
    ) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

impl<F, Fut> WsHandler for F
where
    F: Fn(BoxedWsReader, BoxedWsWriter) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn call(&self, reader: BoxedWsReader, writer: BoxedWsWriter) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(self(reader, writer))
    }
}

/// Drive one accepted connection to completion: repeatedly parse a
/// request, dispatch it through `router`, and emit the response, honoring
/// HTTP/1.0 vs 1.1 keep-alive defaults — until the peer closes, a fatal
/// error occurs, or a WebSocket upgrade hands the connection off to
/// `ws_handler`.
pub async fn serve_connection<S>(
    stream: S,
    router: Arc<Router>,
    config: Arc<ServerConfig>,
    ws_handler: Option<Arc<dyn WsHandler>>,
) -> Result<(), WireError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    tracing::debug!("connection accepted");
    let (read_half, write_half) = split(stream);
    let mut reader = Reader::with_limits(read_half, config.ring_buffer_size, config.max_header_size);
    let mut writer = Writer::new(write_half);

    let result = loop {
        let req = match read_full_request(&mut reader).await {
            Ok(Some(req)) => req,
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        };

        let keep_alive = req.wants_keep_alive();
        let path = req.path().to_string();

        if req.is_websocket_upgrade() {
            tracing::debug!(%path, "upgrading connection to websocket");
            break handle_upgrade(req, reader, writer, ws_handler).await;
        }

        let resp = match router.dispatch(req).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(%path, code = e.code(), "request dispatch failed");
                let forces_close = e.forces_close();
                let resp = Response::from_wire_error(&e);
                writer.send_response_full(resp).await?;
                if forces_close {
                    break Ok(());
                }
                reader.begin_next_request();
                continue;
            }
        };
        writer.send_response_full(resp).await?;

        if !keep_alive {
            break Ok(());
        }
        reader.begin_next_request();
    };

    match &result {
        Ok(()) => tracing::debug!("connection closed"),
        Err(e) => tracing::warn!(code = e.code(), "connection closed with error"),
    }
    result
}

async fn read_full_request<S: AsyncRead + Unpin>(
    reader: &mut Reader<S>,
) -> Result<Option<Request>, WireError> {
    loop {
        match reader.get_request().await {
            Ok(ReadOutcome::Complete(req)) => return Ok(Some(req)),
            Ok(ReadOutcome::Pending) => continue,
            Err(e) if e.code() == codes::CONNECTION_CLOSE => return Ok(None),
            Err(e) => return Err(e),
        }
    }
}

async fn handle_upgrade<S>(
    req: Request,
    reader: Reader<S>,
    mut writer: Writer<S>,
    ws_handler: Option<Arc<dyn WsHandler>>,
) -> Result<(), WireError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    match crate::ws::validate_upgrade_request(&req) {
        Ok(key) => {
            let resp = crate::ws::build_upgrade_response(key, None);
            while !writer.send_response(&resp).await? {}
            let Some(handler) = ws_handler else {
                return Ok(());
            };
            let (read_half, leftover) = reader.into_parts();
            let boxed_read: BoxedRead = Box::new(read_half);
            let boxed_write: BoxedWrite = Box::new(writer.into_inner());
            let ws_writer = WsWriter::new(boxed_write, crate::ws::Role::Server);
            let (ws_reader, ws_handle) = WsReader::new(
                PrefixedStream {
                    leftover: std::io::Cursor::new(leftover),
                    inner: boxed_read,
                },
                ws_writer,
            );
            handler.call(ws_reader, ws_handle).await;
            Ok(())
        }
        Err(e) => {
            tracing::warn!(code = e.code(), "websocket upgrade rejected");
            let resp = Response::from_wire_error(&e);
            while !writer.send_response(&resp).await? {}
            Ok(())
        }
    }
}
