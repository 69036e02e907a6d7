//! A minimal poll-based chunk source, used only by the static-file engine's
//! non-buffered transfer modes (`crate::staticfile`) to hand a response
//! body to the `Writer` without materializing the whole file in memory.
//! Kept as its own leaf module (depending only on `crate::error`) so both
//! `message` and `io` can use it without a dependency cycle.

use std::pin::Pin;
use std::task::{Context, Poll};

use crate::error::WireError;

/// `None` signals the body is exhausted; an `Err` aborts the transfer.
pub trait ChunkSource: Send {
    fn poll_next_chunk(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Vec<u8>, WireError>>>;
}

/// Pull the next chunk from a pinned [`ChunkSource`] as a plain `async fn`,
/// so callers don't hand-roll a `Future` impl at each call site.
pub async fn next_chunk(
    mut source: Pin<&mut (dyn ChunkSource + '_)>,
) -> Option<Result<Vec<u8>, WireError>> {
    std::future::poll_fn(|cx| source.as_mut().poll_next_chunk(cx)).await
}
