//! Incremental, byte-fed state machines. Nothing in this module ever
//! assumes a contiguous buffer or a single `feed`/`decode` call: every
//! parser here is safe to suspend and resume across arbitrary
//! byte-boundary fragmentation, including a `RingBuffer` wrap.

pub mod chunked;
pub mod head;
pub mod uri;

pub use chunked::ChunkedDecoder;
pub use head::{HeadKind, HeadParser, HeadProgress};
