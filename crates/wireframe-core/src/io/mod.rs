//! Incremental, retry-driven I/O wrappers. Both halves obey the same
//! discipline as the parsers in [`crate::parse`]: a call does at most one
//! unit of socket I/O and tells the caller whether to call again.

mod reader;
mod writer;

pub use reader::{ReadOutcome, Reader, DEFAULT_HEADER_LIMIT};
pub use writer::Writer;
