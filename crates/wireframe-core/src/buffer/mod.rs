//! Buffer primitives: the fixed-capacity [`RingBuffer`] that backs every
//! connection's read/write path, kept deliberately separate from the
//! parsers and message types that consume it (see [`crate::parse`] and
//! [`crate::message`]).

mod ring;

pub use ring::RingBuffer;
