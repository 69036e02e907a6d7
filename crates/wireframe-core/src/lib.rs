//! `wireframe-core`: an incremental HTTP/1.1 + WebSocket wire-protocol
//! engine. Every byte-handling component in this crate — the ring buffer,
//! the head and chunked-body parsers, the reader/writer pair, the router,
//! the static-file engine and the WebSocket codec — is built to be fed a
//! handful of bytes at a time and to resume exactly where it left off,
//! because the only thing a real socket promises is that bytes arrive in
//! order, not that they arrive whole.

pub mod buffer;
pub mod client;
pub mod config;
pub mod error;
pub mod io;
pub mod message;
pub mod parse;
pub mod router;
pub mod server;
pub mod staticfile;
pub mod stream;
pub mod ws;

pub use error::WireError;
