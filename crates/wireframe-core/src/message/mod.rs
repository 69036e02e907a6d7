//! Message value types: header map, request/response heads, bodies, method,
//! version and status. These are plain data — the state machines that
//! produce them live in [`crate::parse`].

mod body;
mod encode;
mod header;
mod request;
mod response;
mod types;

pub use body::Body;
pub use encode::{encode_request, encode_response};
pub use header::HeaderMap;
pub use request::Request;
pub use response::Response;
pub use types::{Method, StatusCode, Version};
