use std::pin::Pin;

use super::body::Body;
use super::header::HeaderMap;
use super::types::{StatusCode, Version};
use crate::stream::ChunkSource;

/// A response head plus body. No reason phrase is stored: emission always
/// derives the canonical phrase from the status code — parsing tolerates
/// missing reason text, so emission doesn't need to produce one either.
///
/// `body_stream`, when set, overrides `body`: the static-file engine's
/// CHUNKED and ZERO-COPY transfer modes attach a [`ChunkSource`] here
/// instead of buffering the whole file into `body`. Plain handlers never
/// need to touch this field.
pub struct Response {
    pub version: Version,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
    pub body_stream: Option<Pin<Box<dyn ChunkSource>>>,
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("version", &self.version)
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .field("streamed", &self.body_stream.is_some())
            .finish()
    }
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            version: Version::Http11,
            status: StatusCode(status),
            headers: HeaderMap::new(),
            body: Body::empty(),
            body_stream: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_stream(mut self, stream: impl ChunkSource + 'static) -> Self {
        self.body_stream = Some(Box::pin(stream));
        self
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn not_found() -> Self {
        Response::new(404).with_body("Not Found")
    }

    pub fn method_not_allowed() -> Self {
        Response::new(405).with_body("Method Not Allowed")
    }

    pub fn internal_error() -> Self {
        Response::new(500).with_body("Internal Server Error")
    }

    pub fn from_wire_error(err: &crate::error::WireError) -> Self {
        let status = crate::error::status_for(err.code()).unwrap_or(500);
        Response::new(status).with_body(err.message().to_string())
    }
}
