use std::collections::HashMap;

use super::body::Body;
use super::header::HeaderMap;
use super::types::{Method, Version};

/// A parsed request head plus whatever body the reader assembled. Route
/// parameters start empty and are filled in by the router between match
/// and dispatch.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub target: String,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: Body,
    params: HashMap<String, String>,
}

impl Request {
    pub fn new(method: Method, target: String, version: Version, headers: HeaderMap) -> Self {
        Self {
            method,
            target,
            version,
            headers,
            body: Body::empty(),
            params: HashMap::new(),
        }
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// Request-target path, with the query string (if any) stripped off.
    pub fn path(&self) -> &str {
        match self.target.find('?') {
            Some(idx) => &self.target[..idx],
            None => &self.target,
        }
    }

    /// Raw query string, without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.target.find('?').map(|idx| &self.target[idx + 1..])
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// Whether the peer wants the connection kept alive after this request.
    pub fn wants_keep_alive(&self) -> bool {
        if self.headers.contains_token("Connection", "close") {
            return false;
        }
        if self.headers.contains_token("Connection", "keep-alive") {
            return true;
        }
        self.version.default_keep_alive()
    }

    /// Percent-decoded path. Kept separate from [`Request::path`] because
    /// decoding before splitting on `/` would let an encoded `%2F`
    /// masquerade as a path separator — the router matches on the raw,
    /// still-encoded path.
    pub fn decoded_path(&self) -> String {
        crate::parse::uri::decode_uri_component(self.path(), false)
    }

    /// Query string parsed into decoded `(key, value)` pairs, with `+`
    /// decoded as space.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let Some(query) = self.query() else {
            return Vec::new();
        };
        query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((k, v)) => (
                    crate::parse::uri::decode_uri_component(k, true),
                    crate::parse::uri::decode_uri_component(v, true),
                ),
                None => (crate::parse::uri::decode_uri_component(pair, true), String::new()),
            })
            .collect()
    }

    pub fn is_websocket_upgrade(&self) -> bool {
        self.headers.contains_token("Connection", "upgrade")
            && self
                .headers
                .get("Upgrade")
                .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
    }
}
