//! Mixed exact-match + trie-based router. Registration classifies a pattern
//! as exact (no `:` or `*` anywhere) or fuzzy; exact patterns go into a
//! hash map for O(1) lookup, fuzzy patterns descend a per-method trie in a
//! fixed priority order (literal, then parameter, then `*`, then `**`).

mod trie;

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::{codes, WireError};
use crate::message::{Method, Request, Response};

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Response, WireError>> + Send>>;

/// A route handler: takes an owned `Request` (with route parameters
/// already bound) and asynchronously produces a `Response`.
pub trait Handler: Send + Sync {
    fn call(&self, req: Request) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, WireError>> + Send + 'static,
{
    fn call(&self, req: Request) -> HandlerFuture {
        Box::pin(self(req))
    }
}

pub type BoxHandler = Arc<dyn Handler>;

/// Outcome of a route lookup, distinguishing "no route at all" from "a
/// route exists for this path under a different method" so the caller can
/// choose 404 vs 405.
pub enum Matched {
    Handler {
        handler: BoxHandler,
        params: HashMap<String, String>,
    },
    MethodNotAllowed,
    NotFound,
}

/// A router built once at startup and read thereafter — safe to share
/// across connection tasks without locking, since nothing about it ever
/// mutates after `add`/`mount` calls stop.
#[derive(Default)]
pub struct Router {
    exact: HashMap<Method, HashMap<String, BoxHandler>>,
    tries: HashMap<Method, trie::Node>,
    known_paths: HashMap<String, Vec<Method>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `methods` at `pattern`. A pattern containing
    /// neither `:` nor `*` is exact; anything else is inserted into the
    /// per-method trie.
    pub fn add(
        &mut self,
        methods: &[Method],
        pattern: &str,
        handler: impl Handler + 'static,
    ) -> Result<(), WireError> {
        let handler: BoxHandler = Arc::new(handler);
        let segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
        let is_fuzzy = segments.iter().any(|s| s.starts_with(':') || *s == "*" || *s == "**");

        for method in methods {
            self.known_paths
                .entry(pattern.to_string())
                .or_default()
                .push(method.clone());
            if is_fuzzy {
                self.tries
                    .entry(method.clone())
                    .or_default()
                    .insert(&segments, handler.clone())?;
            } else {
                let normalized = segments.join("/");
                if self
                    .exact
                    .entry(method.clone())
                    .or_default()
                    .insert(normalized, handler.clone())
                    .is_some()
                {
                    return Err(WireError::new(
                        codes::ROUTE_CONFLICT,
                        "duplicate exact route registration",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Register a greedy-wildcard handler at `prefix` that serves files out
    /// of `directory` using `config`.
    pub fn mount(
        &mut self,
        prefix: &str,
        directory: impl Into<std::path::PathBuf>,
        config: crate::config::StaticFileConfig,
    ) -> Result<(), WireError> {
        let serve = crate::staticfile::mount_handler(prefix, directory.into(), config);
        let pattern = format!("{}/**", prefix.trim_end_matches('/'));
        self.add(&[Method::Get, Method::Head], &pattern, serve)
    }

    /// Walk `directory` at registration time and register one exact route
    /// per regular file found, optionally caching file bytes in memory
    /// (gated by `config.enable_cache`, bounded by `config.max_cache_size`).
    pub fn mount_preload(
        &mut self,
        prefix: &str,
        directory: impl AsRef<Path>,
        config: crate::config::StaticFileConfig,
    ) -> Result<(), WireError> {
        let directory = directory.as_ref();
        let entries = crate::staticfile::preload_entries(directory, &config)?;
        let prefix = prefix.trim_end_matches('/');
        for (rel_path, bytes) in entries {
            let route_path = format!("{prefix}/{rel_path}");
            let handler = crate::staticfile::preloaded_handler(bytes);
            self.add(&[Method::Get, Method::Head], &route_path, handler)?;
        }
        Ok(())
    }

    pub fn matched(&self, req: &Request) -> Matched {
        let path = req.path();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let normalized = segments.join("/");

        if let Some(h) = self.exact.get(&req.method).and_then(|m| m.get(&normalized)) {
            return Matched::Handler {
                handler: h.clone(),
                params: HashMap::new(),
            };
        }
        if let Some(trie) = self.tries.get(&req.method) {
            let mut bound = Vec::new();
            if let Some(h) = trie.lookup(&segments, &mut bound) {
                return Matched::Handler {
                    handler: h.clone(),
                    params: bound.into_iter().collect(),
                };
            }
        }

        if self.any_other_method_matches(&req.method, &segments, &normalized) {
            Matched::MethodNotAllowed
        } else {
            Matched::NotFound
        }
    }

    fn any_other_method_matches(
        &self,
        method: &Method,
        segments: &[&str],
        normalized: &str,
    ) -> bool {
        for (other, map) in &self.exact {
            if other != method && map.contains_key(normalized) {
                return true;
            }
        }
        for (other, trie) in &self.tries {
            if other != method {
                let mut scratch = Vec::new();
                if trie.lookup(segments, &mut scratch).is_some() {
                    return true;
                }
            }
        }
        false
    }

    /// Dispatch a request: look it up and either invoke the matched handler
    /// (with route params bound onto the request) or synthesize the
    /// appropriate 404/405 response.
    pub async fn dispatch(&self, mut req: Request) -> Result<Response, WireError> {
        match self.matched(&req) {
            Matched::Handler { handler, params } => {
                req.set_params(params);
                handler.call(req).await
            }
            Matched::MethodNotAllowed => Ok(Response::method_not_allowed()),
            Matched::NotFound => Ok(Response::not_found()),
        }
    }
}
