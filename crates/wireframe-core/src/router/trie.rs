use std::collections::HashMap;

use crate::error::{codes, WireError};

use super::BoxHandler;

/// One node of a per-method route trie. Children are keyed by kind rather
/// than by a single map, because lookup order is fixed priority (literal,
/// then parameter, then single wildcard, then greedy wildcard) rather than
/// insertion order.
#[derive(Default)]
pub struct Node {
    literal: HashMap<String, Node>,
    param: Option<(String, Box<Node>)>,
    wildcard: Option<Box<Node>>,
    greedy: Option<Box<Node>>,
    handler: Option<BoxHandler>,
}

impl Node {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `handler` at the path described by `segments`, creating
    /// intermediate nodes as needed. Rejects malformed patterns: `**` not
    /// in the last position, `*` combined with other characters in a
    /// segment, invalid `:name` identifiers, and duplicate parameter names
    /// within one pattern.
    pub fn insert(&mut self, segments: &[&str], handler: BoxHandler) -> Result<(), WireError> {
        let mut seen_params: Vec<&str> = Vec::new();
        self.insert_at(segments, handler, &mut seen_params)
    }

    fn insert_at<'a>(
        &mut self,
        segments: &[&'a str],
        handler: BoxHandler,
        seen_params: &mut Vec<&'a str>,
    ) -> Result<(), WireError> {
        let Some((head, rest)) = segments.split_first() else {
            if self.handler.is_some() {
                return Err(route_error("duplicate route for this pattern"));
            }
            self.handler = Some(handler);
            return Ok(());
        };

        if *head == "**" {
            if !rest.is_empty() {
                return Err(route_error("** must be the last segment"));
            }
            let node = self.greedy.get_or_insert_with(|| Box::new(Node::new()));
            if node.handler.is_some() {
                return Err(route_error("duplicate ** route"));
            }
            node.handler = Some(handler);
            return Ok(());
        }

        if *head == "*" {
            let node = self.wildcard.get_or_insert_with(|| Box::new(Node::new()));
            return node.insert_at(rest, handler, seen_params);
        }

        if let Some(name) = head.strip_prefix(':') {
            if name.is_empty() || !is_valid_identifier(name) {
                return Err(route_error("invalid parameter name"));
            }
            if seen_params.contains(&name) {
                return Err(route_error("duplicate parameter name in pattern"));
            }
            seen_params.push(name);
            match &mut self.param {
                Some((existing, _)) if existing != name => {
                    return Err(route_error(
                        "conflicting parameter name at the same trie position",
                    ));
                }
                Some((_, node)) => return node.insert_at(rest, handler, seen_params),
                None => {
                    let mut node = Box::new(Node::new());
                    node.insert_at(rest, handler, seen_params)?;
                    self.param = Some((name.to_string(), node));
                    return Ok(());
                }
            }
        }

        let child = self.literal.entry((*head).to_string()).or_default();
        child.insert_at(rest, handler, seen_params)
    }

    /// Depth-first lookup in fixed priority order. Bound parameter names are
    /// recorded in `params`; unmatched branches are fully unwound (nothing
    /// is left bound on backtrack) before the next sibling is tried.
    pub fn lookup<'a>(
        &self,
        segments: &[&'a str],
        params: &mut Vec<(String, String)>,
    ) -> Option<&BoxHandler> {
        let Some((head, rest)) = segments.split_first() else {
            return self.handler.as_ref();
        };

        if let Some(child) = self.literal.get(*head) {
            if let Some(h) = child.lookup(rest, params) {
                return Some(h);
            }
        }

        if let Some((name, child)) = &self.param {
            let mark = params.len();
            params.push((name.clone(), (*head).to_string()));
            if let Some(h) = child.lookup(rest, params) {
                return Some(h);
            }
            params.truncate(mark);
        }

        if let Some(child) = &self.wildcard {
            if let Some(h) = child.lookup(rest, params) {
                return Some(h);
            }
        }

        if let Some(child) = &self.greedy {
            if child.handler.is_some() {
                return child.handler.as_ref();
            }
        }

        None
    }
}

fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn route_error(msg: &'static str) -> WireError {
    WireError::new(codes::ROUTE_CONFLICT, msg)
}
