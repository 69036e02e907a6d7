use smallvec::SmallVec;
use std::collections::HashMap;

/// Header name/value storage. Duplicate names are **list-valued**: `insert`
/// appends rather than overwriting, `get` returns the first stored value
/// (the "effective" value most callers want), and `get_all` exposes the
/// full list. Serialization emits one line per stored value in insertion
/// order — interleaved across distinct names exactly as they were
/// inserted — so parse → serialize round-trips are lossless regardless of
/// how many times a name repeated on the wire.
#[derive(Debug, Default, Clone)]
pub struct HeaderMap {
    // Flat chronological record of every insertion; this is the only
    // ordering source of truth. `index` exists purely so `get`/`get_all`/
    // `contains` don't need a linear scan.
    entries: Vec<(String, String)>,
    // Keyed by lowercased name, values are indices into `entries`. Most
    // names appear once, so the inline-1 smallvec avoids a heap allocation
    // for the common case.
    index: HashMap<String, SmallVec<[usize; 1]>>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(name: &str) -> String {
        name.to_ascii_lowercase()
    }

    /// Append a value for `name`, preserving any values already present.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let key = Self::key(&name);
        let pos = self.entries.len();
        self.entries.push((name, value.into()));
        self.index.entry(key).or_default().push(pos);
    }

    /// Replace all values for `name` with a single value. Drops the name's
    /// prior position(s) entirely and appends the replacement at the end,
    /// same as removing then inserting.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.remove(&Self::key(&name));
        self.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        let key = Self::key(name);
        self.index
            .get(&key)
            .and_then(|positions| positions.first())
            .map(|&i| self.entries[i].1.as_str())
    }

    pub fn get_all(&self, name: &str) -> Vec<&str> {
        let key = Self::key(name);
        match self.index.get(&key) {
            Some(positions) => positions.iter().map(|&i| self.entries[i].1.as_str()).collect(),
            None => Vec::new(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&Self::key(name))
    }

    pub fn remove(&mut self, name: &str) {
        let key = Self::key(name);
        if self.index.remove(&key).is_none() {
            return;
        }
        self.entries.retain(|(n, _)| Self::key(n) != key);
        self.rebuild_index();
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, (name, _)) in self.entries.iter().enumerate() {
            self.index.entry(Self::key(name)).or_default().push(i);
        }
    }

    /// `true` when `name`'s value(s) contain `needle` as a comma-separated,
    /// case-insensitive token. Used for `Connection`/`Upgrade` checks.
    pub fn contains_token(&self, name: &str, needle: &str) -> bool {
        self.get_all(name).iter().any(|value| {
            value
                .split(',')
                .any(|tok| tok.trim().eq_ignore_ascii_case(needle))
        })
    }

    /// Every stored `(name, value)` pair in the order it was inserted,
    /// interleaved across distinct names.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Serialize as `name: value\r\n` lines, one per stored value, in
    /// insertion order.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        for (name, value) in self.iter() {
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_are_list_valued() {
        let mut h = HeaderMap::new();
        h.insert("Set-Cookie", "a=1");
        h.insert("Set-Cookie", "b=2");
        assert_eq!(h.get("set-cookie"), Some("a=1"));
        assert_eq!(h.get_all("Set-Cookie"), ["a=1", "b=2"]);
    }

    #[test]
    fn set_replaces_all_values() {
        let mut h = HeaderMap::new();
        h.insert("X-A", "1");
        h.insert("X-A", "2");
        h.set("X-A", "3");
        assert_eq!(h.get_all("x-a"), ["3"]);
    }

    #[test]
    fn serialize_round_trips_duplicate_order() {
        let mut h = HeaderMap::new();
        h.insert("A", "1");
        h.insert("B", "2");
        h.insert("A", "3");
        let mut out = Vec::new();
        h.write_to(&mut out);
        assert_eq!(out, b"A: 1\r\nB: 2\r\nA: 3\r\n");
    }

    #[test]
    fn insertion_order_interleaves_across_three_names() {
        let mut h = HeaderMap::new();
        h.insert("A", "1");
        h.insert("B", "2");
        h.insert("C", "3");
        h.insert("B", "4");
        h.insert("A", "5");
        let order: Vec<(&str, &str)> = h.iter().collect();
        assert_eq!(
            order,
            vec![("A", "1"), ("B", "2"), ("C", "3"), ("B", "4"), ("A", "5")]
        );
    }

    #[test]
    fn contains_token_is_case_insensitive_comma_list() {
        let mut h = HeaderMap::new();
        h.insert("Connection", "keep-alive, Upgrade");
        assert!(h.contains_token("connection", "upgrade"));
        assert!(!h.contains_token("connection", "close"));
    }
}
