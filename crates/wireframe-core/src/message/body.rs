/// A message body, already fully assembled by the time it reaches the
/// caller — whether it arrived as a fixed `Content-Length` payload or as a
/// chunked stream reassembled by [`crate::parse::chunked`], the `Reader`
/// hands back the same value here. Streaming chunked bodies are exposed
/// separately via `ChunkStream` for callers that want to avoid buffering
/// (see `parse::chunked::ChunkStream`); this type is the buffered form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body {
    bytes: Vec<u8>,
}

impl Body {
    pub fn empty() -> Self {
        Self { bytes: Vec::new() }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Self {
            bytes: s.as_bytes().to_vec(),
        }
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Self {
            bytes: s.into_bytes(),
        }
    }
}
