use std::fs::Metadata;

/// A strong or weak validator derived from `"<inode-hex>-<size-hex>-<mtime-hex>"`,
/// matching the original engine's format exactly so ETags survive a restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ETag {
    quoted: String,
    weak: bool,
}

impl ETag {
    pub fn strong(discriminator: u64, size: u64, mtime: u64) -> Self {
        Self {
            quoted: format!("\"{discriminator:x}-{size:x}-{mtime:x}\""),
            weak: false,
        }
    }

    #[cfg(unix)]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        let mtime = metadata.mtime().max(0) as u64;
        Self::strong(metadata.ino(), metadata.len(), mtime)
    }

    #[cfg(not(unix))]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let mtime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self::strong(0, metadata.len(), mtime)
    }

    pub fn weak(self) -> Self {
        Self {
            quoted: self.quoted,
            weak: true,
        }
    }

    pub fn header_value(&self) -> String {
        if self.weak {
            format!("W/{}", self.quoted)
        } else {
            self.quoted.clone()
        }
    }
}

fn strip_weak_prefix(s: &str) -> &str {
    s.strip_prefix("W/").unwrap_or(s)
}

/// Compare two ETag header values per the normalize-then-compare rule:
/// strip an optional `W/` prefix from each side, then byte-compare the
/// quoted body.
pub fn etags_match(a: &str, b: &str) -> bool {
    strip_weak_prefix(a.trim()) == strip_weak_prefix(b.trim())
}
