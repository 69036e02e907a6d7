use std::path::{Path, PathBuf};

use crate::config::StaticFileConfig;
use crate::error::{codes, WireError};

/// Resolve `request_path` (already stripped of its mount prefix) against
/// `base`, rejecting path traversal, deny-listed segments, hidden files
/// (when configured), and symlinks whose target escapes `base`.
pub async fn resolve_path(
    base: &Path,
    request_path: &str,
    config: &StaticFileConfig,
) -> Result<PathBuf, WireError> {
    let mut candidate = base.to_path_buf();
    for segment in request_path.split('/') {
        if segment.is_empty() || segment == "." {
            continue;
        }
        if segment == ".." {
            return Err(forbidden("path traversal rejected"));
        }
        check_deny_list(segment, config)?;
        if config.block_hidden_files && segment.starts_with('.') {
            return Err(forbidden("dotfile access blocked"));
        }
        candidate.push(segment);
    }

    let canonical_base = tokio::fs::canonicalize(base)
        .await
        .map_err(|e| not_found_or(e, "mount base directory missing"))?;
    let canonical_candidate = tokio::fs::canonicalize(&candidate)
        .await
        .map_err(|e| not_found_or(e, "requested file missing"))?;

    // `canonicalize` already resolves symlinks, so this one check covers
    // both a direct traversal attempt and a symlink pointing outside base.
    if !canonical_candidate.starts_with(&canonical_base) {
        return Err(forbidden("resolved path escapes mount base"));
    }
    Ok(canonical_candidate)
}

fn check_deny_list(segment: &str, config: &StaticFileConfig) -> Result<(), WireError> {
    if config.deny_list.contains(segment) {
        return Err(forbidden("path segment is deny-listed"));
    }
    if let Some(ext) = Path::new(segment).extension().and_then(|e| e.to_str()) {
        if config.deny_list.contains(&format!(".{ext}")) {
            return Err(forbidden("file extension is deny-listed"));
        }
    }
    Ok(())
}

fn forbidden(msg: &'static str) -> WireError {
    WireError::new(codes::FORBIDDEN, msg)
}

fn not_found_or(err: std::io::Error, msg: &'static str) -> WireError {
    if err.kind() == std::io::ErrorKind::NotFound {
        WireError::new(codes::NOT_FOUND, msg)
    } else {
        WireError::from(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticFileConfig;

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f)
    }

    #[test]
    fn rejects_dotdot_traversal() {
        block_on(async {
            let dir = std::env::temp_dir().join("wireframe-sec-test");
            let _ = std::fs::create_dir_all(&dir);
            let config = StaticFileConfig::default();
            let err = resolve_path(&dir, "../etc/passwd", &config).await.unwrap_err();
            assert_eq!(err.code(), codes::FORBIDDEN);
        });
    }

    #[test]
    fn rejects_denied_segment() {
        block_on(async {
            let dir = std::env::temp_dir().join("wireframe-sec-test2");
            let _ = std::fs::create_dir_all(dir.join(".git"));
            let config = StaticFileConfig::default();
            let err = resolve_path(&dir, ".git/config", &config).await.unwrap_err();
            assert_eq!(err.code(), codes::FORBIDDEN);
        });
    }
}
