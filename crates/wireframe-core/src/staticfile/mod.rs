//! Static-file serving core: mode selection between buffered, chunked,
//! and zero-copy transfer, path-security checks, and range /
//! conditional-request handling.

pub mod etag;
pub mod range;
mod chunk_source;
mod security;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use crate::config::{StaticFileConfig, TransferMode};
use crate::error::{codes, WireError};
use crate::message::{HeaderMap, Method, Request, Response};
use crate::router::{Handler, HandlerFuture};

pub use etag::ETag;
pub use range::{parse_range, ResolvedRange};

use chunk_source::FileChunkSource;

/// Serve one request against files rooted at `base`. `remainder` is the
/// request path with the mount prefix already stripped (and still
/// percent-encoded, since [`security::resolve_path`] splits on `/` itself).
pub async fn serve(
    base: &Path,
    remainder: &str,
    req: &Request,
    config: &StaticFileConfig,
) -> Result<Response, WireError> {
    let decoded = crate::parse::uri::decode_uri_component(remainder, false);
    let mut path = security::resolve_path(base, &decoded, config).await?;

    let mut metadata = tokio::fs::metadata(&path).await.map_err(not_found_from_io)?;
    if metadata.is_dir() {
        path.push("index.html");
        metadata = tokio::fs::metadata(&path).await.map_err(not_found_from_io)?;
    }
    if !metadata.is_file() {
        return Err(WireError::new(codes::NOT_FOUND, "not a regular file"));
    }

    let size = metadata.len();
    let etag = ETag::from_metadata(&metadata);
    let last_modified = metadata.modified().ok();

    if not_modified(req, &etag, last_modified) {
        let mut resp = Response::new(304)
            .with_header("ETag", etag.header_value())
            .with_header("Accept-Ranges", "bytes");
        if let Some(mtime) = last_modified {
            resp = resp.with_header("Last-Modified", httpdate::fmt_http_date(mtime));
        }
        return Ok(resp);
    }

    let range = resolve_requested_range(req, &etag, size)?;

    let is_head = req.method == Method::Head;
    let mut headers = HeaderMap::new();
    headers.insert("ETag", etag.header_value());
    headers.insert("Accept-Ranges", "bytes");
    if let Some(mtime) = last_modified {
        headers.insert("Last-Modified", httpdate::fmt_http_date(mtime));
    }

    match range {
        Some(Err(unsatisfiable)) => {
            let mut resp = Response::new(416).with_header(
                "Content-Range",
                format!("bytes */{size}"),
            );
            resp.headers.insert("ETag", etag.header_value());
            let _ = unsatisfiable;
            return Ok(resp);
        }
        Some(Ok(r)) => {
            headers.insert("Content-Range", format!("bytes {}-{}/{size}", r.start, r.end));
            build_response(&path, r.start, r.len(), 206, headers, is_head, config).await
        }
        None => build_response(&path, 0, size, 200, headers, is_head, config).await,
    }
}

/// Whether the request's validators mean the cached response is still
/// good, per RFC 7232 §3.3: `If-None-Match` wins outright when present;
/// `If-Modified-Since` is only consulted when there's no `If-None-Match`.
fn not_modified(req: &Request, etag: &ETag, last_modified: Option<std::time::SystemTime>) -> bool {
    if let Some(inm) = req.headers.get("If-None-Match") {
        return etag::etags_match(inm, &etag.header_value());
    }
    let Some(ims) = req.headers.get("If-Modified-Since") else {
        return false;
    };
    let Some(mtime) = last_modified else {
        return false;
    };
    match httpdate::parse_http_date(ims) {
        Ok(since) => mtime <= since,
        Err(_) => false,
    }
}

/// `Ok(None)`: no (usable) Range header, serve the whole file.
/// `Ok(Some(Ok(range)))`: a single satisfiable range to serve.
/// `Ok(Some(Err(())))`: a Range header that could not be satisfied → 416.
fn resolve_requested_range(
    req: &Request,
    etag: &ETag,
    size: u64,
) -> Result<Option<Result<ResolvedRange, ()>>, WireError> {
    let Some(range_header) = req.headers.get("Range") else {
        return Ok(None);
    };
    if let Some(if_range) = req.headers.get("If-Range") {
        if !etag::etags_match(if_range, &etag.header_value()) {
            return Ok(None);
        }
    }
    match parse_range(range_header, size) {
        Some(ranges) => Ok(Some(Ok(ranges[0]))),
        None => Ok(Some(Err(()))),
    }
}

async fn build_response(
    path: &Path,
    start: u64,
    len: u64,
    status: u16,
    mut headers: HeaderMap,
    is_head: bool,
    config: &StaticFileConfig,
) -> Result<Response, WireError> {
    let mode = config.decide_transfer_mode(len);
    if is_head {
        headers.insert("Content-Length", len.to_string());
        let mut resp = Response::new(status);
        resp.headers = headers;
        return Ok(resp);
    }

    match mode {
        TransferMode::Buffered => {
            let bytes = read_range(path, start, len).await?;
            headers.insert("Content-Length", bytes.len().to_string());
            let mut resp = Response::new(status).with_body(bytes);
            resp.headers = headers;
            Ok(resp)
        }
        TransferMode::Chunked => {
            headers.insert("Transfer-Encoding", "chunked");
            let source = FileChunkSource::open(path, start, len, config.chunk_size).await?;
            let mut resp = Response::new(status).with_stream(source);
            resp.headers = headers;
            Ok(resp)
        }
        TransferMode::ZeroCopy => {
            // No portable sendfile primitive in tokio: approximate zero-copy
            // with the same block-streamed reads CHUNKED uses, but framed
            // with a Content-Length instead of chunked transfer-coding.
            headers.insert("Content-Length", len.to_string());
            let source =
                FileChunkSource::open(path, start, len, config.zero_copy_block as usize).await?;
            let mut resp = Response::new(status).with_stream(source);
            resp.headers = headers;
            Ok(resp)
        }
        TransferMode::Auto => unreachable!("decide_transfer_mode never returns Auto"),
    }
}

async fn read_range(path: &Path, start: u64, len: u64) -> Result<Vec<u8>, WireError> {
    use tokio::io::{AsyncReadExt, AsyncSeekExt};
    let mut file = tokio::fs::File::open(path).await.map_err(WireError::from)?;
    if start > 0 {
        file.seek(std::io::SeekFrom::Start(start))
            .await
            .map_err(WireError::from)?;
    }
    let mut buf = vec![0u8; len as usize];
    file.read_exact(&mut buf).await.map_err(WireError::from)?;
    Ok(buf)
}

fn not_found_from_io(err: std::io::Error) -> WireError {
    if err.kind() == std::io::ErrorKind::NotFound {
        WireError::new(codes::NOT_FOUND, "file not found")
    } else {
        WireError::from(err)
    }
}

struct FileMountHandler {
    prefix: String,
    directory: Arc<PathBuf>,
    config: Arc<StaticFileConfig>,
}

impl Handler for FileMountHandler {
    fn call(&self, req: Request) -> HandlerFuture {
        let directory = self.directory.clone();
        let config = self.config.clone();
        let prefix = self.prefix.clone();
        Box::pin(async move {
            let decoded = req.decoded_path();
            let remainder = decoded
                .strip_prefix(&prefix)
                .unwrap_or(&decoded)
                .trim_start_matches('/');
            match serve(&directory, remainder, &req, &config).await {
                Ok(resp) => Ok(resp),
                Err(e) if e.code() == codes::NOT_FOUND => Ok(Response::not_found()),
                Err(e) => Err(e),
            }
        })
    }
}

/// Build a handler that serves files out of `directory` for requests under
/// `prefix`, re-resolving and re-reading from disk on every call.
pub fn mount_handler(prefix: &str, directory: PathBuf, config: StaticFileConfig) -> impl Handler {
    FileMountHandler {
        prefix: prefix.trim_end_matches('/').to_string(),
        directory: Arc::new(directory),
        config: Arc::new(config),
    }
}

struct PreloadedHandler {
    bytes: Arc<Vec<u8>>,
}

impl Handler for PreloadedHandler {
    fn call(&self, req: Request) -> HandlerFuture {
        let bytes = self.bytes.clone();
        Box::pin(async move {
            if req.method == Method::Head {
                return Ok(Response::new(200)
                    .with_header("Content-Length", bytes.len().to_string()));
            }
            Ok(Response::new(200).with_body((*bytes).clone()))
        })
    }
}

/// Wrap already-loaded file bytes in a handler, used by
/// [`crate::router::Router::mount_preload`] for in-memory serving.
pub fn preloaded_handler(bytes: Vec<u8>) -> impl Handler {
    PreloadedHandler {
        bytes: Arc::new(bytes),
    }
}

/// Walk `directory` synchronously and return `(relative_path, contents)` for
/// every regular file that passes the deny-list / hidden-file checks,
/// stopping early once `config.max_cache_size` total bytes are collected.
pub fn preload_entries(
    directory: &Path,
    config: &StaticFileConfig,
) -> Result<Vec<(String, Vec<u8>)>, WireError> {
    let mut out = Vec::new();
    let mut total = 0u64;
    walk(directory, directory, config, &mut total, &mut out)?;
    Ok(out)
}

fn walk(
    base: &Path,
    dir: &Path,
    config: &StaticFileConfig,
    total: &mut u64,
    out: &mut Vec<(String, Vec<u8>)>,
) -> Result<(), WireError> {
    let entries = std::fs::read_dir(dir).map_err(WireError::from)?;
    for entry in entries {
        let entry = entry.map_err(WireError::from)?;
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if config.block_hidden_files && name.starts_with('.') {
            continue;
        }
        if config.deny_list.contains(name.as_ref()) {
            continue;
        }
        let file_type = entry.file_type().map_err(WireError::from)?;
        if file_type.is_dir() {
            walk(base, &path, config, total, out)?;
            continue;
        }
        if !file_type.is_file() {
            continue;
        }
        let bytes = std::fs::read(&path).map_err(WireError::from)?;
        *total += bytes.len() as u64;
        if *total > config.max_cache_size {
            break;
        }
        let rel = path
            .strip_prefix(base)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace(std::path::MAIN_SEPARATOR, "/");
        out.push((rel, bytes));
    }
    Ok(())
}
