//! Plain builder-style configuration types. Each `with_*` method returns
//! `Self` so configuration reads as a chain; cross-field invariants are
//! checked once in `build()`, not scattered across call sites.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::{codes, WireError};

/// Raised by `build()` when a configuration's fields are individually
/// well-formed but mutually inconsistent.
pub type ConfigError = WireError;

fn config_error(msg: impl Into<String>) -> ConfigError {
    WireError::new(codes::CONFIG_INVALID, msg)
}

/// How a static-file response is transferred to the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Auto,
    Buffered,
    Chunked,
    ZeroCopy,
}

/// Path segments and extensions that static-file serving refuses to expose
/// regardless of mount configuration, carried over from the original
/// engine's path-security defaults.
pub fn default_deny_list() -> HashSet<String> {
    [
        ".git", ".svn", ".hg", ".bzr", ".env", ".env.local", ".env.production", "config.json",
        "config.yml", "config.yaml", ".htaccess", ".htpasswd", "web.config", "nginx.conf",
        "apache.conf", "id_rsa", "id_dsa", "id_ecdsa", "id_ed25519", ".ssh", "authorized_keys",
        "known_hosts", ".db", ".sqlite", ".sqlite3", ".bak", ".backup", ".old", ".orig", ".swp",
        "~", ".vscode", ".idea", ".DS_Store",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[derive(Debug, Clone)]
pub struct StaticFileConfig {
    pub transfer_mode: TransferMode,
    pub small_file_threshold: u64,
    pub large_file_threshold: u64,
    pub chunk_size: usize,
    pub zero_copy_block: u64,
    pub enable_cache: bool,
    pub max_cache_size: u64,
    pub block_hidden_files: bool,
    pub deny_list: HashSet<String>,
}

impl Default for StaticFileConfig {
    fn default() -> Self {
        Self {
            transfer_mode: TransferMode::Auto,
            small_file_threshold: 64 * 1024,
            large_file_threshold: 1024 * 1024,
            chunk_size: 64 * 1024,
            zero_copy_block: 10 * 1024 * 1024,
            enable_cache: false,
            max_cache_size: 100 * 1024 * 1024,
            block_hidden_files: true,
            deny_list: default_deny_list(),
        }
    }
}

impl StaticFileConfig {
    pub fn with_transfer_mode(mut self, mode: TransferMode) -> Self {
        self.transfer_mode = mode;
        self
    }

    pub fn with_small_file_threshold(mut self, bytes: u64) -> Self {
        self.small_file_threshold = bytes;
        self
    }

    pub fn with_large_file_threshold(mut self, bytes: u64) -> Self {
        self.large_file_threshold = bytes;
        self
    }

    pub fn with_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes;
        self
    }

    pub fn with_enable_cache(mut self, enable: bool) -> Self {
        self.enable_cache = enable;
        self
    }

    pub fn with_max_cache_size(mut self, bytes: u64) -> Self {
        self.max_cache_size = bytes;
        self
    }

    pub fn with_block_hidden_files(mut self, block: bool) -> Self {
        self.block_hidden_files = block;
        self
    }

    pub fn deny(mut self, entry: impl Into<String>) -> Self {
        self.deny_list.insert(entry.into());
        self
    }

    /// Transfer mode actually used for a file of the given size, resolving
    /// `TransferMode::Auto` by threshold.
    pub fn decide_transfer_mode(&self, size: u64) -> TransferMode {
        match self.transfer_mode {
            TransferMode::Auto => {
                if size <= self.small_file_threshold {
                    TransferMode::Buffered
                } else if size <= self.large_file_threshold {
                    TransferMode::Chunked
                } else {
                    TransferMode::ZeroCopy
                }
            }
            explicit => explicit,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.small_file_threshold > self.large_file_threshold {
            return Err(config_error(
                "small_file_threshold must be <= large_file_threshold",
            ));
        }
        if self.chunk_size == 0 {
            return Err(config_error("chunk_size must be non-zero"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    pub cert_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,
    pub ca_path: Option<PathBuf>,
    pub verify_peer: bool,
    pub ciphers: Vec<String>,
}

impl TlsConfig {
    pub fn with_cert_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cert_path = Some(path.into());
        self
    }

    pub fn with_key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_path = Some(path.into());
        self
    }

    pub fn with_ca_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_path = Some(path.into());
        self
    }

    pub fn with_verify_peer(mut self, verify: bool) -> Self {
        self.verify_peer = verify;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cert_path.is_some() != self.key_path.is_some() {
            return Err(config_error(
                "TLS config needs both cert_path and key_path, or neither",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub backlog: u32,
    pub io_scheduler_count: usize,
    pub compute_scheduler_count: usize,
    pub max_header_size: usize,
    pub ring_buffer_size: usize,
    pub tls: Option<TlsConfig>,
    pub static_files: StaticFileConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            backlog: 128,
            io_scheduler_count: 0,
            compute_scheduler_count: 0,
            max_header_size: 8 * 1024,
            ring_buffer_size: 8 * 1024,
            tls: None,
            static_files: StaticFileConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_backlog(mut self, backlog: u32) -> Self {
        self.backlog = backlog;
        self
    }

    pub fn with_max_header_size(mut self, bytes: usize) -> Self {
        self.max_header_size = bytes;
        self
    }

    pub fn with_ring_buffer_size(mut self, bytes: usize) -> Self {
        self.ring_buffer_size = bytes;
        self
    }

    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn with_static_files(mut self, cfg: StaticFileConfig) -> Self {
        self.static_files = cfg;
        self
    }

    /// Validate cross-field invariants and return a ready-to-use config.
    /// Port 0 is rejected: it means "pick any ephemeral port", which this
    /// engine's fixed-listener model doesn't support.
    pub fn build(self) -> Result<Self, ConfigError> {
        if self.ring_buffer_size < self.max_header_size {
            return Err(config_error(
                "ring_buffer_size must be >= max_header_size",
            ));
        }
        if self.port == 0 {
            return Err(config_error("port must be non-zero"));
        }
        self.static_files.validate()?;
        if let Some(tls) = &self.tls {
            tls.validate()?;
        }
        Ok(self)
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub verify_peer: bool,
    pub verify_hostname: bool,
    pub sni_hostname: Option<String>,
    pub max_header_size: usize,
    pub ring_buffer_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            verify_peer: true,
            verify_hostname: true,
            sni_hostname: None,
            max_header_size: 8 * 1024,
            ring_buffer_size: 8 * 1024,
        }
    }
}

impl ClientConfig {
    pub fn with_verify_peer(mut self, verify: bool) -> Self {
        self.verify_peer = verify;
        self
    }

    pub fn with_verify_hostname(mut self, verify: bool) -> Self {
        self.verify_hostname = verify;
        self
    }

    pub fn with_sni_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.sni_hostname = Some(hostname.into());
        self
    }

    pub fn build(self) -> Result<Self, ConfigError> {
        if self.ring_buffer_size < self.max_header_size {
            return Err(config_error(
                "ring_buffer_size must be >= max_header_size",
            ));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_mode_picks_by_threshold() {
        let cfg = StaticFileConfig::default();
        assert_eq!(cfg.decide_transfer_mode(1024), TransferMode::Buffered);
        assert_eq!(cfg.decide_transfer_mode(500_000), TransferMode::Chunked);
        assert_eq!(cfg.decide_transfer_mode(5_000_000), TransferMode::ZeroCopy);
    }

    #[test]
    fn server_config_rejects_ring_smaller_than_header_limit() {
        let err = ServerConfig::default()
            .with_ring_buffer_size(100)
            .with_max_header_size(200)
            .build()
            .unwrap_err();
        assert_eq!(err.code(), codes::CONFIG_INVALID);
    }

    #[test]
    fn tls_config_requires_both_cert_and_key() {
        let tls = TlsConfig::default().with_cert_path("/tmp/cert.pem");
        assert!(tls.validate().is_err());
    }
}
