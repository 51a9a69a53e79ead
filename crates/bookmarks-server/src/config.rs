//! Server configuration loaded from environment variables.
//!
//! All settings have defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use bookmarks_shared::constants::{DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_HTTP_PORT, MAX_FAVICON_SIZE};

/// Where favicon payloads are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaviconStorage {
    /// One file per favicon below `favicon_path`.
    Disk,
    /// Rows of the `FAVICONS` table in the bookmark database.
    Database,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: `None`, i.e. `bookmarks.db` in the platform data directory.
    pub database_path: Option<PathBuf>,

    /// Env: `FAVICON_STORAGE` (`disk` or `database`)
    /// Default: `disk`
    pub favicon_storage: FaviconStorage,

    /// Directory of the disk favicon store.
    /// Env: `FAVICON_PATH`
    /// Default: `./favicons`
    pub favicon_path: PathBuf,

    /// HTTP timeout of favicon requests.
    /// Env: `FAVICON_FETCH_TIMEOUT_SECS`
    pub fetch_timeout: Duration,

    /// Largest favicon payload accepted, in bytes.
    /// Env: `MAX_FAVICON_SIZE`
    pub max_favicon_size: usize,

    /// Build identifier reported by the appinfo endpoint.
    /// Env: `BUILD_NUMBER`
    pub build_number: String,

    /// Request header carrying the authenticated user name, set by the
    /// fronting proxy.
    /// Env: `USER_HEADER`
    /// Default: `x-forwarded-user`
    pub user_header: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: None,
            favicon_storage: FaviconStorage::Disk,
            favicon_path: PathBuf::from("./favicons"),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            max_favicon_size: MAX_FAVICON_SIZE,
            build_number: "dev".to_string(),
            user_header: "x-forwarded-user".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(path) = var("DATABASE_PATH").filter(|p| !p.is_empty()) {
            config.database_path = Some(PathBuf::from(path));
        }

        if let Some(storage) = var("FAVICON_STORAGE") {
            match storage.to_ascii_lowercase().as_str() {
                "disk" => config.favicon_storage = FaviconStorage::Disk,
                "database" | "db" => config.favicon_storage = FaviconStorage::Database,
                _ => tracing::warn!(value = %storage, "Invalid FAVICON_STORAGE, using disk"),
            }
        }

        if let Some(path) = var("FAVICON_PATH") {
            config.favicon_path = PathBuf::from(path);
        }

        if let Some(val) = var("FAVICON_FETCH_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.fetch_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %val, "Invalid FAVICON_FETCH_TIMEOUT_SECS, using default"),
            }
        }

        if let Some(val) = var("MAX_FAVICON_SIZE") {
            match val.parse::<usize>() {
                Ok(size) if size > 0 => config.max_favicon_size = size,
                _ => tracing::warn!(value = %val, "Invalid MAX_FAVICON_SIZE, using default"),
            }
        }

        if let Some(build) = var("BUILD_NUMBER").filter(|b| !b.is_empty()) {
            config.build_number = build;
        }

        if let Some(header) = var("USER_HEADER").filter(|h| !h.is_empty()) {
            config.user_header = header.to_ascii_lowercase();
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }
}
