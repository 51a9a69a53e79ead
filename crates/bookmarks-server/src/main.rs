//! # bookmarks-server
//!
//! HTTP front end of the bookmark store.
//!
//! This binary provides:
//! - the **REST API** (axum) below `/api/v1` for bookmarks, folders, paths,
//!   favicons and file items
//! - **principal extraction** from the header set by the fronting
//!   authentication proxy
//! - background **favicon acquisition** into a disk or database blob store

mod api;
mod config;
mod error;

use std::sync::Arc;

use bookmarks_app::{Application, BlobStore, DbBlobStore, DiskBlobStore};
use bookmarks_favicon::FaviconFetcher;
use bookmarks_store::{Database, Store};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::{FaviconStorage, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,bookmarks_server=debug,bookmarks_app=debug")),
        )
        .init();

    info!("Starting bookmarks server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Open the database (runs pending migrations)
    // -----------------------------------------------------------------------
    let database = match &config.database_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    if let Some(path) = database.path() {
        info!(path = %path.display(), "Database opened");
    }
    let store = Arc::new(Store::new(database));

    // -----------------------------------------------------------------------
    // 4. Favicon storage and fetcher
    // -----------------------------------------------------------------------
    let blobs: Arc<dyn BlobStore> = match config.favicon_storage {
        FaviconStorage::Disk => Arc::new(
            DiskBlobStore::new(config.favicon_path.clone(), config.max_favicon_size).await?,
        ),
        FaviconStorage::Database => {
            info!("Favicons are stored in the database");
            Arc::new(DbBlobStore::new(store.clone(), config.max_favicon_size))
        }
    };
    let fetcher = Arc::new(FaviconFetcher::new(config.fetch_timeout)?);

    let app = Application::new(store, blobs, fetcher).with_build(config.build_number.clone());

    let http_addr = config.http_addr;
    let app_state = AppState {
        app,
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
