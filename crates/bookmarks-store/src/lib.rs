//! # bookmarks-store
//!
//! SQLite persistence for the hierarchical bookmark store.
//!
//! A [`Store`] owns one write connection and a pool of read connections. It
//! hands out a [`Repository`] for reads, in auto-commit mode, or inside a
//! unit-of-work (one transaction per call).
//! The repository maintains the folder hierarchy: parent paths must exist
//! before rows are written below them and every folder's `child_count`
//! reflects its direct children after each write.

pub mod bookmarks;
pub mod database;
pub mod favicons;
pub mod files;
pub mod guard;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod repository;
pub mod store;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use guard::WriteGuard;
pub use models::*;
pub use pool::ReadPool;
pub use repository::Repository;
pub use store::Store;
