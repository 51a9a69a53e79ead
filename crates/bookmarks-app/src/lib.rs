//! # bookmarks-app
//!
//! The bookmark use cases on top of `bookmarks-store`.
//!
//! [`Application`] validates input, runs each write in one unit-of-work and
//! kicks off favicon acquisition as detached background tasks. Favicon
//! payloads live in a [`BlobStore`], either files in a directory
//! ([`DiskBlobStore`]) or rows in the `FAVICONS` table ([`DbBlobStore`]).

pub mod blob_store;
pub mod bookmarks;
pub mod db_blob_store;
pub mod error;
pub mod favicons;
pub mod models;

pub use blob_store::{BlobStore, DiskBlobStore};
pub use bookmarks::Application;
pub use db_blob_store::DbBlobStore;
pub use error::BlobError;
pub use models::*;
