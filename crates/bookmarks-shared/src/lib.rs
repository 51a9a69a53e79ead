//! # bookmarks-shared
//!
//! Types and helpers shared by every bookmarks crate: the path codec for the
//! `/`-delimited folder hierarchy, the domain error taxonomy, content
//! addressing for favicon payloads and the user/version metadata returned by
//! the AppInfo endpoint.

pub mod constants;
pub mod error;
pub mod hashing;
pub mod path;
pub mod types;

pub use error::{BookmarkError, Result};
