//! # bookmarks-favicon
//!
//! Discovers and downloads the favicon of a web page.
//!
//! The page's HTML is searched for `<link rel="icon">` /
//! `<link rel="shortcut icon">`; when that fails, `/favicon.ico` at the
//! site's origin is used. The [`IconSource`] trait is the seam the bookmark
//! service depends on so that tests can substitute a canned source.
//! PNG and JPEG icons are scaled to a common width before they are stored.

mod discover;
mod error;
mod fetcher;
mod resize;

pub use discover::{discover_icon_href, page_base, resolve_icon_url};
pub use error::FetchError;
pub use fetcher::{Content, FaviconFetcher, FetchKind, IconSource};
pub use resize::resize_to_width;
