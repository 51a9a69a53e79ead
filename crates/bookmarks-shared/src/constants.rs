/// Path of the virtual root folder. It never has a row of its own.
pub const ROOT_PATH: &str = "/";

/// Separator between path segments.
pub const PATH_SEPARATOR: char = '/';

/// Display name of the synthesized root folder.
pub const ROOT_DISPLAY_NAME: &str = "Root";

/// Suffix appended to the user name to form the id of the virtual root.
pub const ROOT_ID_SUFFIX: &str = "_ROOT";

/// Application name reported by the metadata endpoint
pub const APP_NAME: &str = "bookmarks";

/// Name the favicon fetcher falls back to when nothing better is known.
pub const DEFAULT_FAVICON_FILE: &str = "favicon.ico";

/// Name reported for the built-in favicons.
pub const DEFAULT_FAVICON_NAME: &str = "default_bookmark_favicon.svg";

/// Modification time reported for the built-in favicons (RFC 3339).
pub const DEFAULT_FAVICON_MODIFIED: &str = "2022-12-31T00:00:00Z";

/// Built-in icon for link bookmarks.
pub const DEFAULT_NODE_ICON: &[u8] = br##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24"><path fill="#5f6368" d="M17 3H7c-1.1 0-2 .9-2 2v16l7-3 7 3V5c0-1.1-.9-2-2-2z"/></svg>"##;

/// Built-in icon for folders.
pub const DEFAULT_FOLDER_ICON: &[u8] = br##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24"><path fill="#f4b400" d="M10 4H4c-1.1 0-2 .9-2 2v12c0 1.1.9 2 2 2h16c1.1 0 2-.9 2-2V8c0-1.1-.9-2-2-2h-8l-2-2z"/></svg>"##;

/// Built-in icon for file items.
pub const DEFAULT_FILE_ICON: &[u8] = br##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24"><path fill="#4285f4" d="M14 2H6c-1.1 0-2 .9-2 2v16c0 1.1.9 2 2 2h12c1.1 0 2-.9 2-2V8l-6-6zm-1 7V3.5L18.5 9H13z"/></svg>"##;

/// Width acquired favicons are scaled to; the height keeps the aspect ratio.
pub const FAVICON_WIDTH: u32 = 50;

/// Upper bound for a single favicon payload (1 MiB).
pub const MAX_FAVICON_SIZE: usize = 1024 * 1024;

/// Default HTTP API port
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default timeout of outgoing favicon requests, in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
