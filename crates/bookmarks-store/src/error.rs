use bookmarks_shared::BookmarkError;
use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A query expected exactly one row but found none.
    #[error("Record not found")]
    NotFound,

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Chrono parsing error.
    #[error("Timestamp parse error: {0}")]
    ChronoParse(#[from] chrono::ParseError),

    #[error("Path is empty")]
    EmptyPath,

    #[error("The root path '/' cannot be addressed")]
    RootPath,

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// The parent path of a write does not exist for the user.
    #[error("Missing path hierarchy '{0}'")]
    MissingHierarchy(String),

    /// A unit-of-work was requested while one is already active.
    #[error("A transaction is already active")]
    TransactionActive,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for BookmarkError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => BookmarkError::NotFound(err.to_string()),
            StoreError::MissingHierarchy(_) => BookmarkError::Hierarchy(err.to_string()),
            StoreError::EmptyPath
            | StoreError::RootPath
            | StoreError::InvalidPath(_)
            | StoreError::InvalidInput(_) => BookmarkError::Validation(err.to_string()),
            other => BookmarkError::Backend(other.to_string()),
        }
    }
}

/// Map `QueryReturnedNoRows` onto [`StoreError::NotFound`].
pub(crate) fn not_found(e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Sqlite(other),
    }
}
