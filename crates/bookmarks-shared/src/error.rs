use thiserror::Error;

/// Domain-level error kinds surfaced to callers of the bookmark service.
///
/// Adapters translate these into transport-specific responses; the string
/// payload is a human readable detail that never contains SQL fragments.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookmarkError {
    /// Missing or malformed input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// No entity for the given (user, id) or (user, path).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Folder moved into itself, delete of a non-empty folder.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The parent path of a create/update does not exist.
    #[error("Hierarchy error: {0}")]
    Hierarchy(String),

    /// The underlying store reported an error.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Unexpected failure inside a side effect.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BookmarkError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Short, stable name of the kind. Used as the problem `title`.
    pub fn kind(&self) -> &'static str {
        match self {
            BookmarkError::Validation(_) => "Validation",
            BookmarkError::NotFound(_) => "NotFound",
            BookmarkError::Conflict(_) => "Conflict",
            BookmarkError::Hierarchy(_) => "Hierarchy",
            BookmarkError::Backend(_) => "Backend",
            BookmarkError::Internal(_) => "Internal",
        }
    }

    /// The detail text without the kind prefix.
    pub fn detail(&self) -> &str {
        match self {
            BookmarkError::Validation(m)
            | BookmarkError::NotFound(m)
            | BookmarkError::Conflict(m)
            | BookmarkError::Hierarchy(m)
            | BookmarkError::Backend(m)
            | BookmarkError::Internal(m) => m,
        }
    }
}

pub type Result<T> = std::result::Result<T, BookmarkError>;
