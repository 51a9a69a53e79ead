use bookmarks_shared::BookmarkError;
use bookmarks_store::StoreError;
use thiserror::Error;

/// Errors of the favicon blob stores.
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Blob too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("Empty blob: {0}")]
    EmptyPayload(String),

    #[error("Invalid blob id: {0}")]
    InvalidId(String),

    #[error("Blob storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Blob table error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<BlobError> for BookmarkError {
    fn from(err: BlobError) -> Self {
        match err {
            BlobError::NotFound(_) => BookmarkError::NotFound(err.to_string()),
            BlobError::TooLarge { .. } | BlobError::EmptyPayload(_) | BlobError::InvalidId(_) => {
                BookmarkError::Validation(err.to_string())
            }
            BlobError::Store(store) => store.into(),
            BlobError::Io(_) => BookmarkError::Backend(err.to_string()),
            BlobError::Internal(_) => BookmarkError::Internal(err.to_string()),
        }
    }
}
