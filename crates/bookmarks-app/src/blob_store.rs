use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bookmarks_store::Favicon;
use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::BlobError;

/// Storage for favicon payloads, addressed by their content-addressed name.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Create the blob if absent, otherwise replace payload and timestamp.
    async fn save(&self, id: &str, payload: &[u8], modified: DateTime<Utc>)
        -> Result<Favicon, BlobError>;

    async fn get(&self, id: &str) -> Result<Favicon, BlobError>;

    async fn delete(&self, id: &str) -> Result<(), BlobError>;
}

/// Reject ids that could escape the storage directory.
pub(crate) fn check_id(id: &str) -> Result<(), BlobError> {
    let mut components = Path::new(id).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if id.is_empty() || !single_normal || id.contains('\\') || id.starts_with('.') {
        return Err(BlobError::InvalidId(id.to_string()));
    }
    Ok(())
}

pub(crate) fn check_payload(id: &str, payload: &[u8], max_size: usize) -> Result<(), BlobError> {
    if payload.is_empty() {
        return Err(BlobError::EmptyPayload(id.to_string()));
    }
    if payload.len() > max_size {
        return Err(BlobError::TooLarge {
            size: payload.len(),
            max: max_size,
        });
    }
    Ok(())
}

/// Favicon blobs as files in one directory, named by their id.
#[derive(Debug, Clone)]
pub struct DiskBlobStore {
    base_path: PathBuf,
    max_size: usize,
}

impl DiskBlobStore {
    /// Creates `base_path` if it is missing.
    pub async fn new(base_path: PathBuf, max_size: usize) -> Result<Self, BlobError> {
        fs::create_dir_all(&base_path).await?;

        info!(path = %base_path.display(), "Favicon directory initialized");

        Ok(Self {
            base_path,
            max_size,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn blob_path(&self, id: &str) -> Result<PathBuf, BlobError> {
        check_id(id)?;
        Ok(self.base_path.join(id))
    }

    async fn read(&self, id: &str, path: &Path) -> Result<Favicon, BlobError> {
        let payload = match fs::read(path).await {
            Ok(payload) => payload,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BlobError::NotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let modified = fs::metadata(path)
            .await?
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        Ok(Favicon {
            id: id.to_string(),
            payload,
            modified,
        })
    }
}

#[async_trait]
impl BlobStore for DiskBlobStore {
    async fn save(
        &self,
        id: &str,
        payload: &[u8],
        _modified: DateTime<Utc>,
    ) -> Result<Favicon, BlobError> {
        let path = self.blob_path(id)?;
        check_payload(id, payload, self.max_size)?;

        // content-addressed: an existing file with the same bytes is final
        if let Ok(existing) = self.read(id, &path).await {
            if existing.payload == payload {
                debug!(id = %id, "Blob already stored");
                return Ok(existing);
            }
        }

        // write aside, then rename so readers never see a partial file
        let tmp = self.base_path.join(format!(".{}.{}.tmp", id, Uuid::new_v4()));
        fs::write(&tmp, payload).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!(id = %id, size = payload.len(), "Stored blob");
        self.read(id, &path).await
    }

    async fn get(&self, id: &str) -> Result<Favicon, BlobError> {
        let path = self.blob_path(id)?;
        let favicon = self.read(id, &path).await?;
        debug!(id = %id, size = favicon.payload.len(), "Retrieved blob");
        Ok(favicon)
    }

    async fn delete(&self, id: &str) -> Result<(), BlobError> {
        let path = self.blob_path(id)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(id = %id, "Deleted blob");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::NotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
