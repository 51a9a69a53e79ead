use std::sync::Arc;

use async_trait::async_trait;
use bookmarks_store::{Favicon, Store, StoreError};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::blob_store::{check_id, check_payload, BlobStore};
use crate::error::BlobError;

/// Favicon blobs as rows of the `FAVICONS` table.
#[derive(Clone)]
pub struct DbBlobStore {
    store: Arc<Store>,
    max_size: usize,
}

impl DbBlobStore {
    pub fn new(store: Arc<Store>, max_size: usize) -> Self {
        Self { store, max_size }
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, BlobError>
    where
        T: Send + 'static,
        F: FnOnce(&Store) -> Result<T, BlobError> + Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| BlobError::Internal(e.to_string()))?
    }
}

#[async_trait]
impl BlobStore for DbBlobStore {
    async fn save(
        &self,
        id: &str,
        payload: &[u8],
        modified: DateTime<Utc>,
    ) -> Result<Favicon, BlobError> {
        check_id(id)?;
        check_payload(id, payload, self.max_size)?;

        let favicon = Favicon {
            id: id.to_string(),
            payload: payload.to_vec(),
            modified,
        };
        self.blocking(move |store| {
            store.in_unit_of_work(|repo| {
                match repo.get_favicon(&favicon.id) {
                    Ok(existing) if existing.payload == favicon.payload => {
                        debug!(id = %favicon.id, "Blob already stored");
                        return Ok(existing);
                    }
                    Ok(_) | Err(StoreError::NotFound) => {}
                    Err(e) => return Err(e.into()),
                }
                Ok(repo.save_favicon(&favicon)?)
            })
        })
        .await
    }

    async fn get(&self, id: &str) -> Result<Favicon, BlobError> {
        let id = id.to_string();
        self.blocking(move |store| {
            store.read(|repo| match repo.get_favicon(&id) {
                Ok(favicon) => Ok(favicon),
                Err(StoreError::NotFound) => Err(BlobError::NotFound(id.clone())),
                Err(e) => Err(e.into()),
            })
        })
        .await
    }

    async fn delete(&self, id: &str) -> Result<(), BlobError> {
        let id = id.to_string();
        self.blocking(move |store| {
            if store.with_repository(|repo| repo.delete_favicon(&id))? {
                debug!(id = %id, "Deleted blob");
                Ok(())
            } else {
                Err(BlobError::NotFound(id))
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob_store() -> DbBlobStore {
        DbBlobStore::new(Arc::new(Store::open_in_memory().unwrap()), 1024)
    }

    #[tokio::test]
    async fn save_get_delete() {
        let blobs = blob_store();
        blobs.save("a.ico", b"payload", Utc::now()).await.unwrap();
        assert_eq!(blobs.get("a.ico").await.unwrap().payload, b"payload");

        blobs.delete("a.ico").await.unwrap();
        assert!(matches!(blobs.get("a.ico").await, Err(BlobError::NotFound(_))));
        assert!(matches!(blobs.delete("a.ico").await, Err(BlobError::NotFound(_))));
    }

    #[tokio::test]
    async fn identical_save_keeps_first_timestamp() {
        let blobs = blob_store();
        let first = blobs.save("a.ico", b"same", Utc::now()).await.unwrap();
        let later = Utc::now() + chrono::Duration::seconds(60);
        let second = blobs.save("a.ico", b"same", later).await.unwrap();
        assert_eq!(first.modified, second.modified);
    }

    #[tokio::test]
    async fn limits_apply() {
        let blobs = blob_store();
        assert!(matches!(
            blobs.save("a.ico", &[1u8; 4096], Utc::now()).await,
            Err(BlobError::TooLarge { .. })
        ));
        assert!(matches!(
            blobs.save("", b"x", Utc::now()).await,
            Err(BlobError::InvalidId(_))
        ));
    }
}
