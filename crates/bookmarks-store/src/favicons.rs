use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::error::{not_found, Result, StoreError};
use crate::models::Favicon;
use crate::repository::Repository;

impl Repository<'_> {
    /// Create the favicon row, or replace payload and timestamp if it exists.
    pub fn save_favicon(&self, favicon: &Favicon) -> Result<Favicon> {
        if favicon.id.is_empty() {
            return Err(StoreError::InvalidInput("favicon id is empty".into()));
        }
        if favicon.payload.is_empty() {
            return Err(StoreError::InvalidInput(format!(
                "favicon '{}' has no payload",
                favicon.id
            )));
        }

        self.conn().execute(
            "INSERT INTO FAVICONS (id, payload, modified) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET payload = excluded.payload, modified = excluded.modified",
            params![favicon.id, favicon.payload, favicon.modified.to_rfc3339()],
        )?;

        tracing::debug!(id = %favicon.id, size = favicon.payload.len(), "saved favicon");
        Ok(favicon.clone())
    }

    pub fn get_favicon(&self, id: &str) -> Result<Favicon> {
        self.conn()
            .query_row(
                "SELECT id, payload, modified FROM FAVICONS WHERE id = ?1",
                params![id],
                row_to_favicon,
            )
            .map_err(not_found)
    }

    /// Returns `false` when nothing was stored under `id`.
    pub fn delete_favicon(&self, id: &str) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM FAVICONS WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }
}

fn row_to_favicon(row: &rusqlite::Row<'_>) -> rusqlite::Result<Favicon> {
    let modified_str: String = row.get(2)?;
    let modified: DateTime<Utc> = DateTime::parse_from_rfc3339(&modified_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Favicon {
        id: row.get(0)?,
        payload: row.get(1)?,
        modified,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    fn favicon(id: &str, payload: &[u8]) -> Favicon {
        Favicon {
            id: id.into(),
            payload: payload.to_vec(),
            modified: Utc::now(),
        }
    }

    #[test]
    fn save_get_update_delete() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_repository(|repo| -> Result<()> {
                repo.save_favicon(&favicon("a.ico", b"one"))?;
                assert_eq!(repo.get_favicon("a.ico")?.payload, b"one");

                repo.save_favicon(&favicon("a.ico", b"two"))?;
                assert_eq!(repo.get_favicon("a.ico")?.payload, b"two");

                assert!(repo.delete_favicon("a.ico")?);
                assert!(!repo.delete_favicon("a.ico")?);
                assert!(matches!(repo.get_favicon("a.ico"), Err(StoreError::NotFound)));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn rejects_empty_id_or_payload() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_repository(|repo| -> Result<()> {
                assert!(matches!(
                    repo.save_favicon(&favicon("", b"x")),
                    Err(StoreError::InvalidInput(_))
                ));
                assert!(matches!(
                    repo.save_favicon(&favicon("a.ico", b"")),
                    Err(StoreError::InvalidInput(_))
                ));
                Ok(())
            })
            .unwrap();
    }
}
