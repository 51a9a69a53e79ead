//! File metadata and payloads backing file items.
//!
//! `FILES` rows reference their payload in `FILEOBJECTS`; a bookmark's
//! `file_id` references `FILES` with `ON DELETE SET NULL`.

use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::error::{not_found, Result, StoreError};
use crate::models::{File, FileObject};
use crate::repository::Repository;

impl Repository<'_> {
    /// Store a file together with its payload.
    ///
    /// The metadata's `size` must match the payload length.
    pub fn save_file(&self, file: &File, object: &FileObject) -> Result<File> {
        if file.id.is_empty() || object.id.is_empty() {
            return Err(StoreError::InvalidInput("file id is empty".into()));
        }
        if object.payload.is_empty() {
            return Err(StoreError::InvalidInput(format!("file '{}' has no payload", file.name)));
        }
        if file.size != object.payload.len() as i64 {
            return Err(StoreError::InvalidInput(format!(
                "file '{}' declares {} bytes but has {}",
                file.name,
                file.size,
                object.payload.len()
            )));
        }

        let mut stored = file.clone();
        stored.file_object_id = Some(object.id.clone());

        self.atomically(|| {
            self.conn().execute(
                "INSERT INTO FILEOBJECTS (id, payload) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET payload = excluded.payload",
                params![object.id, object.payload],
            )?;
            self.conn().execute(
                "INSERT INTO FILES (id, name, mime_type, size, modified, file_object_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name, mime_type = excluded.mime_type, size = excluded.size,
                    modified = excluded.modified, file_object_id = excluded.file_object_id",
                params![
                    stored.id,
                    stored.name,
                    stored.mime_type,
                    stored.size,
                    stored.modified.to_rfc3339(),
                    stored.file_object_id,
                ],
            )?;
            Ok(())
        })?;

        tracing::debug!(id = %stored.id, name = %stored.name, size = stored.size, "saved file");
        Ok(stored)
    }

    pub fn get_file(&self, id: &str) -> Result<File> {
        self.conn()
            .query_row(
                "SELECT id, name, mime_type, size, modified, file_object_id FROM FILES WHERE id = ?1",
                params![id],
                row_to_file,
            )
            .map_err(not_found)
    }

    pub fn get_file_object(&self, id: &str) -> Result<FileObject> {
        self.conn()
            .query_row(
                "SELECT id, payload FROM FILEOBJECTS WHERE id = ?1",
                params![id],
                |row| {
                    Ok(FileObject {
                        id: row.get(0)?,
                        payload: row.get(1)?,
                    })
                },
            )
            .map_err(not_found)
    }

    /// Remove a file and its payload. Referring bookmarks keep existing with
    /// `file_id` cleared.
    pub fn delete_file(&self, id: &str) -> Result<()> {
        let file = self.get_file(id)?;
        self.atomically(|| {
            self.conn()
                .execute("DELETE FROM FILES WHERE id = ?1", params![file.id])?;
            if let Some(object_id) = &file.file_object_id {
                self.conn()
                    .execute("DELETE FROM FILEOBJECTS WHERE id = ?1", params![object_id])?;
            }
            Ok(())
        })
    }
}

fn row_to_file(row: &rusqlite::Row<'_>) -> rusqlite::Result<File> {
    let modified_str: String = row.get(4)?;
    let modified: DateTime<Utc> = DateTime::parse_from_rfc3339(&modified_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(File {
        id: row.get(0)?,
        name: row.get(1)?,
        mime_type: row.get(2)?,
        size: row.get(3)?,
        modified,
        file_object_id: row.get(5)?,
    })
}
