use bookmarks_shared::constants::ROOT_PATH;
use bookmarks_shared::path::{is_root, rebase, split_path, validate_name, validate_path};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::error::{not_found, Result, StoreError};
use crate::models::{Bookmark, NodeCount, NodeType};
use crate::repository::Repository;

const BOOKMARK_COLUMNS: &str = "id, user_name, path, display_name, type, url, sort_order, \
     child_count, access_count, highlight, favicon, invert_favicon_color, created, modified, file_id";

// Canonical folder paths of one user, the virtual root included exactly once.
const HIERARCHY_QUERY: &str = "SELECT '/' AS full_path
     UNION
     SELECT (CASE path WHEN '/' THEN '' ELSE path END) || '/' || display_name
     FROM BOOKMARKS
     WHERE type = ?1 AND user_name = ?2
     ORDER BY full_path";

impl Repository<'_> {
    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// All bookmarks of a user ordered by `(sort_order, display_name)`.
    pub fn get_all_bookmarks(&self, user: &str) -> Result<Vec<Bookmark>> {
        self.query_bookmarks(
            "WHERE user_name = ?1 ORDER BY sort_order, display_name",
            params![user],
        )
    }

    /// Bookmarks directly under `path`.
    pub fn get_bookmarks_by_path(&self, path: &str, user: &str) -> Result<Vec<Bookmark>> {
        self.query_bookmarks(
            "WHERE user_name = ?1 AND path = ?2 ORDER BY sort_order, display_name",
            params![user, path],
        )
    }

    /// Bookmarks at `prefix` or anywhere below it, folders first.
    ///
    /// `/A` matches rows under `/A` and `/A/B` but not under `/AB`.
    pub fn get_bookmarks_by_path_start(&self, prefix: &str, user: &str) -> Result<Vec<Bookmark>> {
        let below = format!("{}/", prefix.trim_end_matches('/'));
        self.query_bookmarks(
            "WHERE user_name = ?1 AND (path = ?2 OR substr(path, 1, ?3) = ?4)
             ORDER BY type DESC, sort_order, display_name",
            params![user, prefix, below.chars().count() as i64, below],
        )
    }

    /// Case-insensitive substring match on the display name.
    ///
    /// Folded in Rust; SQLite's `lower()` only knows ASCII.
    pub fn get_bookmarks_by_name(&self, name: &str, user: &str) -> Result<Vec<Bookmark>> {
        let needle = name.to_lowercase();
        Ok(self
            .get_all_bookmarks(user)?
            .into_iter()
            .filter(|b| b.display_name.to_lowercase().contains(&needle))
            .collect())
    }

    /// The `limit` most often opened nodes.
    pub fn get_most_recent_bookmarks(&self, limit: u32, user: &str) -> Result<Vec<Bookmark>> {
        self.query_bookmarks(
            "WHERE user_name = ?1 AND type = ?2 AND access_count > 0
             ORDER BY access_count DESC, display_name
             LIMIT ?3",
            params![user, NodeType::Node.as_i32(), limit],
        )
    }

    pub fn get_bookmark_by_id(&self, id: &str, user: &str) -> Result<Bookmark> {
        self.conn()
            .query_row(
                &format!("SELECT {BOOKMARK_COLUMNS} FROM BOOKMARKS WHERE id = ?1 AND user_name = ?2"),
                params![id, user],
                row_to_bookmark,
            )
            .map_err(not_found)
    }

    /// The folder whose canonical path is `path`.
    pub fn get_folder_by_path(&self, path: &str, user: &str) -> Result<Bookmark> {
        if path.is_empty() {
            return Err(StoreError::EmptyPath);
        }
        if is_root(path) {
            return Err(StoreError::RootPath);
        }
        let (parent, name) =
            split_path(path).ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;

        self.conn()
            .query_row(
                &format!(
                    "SELECT {BOOKMARK_COLUMNS} FROM BOOKMARKS
                     WHERE user_name = ?1 AND path = ?2 AND display_name = ?3 AND type = ?4
                     ORDER BY created
                     LIMIT 1"
                ),
                params![user, parent, name, NodeType::Folder.as_i32()],
                row_to_bookmark,
            )
            .map_err(not_found)
    }

    /// Number of direct children stored under exactly `path`.
    ///
    /// Returns at most one entry; an empty list means no children.
    pub fn get_path_child_count(&self, path: &str, user: &str) -> Result<Vec<NodeCount>> {
        if path.is_empty() {
            return Err(StoreError::EmptyPath);
        }

        let mut stmt = self.conn().prepare(
            "SELECT path, COUNT(id) FROM BOOKMARKS
             WHERE user_name = ?1 AND path = ?2
             GROUP BY path",
        )?;
        let rows = stmt.query_map(params![user, path], |row| {
            Ok(NodeCount {
                path: row.get(0)?,
                count: row.get(1)?,
            })
        })?;

        let mut counts = Vec::new();
        for row in rows {
            counts.push(row?);
        }
        Ok(counts)
    }

    /// Every canonical folder path of the user, starting with the root `/`.
    pub fn get_all_paths(&self, user: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn().prepare(HIERARCHY_QUERY)?;
        let rows = stmt.query_map(params![NodeType::Folder.as_i32(), user], |row| row.get(0))?;

        let mut paths = Vec::new();
        for row in rows {
            paths.push(row?);
        }
        Ok(paths)
    }

    /// How many bookmarks of any user still point at a favicon.
    pub fn num_bookmarks_referencing_favicon(&self, favicon: &str) -> Result<i64> {
        Ok(self.conn().query_row(
            "SELECT COUNT(id) FROM BOOKMARKS WHERE favicon = ?1",
            params![favicon],
            |row| row.get(0),
        )?)
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Persist a new bookmark below an existing parent.
    ///
    /// Assigns an id when none is given, stamps `created` and increments the
    /// parent folder's child count.
    pub fn create(&self, mut item: Bookmark) -> Result<Bookmark> {
        check_path(&item.path)?;
        validate_name(&item.display_name).map_err(StoreError::InvalidInput)?;
        if item.id.is_empty() {
            item.id = Uuid::new_v4().to_string();
        }
        item.created = Utc::now();
        item.modified = None;

        tracing::debug!(id = %item.id, path = %item.path, name = %item.display_name, "create bookmark");

        self.atomically(|| {
            self.ensure_hierarchy(&item.path, &item.user_name)?;
            self.insert_row(&item)?;
            self.adjust_child_count(&item.path, &item.user_name, 1)?;
            Ok(())
        })?;

        Ok(item)
    }

    /// Persist the mutable fields of an existing bookmark.
    ///
    /// `type`, `user_name` and `created` are kept from the stored row. When a
    /// folder is renamed or moved, every descendant is rebased onto the new
    /// canonical path, a folder of the same name already living at the target
    /// is merged into this one, and the child counts of the folder, the origin
    /// parent and the destination parent are recomputed.
    pub fn update(&self, item: Bookmark) -> Result<Bookmark> {
        check_path(&item.path)?;
        validate_name(&item.display_name).map_err(StoreError::InvalidInput)?;
        let existing = self.get_bookmark_by_id(&item.id, &item.user_name)?;

        tracing::debug!(id = %item.id, path = %item.path, name = %item.display_name, "update bookmark");

        self.atomically(|| {
            let user = existing.user_name.as_str();
            self.ensure_hierarchy(&item.path, user)?;
            self.update_row(&item)?;

            let renamed = existing.display_name != item.display_name;
            let moved = existing.path != item.path;

            if existing.is_folder() && (renamed || moved) {
                let old_path = existing.full_path();
                let new_path = item.full_path();

                let merged = self.merge_same_named_folders(&item, user)?;
                self.rewrite_subtree(&old_path, &new_path, user)?;
                if merged {
                    self.merge_nested_folders(&new_path, user)?;
                }
                self.recompute_child_count(&new_path, user)?;
            }

            if moved {
                self.recompute_child_count(&existing.path, user)?;
                self.recompute_child_count(&item.path, user)?;
            }
            Ok(())
        })?;

        self.get_bookmark_by_id(&item.id, &item.user_name)
    }

    /// Remove one bookmark and decrement its parent's child count.
    ///
    /// No emptiness check is made here; callers refuse non-empty folders.
    pub fn delete(&self, item: &Bookmark) -> Result<()> {
        let existing = self.get_bookmark_by_id(&item.id, &item.user_name)?;
        tracing::debug!(id = %existing.id, path = %existing.path, "delete bookmark");

        self.atomically(|| self.delete_row(&existing))
    }

    /// Remove the folder at canonical `path` together with everything below it.
    ///
    /// The parent folder's child count is recomputed afterwards.
    pub fn delete_path(&self, path: &str, user: &str) -> Result<()> {
        if path.is_empty() {
            return Err(StoreError::EmptyPath);
        }
        if is_root(path) {
            return Err(StoreError::RootPath);
        }
        check_path(path)?;

        self.atomically(|| {
            let folder = self.get_folder_by_path(path, user)?;

            let below = format!("{path}/");
            let removed = self.conn().execute(
                "DELETE FROM BOOKMARKS
                 WHERE user_name = ?1 AND (path = ?2 OR substr(path, 1, ?3) = ?4)",
                params![user, path, below.chars().count() as i64, below],
            )?;
            self.conn().execute(
                "DELETE FROM BOOKMARKS WHERE id = ?1 AND user_name = ?2",
                params![folder.id, user],
            )?;

            tracing::debug!(path = %path, removed = removed + 1, "deleted subtree");

            self.recompute_child_count(&folder.path, user)
        })
    }

    /// Patch only the favicon column of a bookmark.
    ///
    /// Returns `false` when the row no longer exists.
    pub fn set_favicon(&self, id: &str, user: &str, favicon: &str) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE BOOKMARKS SET favicon = ?1 WHERE id = ?2 AND user_name = ?3",
            params![favicon, id, user],
        )?;
        Ok(affected > 0)
    }

    // -----------------------------------------------------------------------
    // Hierarchy maintenance
    // -----------------------------------------------------------------------

    fn ensure_hierarchy(&self, path: &str, user: &str) -> Result<()> {
        if is_root(path) {
            return Ok(());
        }
        let hierarchy = self.get_all_paths(user)?;
        if hierarchy.iter().any(|p| p == path) {
            Ok(())
        } else {
            tracing::warn!(path = %path, user = %user, "parent path is not available");
            Err(StoreError::MissingHierarchy(path.to_string()))
        }
    }

    /// Add `delta` to the child count of the folder at canonical `path`.
    fn adjust_child_count(&self, path: &str, user: &str, delta: i32) -> Result<()> {
        if is_root(path) {
            return Ok(());
        }
        let folder = self
            .get_folder_by_path(path, user)
            .map_err(|e| match e {
                StoreError::NotFound => StoreError::MissingHierarchy(path.to_string()),
                other => other,
            })?;
        self.write_child_count(&folder.id, user, folder.child_count + delta)
    }

    /// Store the actual number of children under `path` on its folder row.
    fn recompute_child_count(&self, path: &str, user: &str) -> Result<()> {
        if is_root(path) {
            return Ok(());
        }
        let folder = match self.get_folder_by_path(path, user) {
            Ok(folder) => folder,
            Err(StoreError::NotFound) => {
                return Err(StoreError::MissingHierarchy(path.to_string()));
            }
            Err(e) => return Err(e),
        };
        let count = self
            .get_path_child_count(path, user)?
            .first()
            .map(|c| c.count)
            .unwrap_or(0);
        self.write_child_count(&folder.id, user, count as i32)
    }

    fn write_child_count(&self, id: &str, user: &str, count: i32) -> Result<()> {
        self.conn().execute(
            "UPDATE BOOKMARKS SET child_count = ?1, modified = ?2 WHERE id = ?3 AND user_name = ?4",
            params![count, Utc::now().to_rfc3339(), id, user],
        )?;
        Ok(())
    }

    /// Drop other folders that now share `folder`'s canonical path.
    ///
    /// Their children stay where they are and are adopted by `folder`.
    /// Returns `true` if anything was merged.
    fn merge_same_named_folders(&self, folder: &Bookmark, user: &str) -> Result<bool> {
        let duplicates: Vec<Bookmark> = self
            .get_bookmarks_by_path(&folder.path, user)?
            .into_iter()
            .filter(|b| b.is_folder() && b.display_name == folder.display_name && b.id != folder.id)
            .collect();

        for duplicate in &duplicates {
            tracing::info!(
                kept = %folder.id,
                removed = %duplicate.id,
                path = %folder.full_path(),
                "merging folders with the same name"
            );
            self.delete_row(duplicate)?;
        }
        Ok(!duplicates.is_empty())
    }

    /// Collapse same-named sibling folders below a merged folder at `path`.
    ///
    /// The oldest folder of each name is kept and the merge descends into it.
    fn merge_nested_folders(&self, path: &str, user: &str) -> Result<()> {
        let mut folders: Vec<Bookmark> = self
            .get_bookmarks_by_path(path, user)?
            .into_iter()
            .filter(Bookmark::is_folder)
            .collect();
        folders.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));

        let mut kept: Vec<Bookmark> = Vec::new();
        let mut merged: Vec<String> = Vec::new();
        for folder in folders {
            match kept.iter().find(|k| k.display_name == folder.display_name) {
                Some(keeper) => {
                    tracing::info!(
                        kept = %keeper.id,
                        removed = %folder.id,
                        path = %keeper.full_path(),
                        "merging nested folders with the same name"
                    );
                    self.delete_row(&folder)?;
                    merged.push(keeper.full_path());
                }
                None => kept.push(folder),
            }
        }
        merged.sort();
        merged.dedup();

        for sub in &merged {
            self.merge_nested_folders(sub, user)?;
            self.recompute_child_count(sub, user)?;
        }
        Ok(())
    }

    /// Rebase every row below `old_path` onto `new_path`.
    fn rewrite_subtree(&self, old_path: &str, new_path: &str, user: &str) -> Result<()> {
        let mut descendants = self.get_bookmarks_by_path_start(old_path, user)?;
        // parents before children
        descendants.sort_by(|a, b| a.path.cmp(&b.path));

        tracing::info!(from = %old_path, to = %new_path, rows = descendants.len(), "rewriting subtree");

        let now = Utc::now().to_rfc3339();
        for row in &descendants {
            let Some(rebased) = rebase(&row.path, old_path, new_path) else {
                continue;
            };
            self.conn().execute(
                "UPDATE BOOKMARKS SET path = ?1, modified = ?2 WHERE id = ?3 AND user_name = ?4",
                params![rebased, now, row.id, user],
            )?;
        }
        Ok(())
    }

    fn delete_row(&self, row: &Bookmark) -> Result<()> {
        self.conn().execute(
            "DELETE FROM BOOKMARKS WHERE id = ?1 AND user_name = ?2",
            params![row.id, row.user_name],
        )?;
        self.adjust_child_count(&row.path, &row.user_name, -1)
    }

    // -----------------------------------------------------------------------
    // Row mapping
    // -----------------------------------------------------------------------

    fn insert_row(&self, item: &Bookmark) -> Result<()> {
        self.conn().execute(
            &format!(
                "INSERT INTO BOOKMARKS ({BOOKMARK_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
            ),
            params![
                item.id,
                item.user_name,
                item.path,
                item.display_name,
                item.node_type.as_i32(),
                item.url,
                item.sort_order,
                item.child_count,
                item.access_count,
                item.highlight,
                item.favicon,
                item.invert_favicon_color,
                item.created.to_rfc3339(),
                item.modified.map(|m| m.to_rfc3339()),
                item.file_id,
            ],
        )?;
        Ok(())
    }

    fn update_row(&self, item: &Bookmark) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE BOOKMARKS SET
                modified = ?1, display_name = ?2, path = ?3, sort_order = ?4, url = ?5,
                favicon = ?6, highlight = ?7, child_count = ?8, invert_favicon_color = ?9,
                access_count = ?10, file_id = ?11
             WHERE id = ?12 AND user_name = ?13",
            params![
                Utc::now().to_rfc3339(),
                item.display_name,
                item.path,
                item.sort_order,
                item.url,
                item.favicon,
                item.highlight,
                item.child_count,
                item.invert_favicon_color,
                item.access_count,
                item.file_id,
                item.id,
                item.user_name,
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn query_bookmarks(
        &self,
        clause: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Bookmark>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("SELECT {BOOKMARK_COLUMNS} FROM BOOKMARKS {clause}"))?;
        let rows = stmt.query_map(params, row_to_bookmark)?;

        let mut bookmarks = Vec::new();
        for row in rows {
            bookmarks.push(row?);
        }
        Ok(bookmarks)
    }

    /// `true` if a bookmark with this id exists for the user.
    pub fn exists(&self, id: &str, user: &str) -> Result<bool> {
        Ok(self
            .conn()
            .query_row(
                "SELECT 1 FROM BOOKMARKS WHERE id = ?1 AND user_name = ?2",
                params![id, user],
                |_| Ok(()),
            )
            .optional()?
            .is_some())
    }
}

fn check_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(StoreError::EmptyPath);
    }
    validate_path(path).map_err(StoreError::InvalidPath)
}

fn parse_ts(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn row_to_bookmark(row: &rusqlite::Row<'_>) -> rusqlite::Result<Bookmark> {
    let type_int: i32 = row.get(4)?;
    let created_str: String = row.get(12)?;
    let modified_str: Option<String> = row.get(13)?;

    let node_type = NodeType::from_i32(type_int).ok_or_else(|| {
        rusqlite::Error::IntegralValueOutOfRange(4, i64::from(type_int))
    })?;

    Ok(Bookmark {
        id: row.get(0)?,
        user_name: row.get(1)?,
        path: row.get(2)?,
        display_name: row.get(3)?,
        node_type,
        url: row.get(5)?,
        sort_order: row.get(6)?,
        child_count: row.get(7)?,
        access_count: row.get(8)?,
        highlight: row.get(9)?,
        favicon: row.get(10)?,
        invert_favicon_color: row.get(11)?,
        created: parse_ts(12, &created_str)?,
        modified: modified_str.as_deref().map(|s| parse_ts(13, s)).transpose()?,
        file_id: row.get(14)?,
    })
}

/// The synthesized folder standing in for the virtual root of `user`.
pub fn virtual_root(user: &str) -> Bookmark {
    let mut root = Bookmark::new(
        user,
        ROOT_PATH,
        bookmarks_shared::constants::ROOT_DISPLAY_NAME,
        NodeType::Folder,
    );
    root.id = format!("{user}{}", bookmarks_shared::constants::ROOT_ID_SUFFIX);
    root
}
