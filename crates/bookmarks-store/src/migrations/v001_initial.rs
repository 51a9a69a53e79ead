//! v001 -- Initial schema creation.
//!
//! Creates `BOOKMARKS`, `FAVICONS`, `FILEOBJECTS` and `FILES`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- File payloads (kept apart from the metadata so joins stay cheap)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS FILEOBJECTS (
    id      TEXT PRIMARY KEY NOT NULL,
    payload BLOB NOT NULL
);

-- ----------------------------------------------------------------
-- File metadata
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS FILES (
    id             TEXT PRIMARY KEY NOT NULL,
    name           TEXT NOT NULL,
    mime_type      TEXT NOT NULL,
    size           INTEGER NOT NULL DEFAULT 0,
    modified       TEXT NOT NULL,                 -- RFC-3339
    file_object_id TEXT,

    FOREIGN KEY (file_object_id) REFERENCES FILEOBJECTS(id)
        ON UPDATE CASCADE ON DELETE SET NULL
);

-- ----------------------------------------------------------------
-- Bookmarks
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS BOOKMARKS (
    id                   TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    path                 TEXT NOT NULL,               -- canonical path of the parent folder
    display_name         TEXT NOT NULL,
    url                  TEXT NOT NULL DEFAULT '',
    sort_order           INTEGER NOT NULL DEFAULT 0,
    type                 INTEGER NOT NULL DEFAULT 0,  -- 0 node, 1 folder, 2 file item
    user_name            TEXT NOT NULL,
    created              TEXT NOT NULL,
    modified             TEXT,
    child_count          INTEGER NOT NULL DEFAULT 0,
    highlight            INTEGER NOT NULL DEFAULT 0,
    favicon              TEXT NOT NULL DEFAULT '',
    invert_favicon_color INTEGER NOT NULL DEFAULT 0,
    file_id              TEXT,

    FOREIGN KEY (file_id) REFERENCES FILES(id)
        ON UPDATE CASCADE ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS IX_PATH       ON BOOKMARKS(path);
CREATE INDEX IF NOT EXISTS IX_USER       ON BOOKMARKS(user_name);
CREATE INDEX IF NOT EXISTS IX_PATH_USER  ON BOOKMARKS(path, user_name);
CREATE INDEX IF NOT EXISTS IX_SORT_ORDER ON BOOKMARKS(url, sort_order);

-- ----------------------------------------------------------------
-- Favicons (blob-table shape of the favicon store)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS FAVICONS (
    id       TEXT PRIMARY KEY NOT NULL,   -- content-addressed name
    payload  BLOB NOT NULL,
    modified TEXT NOT NULL
);
"#;

/// Apply the initial schema.
pub fn up(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(UP_SQL)
}
