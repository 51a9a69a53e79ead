//! v002 -- Track how often a bookmark was opened.

use rusqlite::Connection;

const UP_SQL: &str = r#"
ALTER TABLE BOOKMARKS ADD COLUMN access_count INTEGER NOT NULL DEFAULT 0;

CREATE INDEX IF NOT EXISTS IX_ACCESS_COUNT ON BOOKMARKS(user_name, access_count);
"#;

pub fn up(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(UP_SQL)
}
