//! Gallery table layout.

use rusqlite::Connection;

use crate::error::PersistenceError;

pub(super) fn initialize_schema(conn: &Connection) -> Result<(), PersistenceError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS favicon_submissions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            website_url TEXT NOT NULL,
            email TEXT NOT NULL,
            created_at TEXT NOT NULL,
            loves_count INTEGER NOT NULL DEFAULT 0,
            clicks_count INTEGER NOT NULL DEFAULT 0,
            favicon_image TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_submissions_created_at
            ON favicon_submissions(created_at DESC);",
    )
    .map_err(|e| PersistenceError::Database(format!("failed to create gallery schema: {e}")))
}
