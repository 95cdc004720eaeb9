//! SQLite-backed submission store.

use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

use super::{Counter, NewSubmission, Submission, SubmissionStore, schema};
use crate::error::PersistenceError;

const SELECT_COLUMNS: &str =
    "id, website_url, email, created_at, loves_count, clicks_count, favicon_image";

/// A [`SubmissionStore`] over one SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database file and its schema.
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                PersistenceError::Database(format!("failed to create database directory: {e}"))
            })?;
        }
        info!(path = %path.display(), "opening gallery database");

        let conn = Connection::open(path)
            .map_err(|e| PersistenceError::Database(format!("failed to open database: {e}")))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, PersistenceError> {
        schema::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, PersistenceError> {
        self.conn
            .lock()
            .map_err(|e| PersistenceError::Database(format!("database lock poisoned: {e}")))
    }

    fn fetch(conn: &Connection, id: i64) -> Result<Submission, PersistenceError> {
        conn.query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM favicon_submissions WHERE id = ?1"),
            params![id],
            read_submission,
        )
        .optional()?
        .ok_or(PersistenceError::NotFound { id })
    }

    /// Stores a submission with an explicit timestamp.
    fn insert_at(
        &self,
        submission: &NewSubmission,
        created_at: &str,
    ) -> Result<Submission, PersistenceError> {
        submission.validate()?;
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO favicon_submissions (website_url, email, created_at, favicon_image)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                submission.website_url.trim(),
                submission.email.trim(),
                created_at,
                submission.favicon_image,
            ],
        )
        .map_err(|e| PersistenceError::Database(format!("failed to insert submission: {e}")))?;

        let id = conn.last_insert_rowid();
        debug!(id, "submission stored");
        Self::fetch(&conn, id)
    }
}

fn read_submission(row: &Row<'_>) -> rusqlite::Result<Submission> {
    Ok(Submission {
        id: row.get(0)?,
        website_url: row.get(1)?,
        email: row.get(2)?,
        created_at: row.get(3)?,
        loves_count: row.get(4)?,
        clicks_count: row.get(5)?,
        favicon_image: row.get(6)?,
    })
}

impl SubmissionStore for SqliteStore {
    fn list(&self) -> Result<Vec<Submission>, PersistenceError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM favicon_submissions
                 ORDER BY created_at DESC, id DESC"
            ))
            .map_err(|e| PersistenceError::Database(format!("failed to prepare query: {e}")))?;

        let submissions = stmt
            .query_map([], read_submission)
            .map_err(|e| PersistenceError::Database(format!("failed to query submissions: {e}")))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PersistenceError::Database(format!("failed to read row: {e}")))?;

        Ok(submissions)
    }

    fn insert(&self, submission: &NewSubmission) -> Result<Submission, PersistenceError> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        self.insert_at(submission, &now)
    }

    fn increment(&self, id: i64, counter: Counter) -> Result<i64, PersistenceError> {
        let column = counter.column();
        let conn = self.lock()?;

        let value = conn
            .query_row(
                &format!(
                    "UPDATE favicon_submissions SET {column} = {column} + 1
                     WHERE id = ?1 RETURNING {column}"
                ),
                params![id],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .map_err(|e| PersistenceError::Database(format!("failed to update {column}: {e}")))?
            .ok_or(PersistenceError::NotFound { id })?;

        debug!(id, column, value, "counter incremented");
        Ok(value)
    }
}
