//! Storage layer for birdscribe.
//!
//! This module provides the `SQLite` implementation of the `uploads`,
//! `bird_descriptions` and `responses` tables, and the traits the workflow
//! uses to reach them regardless of backend.

pub mod migrations;
pub mod schema;
pub mod traits;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::records::{
    AnalysisResponse, BirdDescription, NewAnalysisResponse, NewBirdDescription, NewUpload,
    UploadRecord,
};

pub use traits::{AnnotationStore, UploadStore};

/// `SQLite` database holding the metadata tables.
///
/// The connection sits behind a mutex so the store can be shared between
/// tasks; no lock is held across an `.await`.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert an upload row.
    ///
    /// The returned record carries `created_at` at the stored microsecond
    /// precision, so it equals what later reads return.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_upload_row(&self, upload: &NewUpload) -> Result<UploadRecord> {
        let record = UploadRecord {
            id: Uuid::new_v4(),
            created_at: upload.created_at.trunc_subsecs(6),
            image_url: upload.image_url.clone(),
            file_name: upload.file_name.clone(),
        };

        self.conn.lock().execute(
            r"
            INSERT INTO uploads (id, created_at, image_url, file_name)
            VALUES (?1, ?2, ?3, ?4)
            ",
            params![
                record.id.to_string(),
                format_timestamp(record.created_at),
                record.image_url,
                record.file_name,
            ],
        )?;

        debug!("Inserted upload {}", record.id);
        Ok(record)
    }

    /// All uploads, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_upload_rows(&self) -> Result<Vec<UploadRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r"
            SELECT id, created_at, image_url, file_name
            FROM uploads ORDER BY created_at DESC, rowid DESC
            ",
        )?;

        let uploads = stmt
            .query_map([], Self::row_to_upload)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(uploads)
    }

    /// Get an upload by its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_upload_row(&self, id: Uuid) -> Result<Option<UploadRecord>> {
        let result = self
            .conn
            .lock()
            .query_row(
                r"
                SELECT id, created_at, image_url, file_name
                FROM uploads WHERE id = ?1
                ",
                [id.to_string()],
                Self::row_to_upload,
            )
            .optional()?;
        Ok(result)
    }

    /// Count rows in one of the known tables.
    fn count_rows(&self, table: &'static str) -> Result<u64> {
        let count: i64 = self.conn.lock().query_row(
            &format!("SELECT COUNT(*) FROM {table}"),
            [],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Insert description rows inside one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails; no rows are kept then.
    pub fn insert_description_rows(&self, rows: &[NewBirdDescription]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        for row in rows {
            tx.execute(
                r"
                INSERT INTO bird_descriptions (id, bird_name, description, created_at)
                VALUES (?1, ?2, ?3, ?4)
                ",
                params![
                    Uuid::new_v4().to_string(),
                    row.bird_name,
                    row.description,
                    format_timestamp(row.created_at),
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Insert response rows inside one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails; no rows are kept then.
    pub fn insert_response_rows(&self, rows: &[NewAnalysisResponse]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        for row in rows {
            tx.execute(
                "INSERT INTO responses (id, response, created_at) VALUES (?1, ?2, ?3)",
                params![
                    Uuid::new_v4().to_string(),
                    row.response,
                    format_timestamp(row.created_at),
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// One description row picked by `SQLite`'s `RANDOM()`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn random_description_row(&self) -> Result<Option<BirdDescription>> {
        let result = self
            .conn
            .lock()
            .query_row(
                r"
                SELECT id, bird_name, description, created_at
                FROM bird_descriptions ORDER BY RANDOM() LIMIT 1
                ",
                [],
                |row| {
                    Ok(BirdDescription {
                        id: parse_id(row, 0)?,
                        bird_name: row.get(1)?,
                        description: row.get(2)?,
                        created_at: parse_timestamp(row, 3)?,
                    })
                },
            )
            .optional()?;
        Ok(result)
    }

    /// One response row picked by `SQLite`'s `RANDOM()`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn random_response_row(&self) -> Result<Option<AnalysisResponse>> {
        let result = self
            .conn
            .lock()
            .query_row(
                "SELECT id, response, created_at FROM responses ORDER BY RANDOM() LIMIT 1",
                [],
                |row| {
                    Ok(AnalysisResponse {
                        id: parse_id(row, 0)?,
                        response: row.get(1)?,
                        created_at: parse_timestamp(row, 2)?,
                    })
                },
            )
            .optional()?;
        Ok(result)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let uploads = self.count_rows("uploads")?;
        let descriptions = self.count_rows("bird_descriptions")?;
        let responses = self.count_rows("responses")?;

        let newest: Option<String> = self
            .conn
            .lock()
            .query_row(
                "SELECT created_at FROM uploads ORDER BY created_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        let newest_upload = newest
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            uploads,
            descriptions,
            responses,
            newest_upload,
            db_size_bytes,
        })
    }

    fn row_to_upload(row: &rusqlite::Row) -> rusqlite::Result<UploadRecord> {
        Ok(UploadRecord {
            id: parse_id(row, 0)?,
            created_at: parse_timestamp(row, 1)?,
            image_url: row.get(2)?,
            file_name: row.get(3)?,
        })
    }
}

/// Fixed-width UTC timestamps so text ordering matches time ordering.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_id(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    Ok(DateTime::parse_from_rfc3339(&raw).map_or_else(
        |_| {
            warn!("Unparseable timestamp {raw:?}, using current time");
            Utc::now()
        },
        |dt| dt.with_timezone(&Utc),
    ))
}

#[async_trait]
impl UploadStore for Storage {
    async fn insert_upload(&self, upload: &NewUpload) -> Result<UploadRecord> {
        self.insert_upload_row(upload)
    }

    async fn list_uploads(&self) -> Result<Vec<UploadRecord>> {
        self.list_upload_rows()
    }

    async fn get_upload(&self, id: Uuid) -> Result<Option<UploadRecord>> {
        self.get_upload_row(id)
    }

    async fn count_uploads(&self) -> Result<u64> {
        self.count_rows("uploads")
    }
}

#[async_trait]
impl AnnotationStore for Storage {
    async fn count_descriptions(&self) -> Result<u64> {
        self.count_rows("bird_descriptions")
    }

    async fn insert_descriptions(&self, rows: &[NewBirdDescription]) -> Result<()> {
        self.insert_description_rows(rows)
    }

    async fn random_description(&self) -> Result<Option<BirdDescription>> {
        self.random_description_row()
    }

    async fn count_responses(&self) -> Result<u64> {
        self.count_rows("responses")
    }

    async fn insert_responses(&self, rows: &[NewAnalysisResponse]) -> Result<()> {
        self.insert_response_rows(rows)
    }

    async fn random_response(&self) -> Result<Option<AnalysisResponse>> {
        self.random_response_row()
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Rows in `uploads`.
    pub uploads: u64,
    /// Rows in `bird_descriptions`.
    pub descriptions: u64,
    /// Rows in `responses`.
    pub responses: u64,
    /// Timestamp of the newest upload.
    pub newest_upload: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
