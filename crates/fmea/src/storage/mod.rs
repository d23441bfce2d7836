//! Storage layer for fmea.
//!
//! This module provides `SQLite`-based persistent storage for failure mode
//! records. The table is append-only: there is no update or delete.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::record::{FailureModeRecord, NewFailureMode, Rating, Rpn};
use crate::validate::{validate, FormInput};

use schema::RECORD_COLUMNS;

/// How long a connection waits on a locked database before giving up.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// The operations request handlers and commands need from a record store.
pub trait RecordStore {
    /// Append a validated entry and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn insert(&self, entry: &NewFailureMode) -> Result<i64>;

    /// All records, highest RPN first, ties in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or a row is corrupt.
    fn list_all(&self) -> Result<Vec<FailureModeRecord>>;

    /// Validate raw input and, if valid, append it.
    ///
    /// Nothing is written when validation fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for rejected input, or a storage error.
    fn submit(&self, input: &FormInput) -> Result<i64> {
        let entry = validate(input)?;
        self.insert(&entry)
    }
}

/// Storage engine for failure mode records.
///
/// Wraps a single `SQLite` connection. Dropping it closes the connection.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist
    /// and brings the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_busy_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Like [`Storage::open`], with an explicit busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open_with_busy_timeout(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
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

        // Concurrent writers wait for the lock instead of failing outright
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        Ok(Self { path, conn })
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
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert a validated entry.
    ///
    /// The RPN is computed from the ratings here, never taken from the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert(&self, entry: &NewFailureMode) -> Result<i64> {
        let recorded_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        self.conn.execute(
            r"
            INSERT INTO failure_modes (step, failure_mode, cause, control, s, o, d, rpn, recorded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
            params![
                entry.step,
                entry.failure_mode,
                entry.cause,
                entry.control,
                entry.severity.get(),
                entry.occurrence.get(),
                entry.detection.get(),
                entry.rpn().get(),
                recorded_at,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        info!("Recorded failure mode {} with RPN {}", id, entry.rpn());
        Ok(id)
    }

    /// Get all records, highest RPN first, ties broken by ascending id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or a stored row
    /// violates the record invariants.
    pub fn list_all(&self) -> Result<Vec<FailureModeRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM failure_modes ORDER BY rpn DESC, id ASC"
        ))?;

        let rows = stmt
            .query_map([], Self::row_to_raw)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(RawRecord::into_record).collect()
    }

    /// Get a record by its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get(&self, id: i64) -> Result<Option<FailureModeRecord>> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM failure_modes WHERE id = ?1"),
                [id],
                Self::row_to_raw,
            )
            .optional()?;
        raw.map(RawRecord::into_record).transpose()
    }

    /// Count total records in storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM failure_modes", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let total_records = self.count()?;

        let (oldest, newest): (Option<String>, Option<String>) = self.conn.query_row(
            r"
            SELECT MIN(NULLIF(recorded_at, '')), MAX(NULLIF(recorded_at, ''))
            FROM failure_modes
            ",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_records,
            oldest_record: oldest.as_deref().and_then(parse_timestamp),
            newest_record: newest.as_deref().and_then(parse_timestamp),
            db_size_bytes,
        })
    }

    /// Read a row without interpreting it; conversion happens in `RawRecord`.
    fn row_to_raw(row: &rusqlite::Row) -> rusqlite::Result<RawRecord> {
        Ok(RawRecord {
            id: row.get(0)?,
            step: row.get(1)?,
            failure_mode: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            cause: row.get(3)?,
            control: row.get(4)?,
            severity: row.get(5)?,
            occurrence: row.get(6)?,
            detection: row.get(7)?,
            rpn: row.get(8)?,
            recorded_at: row.get(9)?,
        })
    }
}

impl RecordStore for Storage {
    fn insert(&self, entry: &NewFailureMode) -> Result<i64> {
        Storage::insert(self, entry)
    }

    fn list_all(&self) -> Result<Vec<FailureModeRecord>> {
        Storage::list_all(self)
    }
}

/// A row as stored, before the rating and RPN invariants are checked.
#[derive(Debug)]
struct RawRecord {
    id: i64,
    step: String,
    failure_mode: String,
    cause: String,
    control: String,
    severity: Option<i64>,
    occurrence: Option<i64>,
    detection: Option<i64>,
    rpn: Option<i64>,
    recorded_at: String,
}

impl RawRecord {
    fn into_record(self) -> Result<FailureModeRecord> {
        let id = self.id;
        let rating = |name: &str, value: Option<i64>| {
            value
                .and_then(Rating::new)
                .ok_or_else(|| Error::corrupt_record(id, format!("{name} rating {value:?} out of range")))
        };

        let severity = rating("severity", self.severity)?;
        let occurrence = rating("occurrence", self.occurrence)?;
        let detection = rating("detection", self.detection)?;
        let rpn = Rpn::from_ratings(severity, occurrence, detection);

        if self.rpn != Some(i64::from(rpn.get())) {
            return Err(Error::corrupt_record(
                id,
                format!("stored rpn {:?} is not {severity} x {occurrence} x {detection}", self.rpn),
            ));
        }

        Ok(FailureModeRecord {
            id,
            step: self.step,
            failure_mode: self.failure_mode,
            cause: self.cause,
            control: self.control,
            severity,
            occurrence,
            detection,
            rpn,
            recorded_at: parse_timestamp(&self.recorded_at),
        })
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StorageStats {
    /// Total number of records stored.
    pub total_records: i64,
    /// Timestamp of the oldest timestamped record.
    pub oldest_record: Option<DateTime<Utc>>,
    /// Timestamp of the newest record.
    pub newest_record: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

/// Handle to the database file, shared by all request handlers.
///
/// Holds no connection itself; each unit of work calls [`Database::connect`]
/// and drops the returned [`Storage`] when done.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
    busy_timeout: Duration,
}

impl Database {
    /// Create a handle for the database at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Set the busy timeout used by new connections.
    #[must_use]
    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    /// Path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the database file and schema if absent.
    ///
    /// Called once at startup so that the first request doesn't pay for it
    /// and misconfiguration surfaces before the server starts listening.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn initialize(&self) -> Result<StorageStats> {
        let storage = self.connect()?;
        let stats = storage.stats()?;
        info!(
            "Database ready at {} ({} records)",
            self.path.display(),
            stats.total_records
        );
        Ok(stats)
    }

    /// Open a connection for one unit of work.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn connect(&self) -> Result<Storage> {
        Storage::open_with_busy_timeout(&self.path, self.busy_timeout)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};

    use super::*;

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    fn entry(mode: &str, s: i64, o: i64, d: i64) -> NewFailureMode {
        NewFailureMode {
            step: "Assembly".to_string(),
            failure_mode: mode.to_string(),
            cause: "Operator error".to_string(),
            control: "Checklist".to_string(),
            severity: Rating::new(s).unwrap(),
            occurrence: Rating::new(o).unwrap(),
            detection: Rating::new(d).unwrap(),
        }
    }

    fn form(s: &str, o: &str, d: &str) -> FormInput {
        FormInput {
            step: "Assembly".to_string(),
            failure_mode: "Loose bolt".to_string(),
            cause: "Torque not applied".to_string(),
            control: "Torque audit".to_string(),
            severity: s.to_string(),
            occurrence: o.to_string(),
            detection: d.to_string(),
        }
    }

    #[test]
    fn test_open_in_memory() {
        assert!(Storage::open_in_memory().is_ok());
    }

    #[test]
    fn test_insert_and_get() {
        let storage = create_test_storage();
        let id = storage.insert(&entry("Cracked housing", 5, 4, 3)).unwrap();

        let record = storage.get(id).unwrap().unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.failure_mode, "Cracked housing");
        assert_eq!(record.step, "Assembly");
        assert_eq!(record.rpn.get(), 60);
        assert!(record.recorded_at.is_some());
    }

    #[test]
    fn test_ids_strictly_increase() {
        let storage = create_test_storage();
        let ids: Vec<i64> = (1..=5)
            .map(|i| storage.insert(&entry(&format!("Mode {i}"), i, 1, 1)).unwrap())
            .collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_get_nonexistent() {
        let storage = create_test_storage();
        assert!(storage.get(99999).unwrap().is_none());
    }

    #[test]
    fn test_list_all_orders_by_rpn_desc_then_id() {
        let storage = create_test_storage();
        let a = storage.insert(&entry("A", 2, 5, 1)).unwrap(); // 10
        let b = storage.insert(&entry("B", 10, 10, 10)).unwrap(); // 1000
        let c = storage.insert(&entry("C", 5, 2, 1)).unwrap(); // 10
        let d = storage.insert(&entry("D", 1, 1, 1)).unwrap(); // 1

        let ids: Vec<i64> = storage.list_all().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![b, a, c, d]);
    }

    #[test]
    fn test_list_all_empty() {
        let storage = create_test_storage();
        assert!(storage.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_count() {
        let storage = create_test_storage();
        assert_eq!(storage.count().unwrap(), 0);

        storage.insert(&entry("One", 1, 1, 1)).unwrap();
        storage.insert(&entry("Two", 2, 2, 2)).unwrap();

        assert_eq!(storage.count().unwrap(), 2);
    }

    #[test]
    fn test_submit_valid() {
        let storage = create_test_storage();
        let id = storage.submit(&form("10", "10", "10")).unwrap();
        assert_eq!(storage.get(id).unwrap().unwrap().rpn.get(), 1000);
    }

    #[test]
    fn test_submit_invalid_leaves_store_unchanged() {
        let storage = create_test_storage();
        storage.submit(&form("2", "2", "2")).unwrap();

        let err = storage.submit(&form("0", "5", "5")).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(storage.count().unwrap(), 1);
    }

    #[test]
    fn test_corrupt_rpn_detected() {
        let storage = create_test_storage();
        let id = storage.insert(&entry("Tampered", 2, 2, 2)).unwrap();
        storage
            .conn
            .execute("UPDATE failure_modes SET rpn = 9 WHERE id = ?1", [id])
            .unwrap();

        let err = storage.list_all().unwrap_err();
        assert!(matches!(err, Error::CorruptRecord { .. }));
    }

    #[test]
    fn test_legacy_rows_without_timestamp() {
        let storage = create_test_storage();
        storage
            .conn
            .execute(
                "INSERT INTO failure_modes (failure_mode, s, o, d, rpn) VALUES ('Old', 3, 3, 3, 27)",
                [],
            )
            .unwrap();

        let records = storage.list_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].failure_mode, "Old");
        assert_eq!(records[0].step, "");
        assert!(records[0].recorded_at.is_none());
    }

    #[test]
    fn test_stats_empty() {
        let storage = create_test_storage();
        let stats = storage.stats().unwrap();

        assert_eq!(stats.total_records, 0);
        assert!(stats.oldest_record.is_none());
        assert!(stats.newest_record.is_none());
        assert_eq!(stats.db_size_bytes, 0);
    }

    #[test]
    fn test_stats_with_data() {
        let storage = create_test_storage();
        storage.insert(&entry("First", 1, 1, 1)).unwrap();
        storage.insert(&entry("Second", 2, 2, 2)).unwrap();

        let stats = storage.stats().unwrap();
        assert_eq!(stats.total_records, 2);
        assert!(stats.oldest_record.is_some());
        assert!(stats.oldest_record <= stats.newest_record);
    }

    #[test]
    fn test_path() {
        let storage = create_test_storage();
        assert_eq!(storage.path().to_string_lossy(), ":memory:");
    }

    #[test]
    fn test_unicode_text() {
        let storage = create_test_storage();
        let id = storage.insert(&entry("Überhitzung 過熱", 4, 4, 4)).unwrap();
        let record = storage.get(id).unwrap().unwrap();
        assert_eq!(record.failure_mode, "Überhitzung 過熱");
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let temp = tempfile::tempdir().unwrap();
        let nested = temp.path().join("nested/deeper/fmea.db");

        let storage = Storage::open(&nested).unwrap();
        assert!(nested.exists());
        assert_eq!(storage.path(), nested);
    }

    #[test]
    fn test_ids_persist_across_reopen() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("fmea.db");

        let first = {
            let storage = Storage::open(&path).unwrap();
            storage.insert(&entry("Before restart", 3, 3, 3)).unwrap()
        };

        let storage = Storage::open(&path).unwrap();
        let second = storage.insert(&entry("After restart", 3, 3, 3)).unwrap();
        assert!(second > first);
        assert_eq!(storage.count().unwrap(), 2);
    }

    #[test]
    fn test_database_connect_per_unit_of_work() {
        let temp = tempfile::tempdir().unwrap();
        let db = Database::new(temp.path().join("fmea.db"));

        let stats = db.initialize().unwrap();
        assert_eq!(stats.total_records, 0);

        db.connect().unwrap().insert(&entry("One", 2, 3, 4)).unwrap();
        db.connect().unwrap().insert(&entry("Two", 4, 3, 2)).unwrap();

        let records = db.connect().unwrap().list_all().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].id < records[1].id);
    }

    #[test]
    fn test_concurrent_inserts_get_unique_ids() {
        let temp = tempfile::tempdir().unwrap();
        let db = Database::new(temp.path().join("fmea.db"));
        db.initialize().unwrap();

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let db = db.clone();
                std::thread::spawn(move || {
                    let storage = db.connect().unwrap();
                    (0..10)
                        .map(|i| storage.insert(&entry(&format!("T{t}-{i}"), 2, 2, 2)).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<i64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 80);
    }

    #[test]
    fn test_concurrent_first_open_of_fresh_database() {
        for round in 0..20 {
            let temp = tempfile::tempdir().unwrap();
            let path = temp.path().join(format!("fresh-{round}.db"));
            let barrier = Arc::new(Barrier::new(4));

            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let path = path.clone();
                    let barrier = Arc::clone(&barrier);
                    std::thread::spawn(move || {
                        barrier.wait();
                        let storage = Storage::open(&path)?;
                        storage.insert(&entry(&format!("T{t}"), 2, 2, 2))
                    })
                })
                .collect();

            for handle in handles {
                let result = handle.join().unwrap();
                assert!(result.is_ok(), "round {round}: {result:?}");
            }

            let storage = Storage::open(&path).unwrap();
            assert_eq!(storage.count().unwrap(), 4);
            assert_eq!(
                migrations::get_schema_version(&storage.conn).unwrap(),
                migrations::CURRENT_VERSION
            );
        }
    }

    #[test]
    fn test_stats_db_size() {
        let temp = tempfile::tempdir().unwrap();
        let storage = Storage::open(temp.path().join("size.db")).unwrap();
        storage.insert(&entry("Test", 1, 1, 1)).unwrap();

        assert!(storage.stats().unwrap().db_size_bytes > 0);
    }
}
