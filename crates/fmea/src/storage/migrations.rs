//! Database migration system for fmea.
//!
//! This module handles database schema versioning and migrations. Version 1
//! is the bare failure mode table; version 2 adds the process step, cause,
//! control and timestamp columns.

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::info;

use crate::error::{Error, Result};

use super::schema::{CREATE_RPN_INDEX, SCHEMA_STATEMENTS, V2_ADD_COLUMNS};

/// The current schema version.
pub const CURRENT_VERSION: i32 = 2;

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

/// Initialize the database schema.
///
/// Creates all tables if they don't exist, then runs any pending migrations
/// to bring the schema up to the current version. Safe to call on every open,
/// including from several connections at once: the check and the migrations
/// run under one write lock, so later openers wait on the busy timeout and
/// then find the schema current.
///
/// # Errors
///
/// Returns an error if schema creation or migration fails.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    if is_current(conn) {
        return Ok(());
    }

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    for statement in SCHEMA_STATEMENTS {
        tx.execute(statement, [])?;
    }

    // Re-read under the lock; another connection may have migrated already
    let version = get_schema_version(&tx)?;
    if version >= CURRENT_VERSION {
        return Ok(());
    }

    run_migrations(&tx, version)?;
    tx.commit()?;
    info!(
        "Migrated database schema from version {} to {}",
        version, CURRENT_VERSION
    );
    Ok(())
}

/// Whether the schema is already up to date, without taking a write lock.
fn is_current(conn: &Connection) -> bool {
    // A missing metadata table reads as an error: not current
    matches!(get_schema_version(conn), Ok(version) if version >= CURRENT_VERSION)
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (fresh database or one written before
/// versioning existed).
pub(crate) fn get_schema_version(conn: &Connection) -> Result<i32> {
    let result: std::result::Result<String, rusqlite::Error> = conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        [VERSION_KEY],
        |row| row.get(0),
    );

    match result {
        Ok(value) => value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        }),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e.into()),
    }
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

/// Run migrations from the given version to the current version.
///
/// Runs inside the caller's transaction so a failure leaves the previous
/// version intact.
fn run_migrations(conn: &Connection, from_version: i32) -> Result<()> {
    let mut current = from_version;

    while current < CURRENT_VERSION {
        current += 1;
        run_migration(conn, current)?;
    }

    set_schema_version(conn, CURRENT_VERSION)
}

/// Run a specific migration version.
fn run_migration(conn: &Connection, version: i32) -> Result<()> {
    match version {
        1 => migrate_v1(conn),
        2 => migrate_v2(conn),
        _ => Err(Error::DatabaseMigration {
            message: format!("unknown migration version: {version}"),
        }),
    }
}

/// Migration to version 1 (initial schema).
///
/// No-op: version 1 is the base table created by `SCHEMA_STATEMENTS`.
fn migrate_v1(conn: &Connection) -> Result<()> {
    set_schema_version(conn, 1)?;
    Ok(())
}

/// Migration to version 2: step, cause, control and `recorded_at` columns.
///
/// Rows written under version 1 keep empty strings in the new columns.
fn migrate_v2(conn: &Connection) -> Result<()> {
    for statement in V2_ADD_COLUMNS {
        conn.execute(statement, [])?;
    }
    conn.execute(CREATE_RPN_INDEX, [])?;
    set_schema_version(conn, 2)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::CREATE_FAILURE_MODES_TABLE;

    fn create_test_db() -> Connection {
        Connection::open_in_memory().expect("failed to create in-memory database")
    }

    fn column_names(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT name FROM pragma_table_info('failure_modes')")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(std::result::Result::ok)
            .collect()
    }

    #[test]
    fn test_initialize_schema_creates_tables() {
        let conn = create_test_db();
        initialize_schema(&conn).expect("failed to initialize schema");

        for table in ["failure_modes", "metadata"] {
            let count: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {table}");
        }
    }

    #[test]
    fn test_initialize_schema_sets_version() {
        let conn = create_test_db();
        initialize_schema(&conn).expect("failed to initialize schema");

        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_initialize_schema_idempotent() {
        let conn = create_test_db();

        initialize_schema(&conn).expect("first init failed");
        initialize_schema(&conn).expect("second init failed");

        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_v2_columns_present() {
        let conn = create_test_db();
        initialize_schema(&conn).unwrap();

        let columns = column_names(&conn);
        for column in ["step", "cause", "control", "recorded_at", "rpn"] {
            assert!(columns.iter().any(|c| c == column), "missing {column}");
        }
    }

    #[test]
    fn test_upgrade_from_unversioned_v1_database() {
        let conn = create_test_db();
        conn.execute(CREATE_FAILURE_MODES_TABLE, []).unwrap();
        conn.execute(
            "INSERT INTO failure_modes (failure_mode, s, o, d, rpn) VALUES ('Leak', 2, 3, 4, 24)",
            [],
        )
        .unwrap();

        initialize_schema(&conn).unwrap();

        let (mode, step, rpn): (String, String, i64) = conn
            .query_row(
                "SELECT failure_mode, step, rpn FROM failure_modes",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(mode, "Leak");
        assert_eq!(step, "");
        assert_eq!(rpn, 24);
        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_concurrent_upgrade_of_v1_file_runs_once() {
        use std::sync::{Arc, Barrier};

        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("legacy.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute(CREATE_FAILURE_MODES_TABLE, []).unwrap();
            conn.execute(
                "INSERT INTO failure_modes (failure_mode, s, o, d, rpn) VALUES ('Leak', 2, 3, 4, 24)",
                [],
            )
            .unwrap();
        }

        let barrier = Arc::new(Barrier::new(4));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let path = path.clone();
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    let conn = Connection::open(&path).unwrap();
                    conn.busy_timeout(std::time::Duration::from_secs(5)).unwrap();
                    barrier.wait();
                    initialize_schema(&conn)
                })
            })
            .collect();

        for handle in handles {
            let result = handle.join().unwrap();
            assert!(result.is_ok(), "{result:?}");
        }

        let conn = Connection::open(&path).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_VERSION);
        let steps = column_names(&conn).iter().filter(|c| *c == "step").count();
        assert_eq!(steps, 1);
    }

    #[test]
    fn test_get_schema_version_fresh_db() {
        let conn = create_test_db();
        conn.execute(
            "CREATE TABLE metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )
        .unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), 0);
    }

    #[test]
    fn test_invalid_schema_version_value() {
        let conn = create_test_db();
        conn.execute(
            "CREATE TABLE metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO metadata (key, value) VALUES ('schema_version', 'two')",
            [],
        )
        .unwrap();

        let err = get_schema_version(&conn).unwrap_err();
        assert!(err.to_string().contains("invalid schema version"));
    }

    #[test]
    fn test_run_migration_unknown_version() {
        let conn = create_test_db();
        initialize_schema(&conn).unwrap();

        let err = run_migration(&conn, 999).unwrap_err();
        assert!(err.to_string().contains("unknown migration version"));
    }

    #[test]
    fn test_rpn_index_created() {
        let conn = create_test_db();
        initialize_schema(&conn).unwrap();

        let indexes: Vec<String> = conn
            .prepare(
                "SELECT name FROM sqlite_master WHERE type='index' AND tbl_name='failure_modes'",
            )
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(std::result::Result::ok)
            .collect();

        assert!(indexes.iter().any(|n| n.contains("rpn")));
    }
}
