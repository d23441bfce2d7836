//! `SQLite` schema definitions for fmea.
//!
//! The base statements create the first schema version of the
//! `failure_modes` table; later columns are added by migrations so that
//! databases written by the first version upgrade in place.

/// SQL statement to create the failure modes table (schema version 1).
pub const CREATE_FAILURE_MODES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS failure_modes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    failure_mode TEXT,
    s INTEGER,
    o INTEGER,
    d INTEGER,
    rpn INTEGER
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// Columns added in schema version 2.
pub const V2_ADD_COLUMNS: &[&str] = &[
    "ALTER TABLE failure_modes ADD COLUMN step TEXT NOT NULL DEFAULT ''",
    "ALTER TABLE failure_modes ADD COLUMN cause TEXT NOT NULL DEFAULT ''",
    "ALTER TABLE failure_modes ADD COLUMN control TEXT NOT NULL DEFAULT ''",
    "ALTER TABLE failure_modes ADD COLUMN recorded_at TEXT NOT NULL DEFAULT ''",
];

/// SQL statement to create an index on rpn for the dashboard ordering.
pub const CREATE_RPN_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_failure_modes_rpn ON failure_modes(rpn DESC, id ASC)
";

/// Column list used by every record query, in `row_to_raw` order.
pub const RECORD_COLUMNS: &str =
    "id, step, failure_mode, cause, control, s, o, d, rpn, recorded_at";

/// All base schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[CREATE_FAILURE_MODES_TABLE, CREATE_METADATA_TABLE];
