//! `SQLite` schema definitions for retouch.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// SQL statement to create the operation history table.
///
/// `protected_words` holds a JSON array of the original spellings that were
/// masked during the operation.
pub const CREATE_OPERATIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS operations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    kind TEXT NOT NULL,
    source_app TEXT,
    input_text TEXT NOT NULL,
    output_text TEXT NOT NULL,
    success INTEGER NOT NULL,
    replaced_directly INTEGER NOT NULL,
    protected_words TEXT NOT NULL DEFAULT '[]',
    latency_ms INTEGER NOT NULL,
    error TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create an index on timestamp for recency queries.
pub const CREATE_TIMESTAMP_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_operations_timestamp ON operations(timestamp DESC)
";

/// SQL statement to create an index on `kind` for filtering.
pub const CREATE_KIND_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_operations_kind ON operations(kind)
";

/// SQL statement to create the protected words table.
///
/// The same text may be stored with different flags, but not twice with
/// the same flags.
pub const CREATE_PROTECTED_WORDS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS protected_words (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT NOT NULL,
    case_sensitive INTEGER NOT NULL DEFAULT 0,
    whole_word_only INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (text, case_sensitive, whole_word_only)
)
";
