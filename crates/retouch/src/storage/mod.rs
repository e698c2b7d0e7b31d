//! Storage layer for retouch.
//!
//! This module provides `SQLite`-based persistent storage for the operation
//! history and the protected-word list.

pub mod migrations;
pub mod schema;
mod words;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::operation::{HistorySink, OperationKind, OperationRecord};

/// Columns selected for an operation row, in `row_to_record` order.
const OPERATION_COLUMNS: &str = "id, timestamp, kind, source_app, input_text, output_text, \
     success, replaced_directly, protected_words, latency_ms, error";

/// Limits applied to the history after each append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetentionPolicy {
    /// Keep at most this many records (0 = unlimited).
    pub max_records: usize,
    /// Drop records older than this.
    pub max_age: Option<Duration>,
}

impl RetentionPolicy {
    /// Build a policy from the storage configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_records: config.storage.max_records,
            max_age: config
                .max_age()
                .and_then(|age| Duration::from_std(age).ok()),
        }
    }
}

/// Storage engine for history and protected words.
///
/// The connection sits behind a mutex so one `Storage` can serve as both
/// the history sink and the word source of the operation pipeline.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
    /// Applied after each append.
    retention: RetentionPolicy,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
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
            retention: RetentionPolicy::default(),
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
            retention: RetentionPolicy::default(),
        })
    }

    /// Apply `retention` after every append.
    #[must_use]
    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert an operation record. Returns the assigned ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_operation(&self, record: &OperationRecord) -> Result<i64> {
        let protected_words = serde_json::to_string(&record.protected_words)?;
        let latency = i64::try_from(record.latency_ms).unwrap_or(i64::MAX);

        let conn = self.conn();
        conn.execute(
            r"
            INSERT INTO operations (
                timestamp, kind, source_app, input_text, output_text,
                success, replaced_directly, protected_words, latency_ms, error
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
            params![
                record.timestamp.to_rfc3339(),
                record.kind.as_str(),
                record.source_app,
                record.input_text,
                record.output_text,
                record.success,
                record.replaced_directly,
                protected_words,
                latency,
                record.error,
            ],
        )?;

        let id = conn.last_insert_rowid();
        debug!(id, kind = %record.kind, success = record.success, "Inserted operation");
        Ok(id)
    }

    /// Get an operation by its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_operation(&self, id: i64) -> Result<Option<OperationRecord>> {
        let sql = format!("SELECT {OPERATION_COLUMNS} FROM operations WHERE id = ?1");
        let result = self
            .conn()
            .query_row(&sql, [id], Self::row_to_record)
            .optional()?;
        Ok(result)
    }

    /// Get the most recent operations, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn recent_operations(&self, limit: usize) -> Result<Vec<OperationRecord>> {
        let sql = format!(
            "SELECT {OPERATION_COLUMNS} FROM operations ORDER BY timestamp DESC, id DESC LIMIT ?1"
        );
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = stmt
            .query_map([limit_i64], Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Get the most recent operations of one kind, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn operations_by_kind(
        &self,
        kind: OperationKind,
        limit: usize,
    ) -> Result<Vec<OperationRecord>> {
        let sql = format!(
            "SELECT {OPERATION_COLUMNS} FROM operations WHERE kind = ?1 \
             ORDER BY timestamp DESC, id DESC LIMIT ?2"
        );
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = stmt
            .query_map(params![kind.as_str(), limit_i64], Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Count stored operations.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count_operations(&self) -> Result<i64> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM operations", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Prune operations older than the given duration.
    ///
    /// Returns the number of records deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn prune_older_than(&self, max_age: Duration) -> Result<usize> {
        let cutoff = (Utc::now() - max_age).to_rfc3339();

        let affected = self
            .conn()
            .execute("DELETE FROM operations WHERE timestamp < ?1", [cutoff])?;

        if affected > 0 {
            info!("Pruned {} old operations", affected);
        }
        Ok(affected)
    }

    /// Prune operations to keep only the most recent N entries.
    ///
    /// Returns the number of records deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn prune_keep_recent(&self, keep_count: usize) -> Result<usize> {
        let keep_i64 = i64::try_from(keep_count).unwrap_or(i64::MAX);
        let affected = self.conn().execute(
            r"
            DELETE FROM operations WHERE id NOT IN (
                SELECT id FROM operations ORDER BY timestamp DESC, id DESC LIMIT ?1
            )
            ",
            [keep_i64],
        )?;

        if affected > 0 {
            info!("Pruned {} operations to keep {} recent", affected, keep_count);
        }
        Ok(affected)
    }

    /// Apply the retention policy. Returns the number of records deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn apply_retention(&self) -> Result<usize> {
        let mut deleted = 0;
        if let Some(max_age) = self.retention.max_age {
            deleted += self.prune_older_than(max_age)?;
        }
        if self.retention.max_records > 0 {
            deleted += self.prune_keep_recent(self.retention.max_records)?;
        }
        Ok(deleted)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let conn = self.conn();

        let (total, successful, corrections, translations, direct, avg_latency): (
            i64,
            Option<i64>,
            Option<i64>,
            Option<i64>,
            Option<i64>,
            Option<f64>,
        ) = conn.query_row(
            r"
            SELECT COUNT(*),
                   SUM(success),
                   SUM(kind = 'correction'),
                   SUM(kind = 'translation'),
                   SUM(replaced_directly),
                   AVG(latency_ms)
            FROM operations
            ",
            [],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            },
        )?;

        let bounds: (Option<String>, Option<String>) = conn.query_row(
            "SELECT MIN(timestamp), MAX(timestamp) FROM operations",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let protected_words: i64 =
            conn.query_row("SELECT COUNT(*) FROM protected_words", [], |row| row.get(0))?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_operations: total,
            successful_operations: successful.unwrap_or(0),
            corrections: corrections.unwrap_or(0),
            translations: translations.unwrap_or(0),
            direct_replacements: direct.unwrap_or(0),
            average_latency_ms: avg_latency,
            protected_words,
            oldest_operation: bounds.0.as_deref().and_then(parse_timestamp),
            newest_operation: bounds.1.as_deref().and_then(parse_timestamp),
            db_size_bytes,
        })
    }

    /// Convert a database row to an `OperationRecord`.
    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<OperationRecord> {
        let timestamp_str: String = row.get(1)?;
        let kind_str: String = row.get(2)?;
        let words_json: String = row.get(8)?;
        let latency: i64 = row.get(9)?;

        let kind = kind_str.parse().unwrap_or_else(|e| {
            warn!("{e}, defaulting to correction");
            OperationKind::Correction
        });

        let protected_words = serde_json::from_str(&words_json).unwrap_or_else(|e| {
            warn!(error = %e, "Invalid protected word list in history");
            Vec::new()
        });

        Ok(OperationRecord {
            id: Some(row.get(0)?),
            timestamp: parse_timestamp(&timestamp_str).unwrap_or_else(Utc::now),
            kind,
            source_app: row.get(3)?,
            input_text: row.get(4)?,
            output_text: row.get(5)?,
            success: row.get(6)?,
            replaced_directly: row.get(7)?,
            protected_words,
            latency_ms: u64::try_from(latency).unwrap_or(0),
            error: row.get(10)?,
        })
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

impl HistorySink for Storage {
    fn append(&self, record: &OperationRecord) {
        if let Err(e) = self.insert_operation(record) {
            warn!(error = %e, "Failed to record operation");
            return;
        }
        if let Err(e) = self.apply_retention() {
            warn!(error = %e, "Failed to apply history retention");
        }
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageStats {
    /// Total number of operations stored.
    pub total_operations: i64,
    /// Operations that delivered their result.
    pub successful_operations: i64,
    /// Number of corrections.
    pub corrections: i64,
    /// Number of translations.
    pub translations: i64,
    /// Operations written back through the focused element.
    pub direct_replacements: i64,
    /// Mean latency, if any operations are stored.
    pub average_latency_ms: Option<f64>,
    /// Number of protected words.
    pub protected_words: i64,
    /// Timestamp of the oldest operation.
    pub oldest_operation: Option<DateTime<Utc>>,
    /// Timestamp of the newest operation.
    pub newest_operation: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    fn create_test_record(kind: OperationKind, input: &str) -> OperationRecord {
        let mut record = OperationRecord::new(kind, Some("TextEdit".to_string()));
        record.input_text = input.to_string();
        record.output_text = input.to_uppercase();
        record.success = true;
        record
    }

    #[test]
    fn test_open_in_memory() {
        let storage = Storage::open_in_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_open_file_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("history.db");

        let storage = Storage::open(&path).unwrap();

        assert!(path.exists());
        assert_eq!(storage.path(), path.as_path());
    }

    #[test]
    fn test_insert_and_get() {
        let storage = create_test_storage();
        let mut record = create_test_record(OperationKind::Correction, "teh cat");
        record.replaced_directly = true;
        record.protected_words = vec!["Kubernetes".to_string()];
        record.latency_ms = 420;

        let id = storage.insert_operation(&record).unwrap();
        let retrieved = storage.get_operation(id).unwrap().unwrap();

        assert_eq!(retrieved.id, Some(id));
        assert_eq!(retrieved.kind, OperationKind::Correction);
        assert_eq!(retrieved.input_text, "teh cat");
        assert_eq!(retrieved.output_text, "TEH CAT");
        assert!(retrieved.success);
        assert!(retrieved.replaced_directly);
        assert_eq!(retrieved.protected_words, vec!["Kubernetes"]);
        assert_eq!(retrieved.latency_ms, 420);
        assert_eq!(retrieved.source_app.as_deref(), Some("TextEdit"));
        assert!(retrieved.error.is_none());
    }

    #[test]
    fn test_failed_record_keeps_error() {
        let storage = create_test_storage();
        let mut record = OperationRecord::new(OperationKind::Translation, None);
        record.error = Some("no text selected".to_string());

        let id = storage.insert_operation(&record).unwrap();
        let retrieved = storage.get_operation(id).unwrap().unwrap();

        assert!(!retrieved.success);
        assert!(retrieved.input_text.is_empty());
        assert_eq!(retrieved.error.as_deref(), Some("no text selected"));
    }

    #[test]
    fn test_get_nonexistent() {
        let storage = create_test_storage();
        assert!(storage.get_operation(99999).unwrap().is_none());
    }

    #[test]
    fn test_recent_operations_newest_first() {
        let storage = create_test_storage();
        for i in 0..5 {
            storage
                .insert_operation(&create_test_record(OperationKind::Correction, &format!("op {i}")))
                .unwrap();
        }

        let recent = storage.recent_operations(3).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].input_text, "op 4");
    }

    #[test]
    fn test_operations_by_kind() {
        let storage = create_test_storage();
        storage
            .insert_operation(&create_test_record(OperationKind::Correction, "a"))
            .unwrap();
        storage
            .insert_operation(&create_test_record(OperationKind::Translation, "b"))
            .unwrap();

        let translations = storage
            .operations_by_kind(OperationKind::Translation, 10)
            .unwrap();
        assert_eq!(translations.len(), 1);
        assert_eq!(translations[0].input_text, "b");
    }

    #[test]
    fn test_count() {
        let storage = create_test_storage();
        assert_eq!(storage.count_operations().unwrap(), 0);

        storage
            .insert_operation(&create_test_record(OperationKind::Correction, "One"))
            .unwrap();
        storage
            .insert_operation(&create_test_record(OperationKind::Correction, "Two"))
            .unwrap();

        assert_eq!(storage.count_operations().unwrap(), 2);
    }

    #[test]
    fn test_prune_keep_recent() {
        let storage = create_test_storage();
        for i in 0..10 {
            storage
                .insert_operation(&create_test_record(OperationKind::Correction, &format!("op {i}")))
                .unwrap();
        }

        assert_eq!(storage.prune_keep_recent(5).unwrap(), 5);
        assert_eq!(storage.count_operations().unwrap(), 5);
        assert_eq!(storage.recent_operations(1).unwrap()[0].input_text, "op 9");
    }

    #[test]
    fn test_prune_older_than() {
        let storage = create_test_storage();
        let mut old = create_test_record(OperationKind::Correction, "old");
        old.timestamp = Utc::now() - Duration::days(10);
        storage.insert_operation(&old).unwrap();
        storage
            .insert_operation(&create_test_record(OperationKind::Correction, "new"))
            .unwrap();

        assert_eq!(storage.prune_older_than(Duration::days(5)).unwrap(), 1);
        assert_eq!(storage.recent_operations(10).unwrap()[0].input_text, "new");
    }

    #[test]
    fn test_append_applies_retention() {
        let storage = create_test_storage().with_retention(RetentionPolicy {
            max_records: 2,
            max_age: None,
        });

        for i in 0..4 {
            storage.append(&create_test_record(OperationKind::Correction, &format!("op {i}")));
        }

        assert_eq!(storage.count_operations().unwrap(), 2);
    }

    #[test]
    fn test_retention_policy_from_config() {
        let policy = RetentionPolicy::from_config(&Config::default());
        assert_eq!(policy.max_records, 5_000);
        assert_eq!(policy.max_age, Some(Duration::days(90)));

        let mut config = Config::default();
        config.storage.max_age_days = 0;
        assert!(RetentionPolicy::from_config(&config).max_age.is_none());
    }

    #[test]
    fn test_stats_empty() {
        let storage = create_test_storage();
        let stats = storage.stats().unwrap();

        assert_eq!(stats.total_operations, 0);
        assert_eq!(stats.successful_operations, 0);
        assert!(stats.average_latency_ms.is_none());
        assert!(stats.oldest_operation.is_none());
        assert!(stats.newest_operation.is_none());
    }

    #[test]
    fn test_stats_with_data() {
        let storage = create_test_storage();
        let mut first = create_test_record(OperationKind::Correction, "First");
        first.latency_ms = 100;
        first.replaced_directly = true;
        let mut second = create_test_record(OperationKind::Translation, "Second");
        second.latency_ms = 300;
        second.success = false;
        storage.insert_operation(&first).unwrap();
        storage.insert_operation(&second).unwrap();

        let stats = storage.stats().unwrap();
        assert_eq!(stats.total_operations, 2);
        assert_eq!(stats.successful_operations, 1);
        assert_eq!(stats.corrections, 1);
        assert_eq!(stats.translations, 1);
        assert_eq!(stats.direct_replacements, 1);
        assert_eq!(stats.average_latency_ms, Some(200.0));
        assert!(stats.oldest_operation.is_some());
        assert!(stats.newest_operation.is_some());
    }

    #[test]
    fn test_path() {
        let storage = create_test_storage();
        assert_eq!(storage.path().to_string_lossy(), ":memory:");
    }
}
