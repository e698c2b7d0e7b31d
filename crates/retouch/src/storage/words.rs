//! Protected-word persistence.

use rusqlite::{params, ErrorCode, OptionalExtension};
use tracing::debug;

use super::Storage;
use crate::error::{Error, Result};
use crate::masking::validate_no_collisions;
use crate::words::{ProtectedWord, WordSource};

const WORD_COLUMNS: &str = "id, text, case_sensitive, whole_word_only";

/// Reject words that are blank or would themselves look like mask tokens.
fn validate(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::invalid_word("word must not be empty"));
    }
    if !validate_no_collisions(text) {
        return Err(Error::invalid_word(format!(
            "'{text}' contains a reserved placeholder"
        )));
    }
    Ok(())
}

fn map_duplicate(e: rusqlite::Error, text: &str) -> Error {
    match &e {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            Error::DuplicateWord {
                text: text.to_string(),
            }
        }
        _ => e.into(),
    }
}

impl Storage {
    /// Add a protected word. Returns it with its assigned ID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateWord`] if the same text with the same flags
    /// exists, [`Error::InvalidWord`] for blank or token-shaped text.
    pub fn add_word(&self, word: &ProtectedWord) -> Result<ProtectedWord> {
        validate(&word.text)?;

        let conn = self.conn();
        conn.execute(
            "INSERT INTO protected_words (text, case_sensitive, whole_word_only) VALUES (?1, ?2, ?3)",
            params![word.text, word.case_sensitive, word.whole_word_only],
        )
        .map_err(|e| map_duplicate(e, &word.text))?;

        let id = conn.last_insert_rowid();
        debug!(id, "Added protected word");
        Ok(ProtectedWord {
            id,
            ..word.clone()
        })
    }

    /// Replace the text and flags of the word with `word.id`.
    ///
    /// Returns `false` if no such word exists.
    ///
    /// # Errors
    ///
    /// Same as [`Storage::add_word`].
    pub fn update_word(&self, word: &ProtectedWord) -> Result<bool> {
        validate(&word.text)?;

        let affected = self
            .conn()
            .execute(
                "UPDATE protected_words SET text = ?1, case_sensitive = ?2, whole_word_only = ?3 WHERE id = ?4",
                params![word.text, word.case_sensitive, word.whole_word_only, word.id],
            )
            .map_err(|e| map_duplicate(e, &word.text))?;
        Ok(affected > 0)
    }

    /// Delete a protected word by ID.
    ///
    /// Returns `true` if a word was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_word(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM protected_words WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }

    /// Get a protected word by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_word(&self, id: i64) -> Result<Option<ProtectedWord>> {
        let sql = format!("SELECT {WORD_COLUMNS} FROM protected_words WHERE id = ?1");
        let word = self
            .conn()
            .query_row(&sql, [id], Self::row_to_word)
            .optional()?;
        Ok(word)
    }

    /// All protected words in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_words(&self) -> Result<Vec<ProtectedWord>> {
        let sql = format!("SELECT {WORD_COLUMNS} FROM protected_words ORDER BY id ASC");
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let words = stmt
            .query_map([], Self::row_to_word)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(words)
    }

    fn row_to_word(row: &rusqlite::Row) -> rusqlite::Result<ProtectedWord> {
        Ok(ProtectedWord {
            id: row.get(0)?,
            text: row.get(1)?,
            case_sensitive: row.get(2)?,
            whole_word_only: row.get(3)?,
        })
    }
}

impl WordSource for Storage {
    fn current_words(&self) -> Result<Vec<ProtectedWord>> {
        self.list_words()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    #[test]
    fn test_add_and_get() {
        let storage = storage();
        let added = storage
            .add_word(&ProtectedWord::new("Kubernetes").case_sensitive(true))
            .unwrap();

        assert!(added.id > 0);
        let fetched = storage.get_word(added.id).unwrap().unwrap();
        assert_eq!(fetched, added);
        assert!(fetched.case_sensitive);
        assert!(fetched.whole_word_only);
    }

    #[test]
    fn test_duplicate_rejected() {
        let storage = storage();
        storage.add_word(&ProtectedWord::new("API")).unwrap();

        let err = storage.add_word(&ProtectedWord::new("API")).unwrap_err();
        assert!(matches!(err, Error::DuplicateWord { .. }));
    }

    #[test]
    fn test_same_text_different_flags_allowed() {
        let storage = storage();
        storage.add_word(&ProtectedWord::new("go")).unwrap();
        storage
            .add_word(&ProtectedWord::new("go").case_sensitive(true))
            .unwrap();

        assert_eq!(storage.list_words().unwrap().len(), 2);
    }

    #[test]
    fn test_blank_and_token_shaped_words_rejected() {
        let storage = storage();
        assert!(matches!(
            storage.add_word(&ProtectedWord::new("   ")),
            Err(Error::InvalidWord { .. })
        ));
        assert!(matches!(
            storage.add_word(&ProtectedWord::new("__CWORD_3__")),
            Err(Error::InvalidWord { .. })
        ));
    }

    #[test]
    fn test_update_word() {
        let storage = storage();
        let mut word = storage.add_word(&ProtectedWord::new("rust")).unwrap();
        word.text = "Rust".to_string();
        word.whole_word_only = false;

        assert!(storage.update_word(&word).unwrap());
        let fetched = storage.get_word(word.id).unwrap().unwrap();
        assert_eq!(fetched.text, "Rust");
        assert!(!fetched.whole_word_only);
    }

    #[test]
    fn test_update_into_duplicate_rejected() {
        let storage = storage();
        storage.add_word(&ProtectedWord::new("alpha")).unwrap();
        let mut beta = storage.add_word(&ProtectedWord::new("beta")).unwrap();
        beta.text = "alpha".to_string();

        assert!(matches!(
            storage.update_word(&beta),
            Err(Error::DuplicateWord { .. })
        ));
    }

    #[test]
    fn test_update_missing_word() {
        let storage = storage();
        let mut word = ProtectedWord::new("ghost");
        word.id = 404;
        assert!(!storage.update_word(&word).unwrap());
    }

    #[test]
    fn test_delete_word() {
        let storage = storage();
        let word = storage.add_word(&ProtectedWord::new("temp")).unwrap();

        assert!(storage.delete_word(word.id).unwrap());
        assert!(!storage.delete_word(word.id).unwrap());
        assert!(storage.get_word(word.id).unwrap().is_none());
    }

    #[test]
    fn test_list_preserves_insertion_order() {
        let storage = storage();
        for text in ["zeta", "alpha", "mid"] {
            storage.add_word(&ProtectedWord::new(text)).unwrap();
        }

        let texts: Vec<String> = storage.list_words().unwrap().into_iter().map(|w| w.text).collect();
        assert_eq!(texts, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_word_source_snapshot() {
        let storage = storage();
        storage.add_word(&ProtectedWord::new("Retouch")).unwrap();

        let words = storage.current_words().unwrap();
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].text, "Retouch");
    }

    #[test]
    fn test_word_source_reports_query_failure() {
        let storage = storage();
        storage
            .conn()
            .execute_batch("DROP TABLE protected_words")
            .unwrap();

        assert!(matches!(
            storage.current_words(),
            Err(Error::DatabaseQuery(_))
        ));
    }
}
