// Error types for store, configuration and I/O failures.
// Data-quality outcomes of an import are values (see parser::ImportIssue), not errors.

use thiserror::Error;

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Error, Debug)]
pub enum LedgerError {
    /// SQLite failure (wraps rusqlite::Error)
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Another profile already uses this id or name
    #[error("Já existe um streamer com este ID ou Nome: {streamer_id} / {name}")]
    DuplicateStreamer { streamer_id: String, name: String },

    /// A snapshot for this period type and label was already saved
    #[error("Já existe um snapshot para {0}")]
    DuplicateSnapshot(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl LedgerError {
    /// True for conflicts the caller can resolve by changing its input
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            LedgerError::DuplicateStreamer { .. } | LedgerError::DuplicateSnapshot(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_classification() {
        let dup = LedgerError::DuplicateSnapshot("Março 2025".to_string());
        assert!(dup.is_conflict());
        assert_eq!(dup.to_string(), "Já existe um snapshot para Março 2025");

        let missing = LedgerError::NotFound("streamer abc".to_string());
        assert!(!missing.is_conflict());
    }
}
