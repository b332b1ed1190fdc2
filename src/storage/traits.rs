//! Storage traits and error types
//!
//! This module defines the trait interface for page stores and associated
//! error types.

use crate::crawler::ScrapeRecord;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Outcome of an idempotent insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A record for this URL already existed; nothing was written
    Duplicate,
}

/// Page-keyed persistent store
///
/// The store is the source of truth for cross-run dedup: a URL it reports as
/// existing is never fetched again. Implementations must be safe to share
/// between workers.
pub trait PageStore: Send + Sync {
    /// Checks whether a record for `url` has been persisted
    fn exists(&self, url: &str) -> StorageResult<bool>;

    /// Persists a record, ignoring it if the URL is already stored
    fn insert(&self, record: &ScrapeRecord) -> StorageResult<InsertOutcome>;
}
