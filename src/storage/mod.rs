//! Storage module for persisting scraped pages
//!
//! This module handles the page store used for cross-run dedup:
//! - SQLite database initialization and schema management
//! - Idempotent, URL-keyed page inserts
//! - Per-domain statistics queries

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{InsertOutcome, PageStore, StorageError, StorageResult};

use std::path::Path;

/// Initializes or opens a page store database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
pub fn open_storage(path: &Path) -> StorageResult<SqliteStore> {
    SqliteStore::new(path)
}
