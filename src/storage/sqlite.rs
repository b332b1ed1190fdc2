//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the PageStore trait.

use crate::crawler::ScrapeRecord;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{InsertOutcome, PageStore, StorageResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite page store
///
/// The connection sits behind a mutex; every operation is a single short
/// statement, so workers never hold it across a suspension point.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file; parent directories are created
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Total number of stored pages
    pub fn count_pages(&self) -> StorageResult<u64> {
        let count: i64 = self
            .lock()
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Stored page counts per domain, largest first
    pub fn count_by_domain(&self) -> StorageResult<Vec<(String, u64)>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT domain, COUNT(*) FROM pages GROUP BY domain ORDER BY COUNT(*) DESC, domain",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
        })?;

        let mut counts = Vec::new();
        for row in rows {
            counts.push(row?);
        }
        Ok(counts)
    }

    /// Loads a stored record back by URL
    pub fn load_record(&self, url: &str) -> StorageResult<Option<ScrapeRecord>> {
        let row = self
            .lock()
            .query_row(
                "SELECT url, domain, title, text, links, meta, scrape_meta FROM pages WHERE url = ?1",
                params![url],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((url, domain, title, text, links, meta, scrape_meta)) = row else {
            return Ok(None);
        };

        Ok(Some(ScrapeRecord {
            url,
            domain,
            title,
            text,
            links: serde_json::from_str(&links)?,
            meta: serde_json::from_str(&meta)?,
            scrape_meta: serde_json::from_str(&scrape_meta)?,
        }))
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PageStore for SqliteStore {
    fn exists(&self, url: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .lock()
            .query_row("SELECT 1 FROM pages WHERE url = ?1", params![url], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    fn insert(&self, record: &ScrapeRecord) -> StorageResult<InsertOutcome> {
        let links = serde_json::to_string(&record.links)?;
        let meta = serde_json::to_string(&record.meta)?;
        let scrape_meta = serde_json::to_string(&record.scrape_meta)?;

        let changed = self.lock().execute(
            "INSERT OR IGNORE INTO pages
                (url, domain, title, text, links, meta, scrape_meta, depth, inserted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.url,
                record.domain,
                record.title,
                record.text,
                links,
                meta,
                scrape_meta,
                record.scrape_meta.depth,
                Utc::now().to_rfc3339(),
            ],
        )?;

        Ok(if changed == 0 {
            InsertOutcome::Duplicate
        } else {
            InsertOutcome::Inserted
        })
    }
}
