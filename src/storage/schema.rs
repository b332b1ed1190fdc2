//! Database schema definitions
//!
//! This module contains the SQL schema for the Sumi-Harvest page store.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per successfully scraped URL
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    domain TEXT NOT NULL,
    title TEXT,
    text TEXT NOT NULL,
    links TEXT NOT NULL,
    meta TEXT NOT NULL,
    scrape_meta TEXT NOT NULL,
    depth INTEGER NOT NULL,
    inserted_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pages_domain ON pages(domain);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
