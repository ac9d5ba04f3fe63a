//! SQL DDL for the catalog tables.
//!
//! Defines `hotels`, `annotations` (one row per annotation, with its optional
//! embedding), `counters` (named sequences), and `schema_meta`. All DDL uses
//! `IF NOT EXISTS` for idempotent initialization.

use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS hotels (
    id INTEGER PRIMARY KEY,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Embeddings are little-endian f32 bytes, NULL until enrolled
CREATE TABLE IF NOT EXISTS annotations (
    hotel_id INTEGER NOT NULL REFERENCES hotels(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    content TEXT NOT NULL,
    embedding BLOB,
    PRIMARY KEY (hotel_id, position)
);

CREATE TABLE IF NOT EXISTS counters (
    name TEXT PRIMARY KEY,
    sequence_value INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;
    Ok(())
}
