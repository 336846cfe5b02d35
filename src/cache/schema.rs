//! Database schema for the response cache

/// SQL schema for a cache partition
pub const SCHEMA_SQL: &str = r#"
-- One row per cached request (method + URL)
CREATE TABLE IF NOT EXISTS responses (
    cache_key TEXT PRIMARY KEY,
    method TEXT NOT NULL,
    request_url TEXT NOT NULL,
    response_url TEXT NOT NULL,
    status INTEGER NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    stored_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_responses_stored_at ON responses(stored_at);
"#;

/// Initializes the cache schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
