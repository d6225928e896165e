use rusqlite::Connection;

use crate::error::{Result, StorageError};

/// Create the entries table `table` and its due-time index (idempotent).
///
/// `time` holds UTC RFC 3339 text with nanosecond precision and a `Z`
/// suffix. Push only accepts four-digit years, so every value has the same width, so comparing the text orders by
/// instant and the due query can use a plain `<=`.
pub fn init_db(conn: &Connection, table: &str) -> Result<()> {
    validate_table_name(table)?;
    conn.execute_batch(&format!(
        "
        CREATE TABLE IF NOT EXISTS {table} (
            id      TEXT NOT NULL PRIMARY KEY,
            time    TEXT NOT NULL,               -- due time, UTC
            state   TEXT NOT NULL DEFAULT '{{}}', -- JSON-encoded job
            type    TEXT NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_{table}_time ON {table} (time);
        "
    ))?;
    Ok(())
}

/// Accept only `[A-Za-z_][A-Za-z0-9_]*`; the name is spliced into SQL text.
pub fn validate_table_name(table: &str) -> Result<()> {
    let mut chars = table.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidTableName(table.to_string()))
    }
}
