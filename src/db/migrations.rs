use rusqlite::{params, Connection, Result};
use super::schema::{SCHEMA, DEFAULT_ENTRIES};

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    seed_default_entries(conn)?;
    Ok(())
}

// Missing keys only: existing user data is never overwritten.
fn seed_default_entries(conn: &Connection) -> Result<()> {
    for (key, value) in DEFAULT_ENTRIES {
        conn.execute(
            "INSERT OR IGNORE INTO kv (key, value, updated_at) VALUES (?1, ?2, 0)",
            params![key, value],
        )?;
    }
    Ok(())
}
