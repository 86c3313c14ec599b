pub mod schema;
pub mod migrations;

use rusqlite::{params, Connection, OptionalExtension, Result, TransactionBehavior};
use std::path::Path;
use std::time::Duration;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()
    }

    /// Read-modify-write a set of keys inside one `BEGIN IMMEDIATE`
    /// transaction. `f` receives the current raw values (in `keys` order)
    /// and returns the values to write back; `None` leaves a key untouched.
    pub fn transact<F, T, E>(&mut self, keys: &[&str], f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(Vec<Option<String>>) -> std::result::Result<(Vec<Option<String>>, T), E>,
        E: From<rusqlite::Error>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut current = Vec::with_capacity(keys.len());
        for key in keys {
            let value: Option<String> = tx
                .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
                .optional()?;
            current.push(value);
        }

        let (updates, out) = f(current)?;

        let now = chrono::Utc::now().timestamp();
        for (key, value) in keys.iter().zip(updates) {
            if let Some(value) = value {
                tx.execute(
                    "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                    params![key, value, now],
                )?;
            }
        }

        tx.commit()?;
        Ok(out)
    }
}
