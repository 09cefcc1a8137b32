//! SQLite-based key-value storage for the offline cache

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use rusqlite_migration::{M, Migrations};

use super::KeyValueCache;

/// Database migrations
///
/// Each migration is applied in order. The user_version pragma tracks which
/// migrations have been applied.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        // Migration 1: Initial schema
        M::up(
            r#"
            CREATE TABLE entries (
                namespace TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (namespace, key)
            );
            "#,
        ),
    ])
}

/// SQLite-backed key-value store
///
/// A single `entries` table keyed by (namespace, key). Values are stored as
/// text exactly as handed in; the cache facade owns (de)serialization.
pub struct SqliteKvStore {
    conn: Mutex<Connection>,
}

impl SqliteKvStore {
    /// Open (or create) the database at `db_path` and run migrations
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open database at {:?}", db_path.as_ref()))?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        // WAL keeps readers unblocked during writes; NORMAL sync is safe with WAL.
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            "#,
        )?;

        migrations()
            .to_latest(&mut conn)
            .context("Failed to run database migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }
}

impl KeyValueCache for SqliteKvStore {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM entries WHERE namespace = ? AND key = ?",
                params![namespace, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, namespace: &str, key: &str, value: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO entries (namespace, key, value, updated_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(namespace, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            params![namespace, key, value, Utc::now().to_rfc3339()],
        )
        .with_context(|| format!("Failed to write key {}/{}", namespace, key))?;
        Ok(())
    }

    fn remove(&self, namespace: &str, key: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM entries WHERE namespace = ? AND key = ?",
            params![namespace, key],
        )?;
        Ok(())
    }

    fn clear_namespace(&self, namespace: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM entries WHERE namespace = ?", [namespace])?;
        Ok(())
    }

    fn keys(&self, namespace: &str) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT key FROM entries WHERE namespace = ? ORDER BY key")?;
        let keys = stmt
            .query_map([namespace], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}
