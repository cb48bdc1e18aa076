// Pagebot Engine — Key-Value Storage
//
// The persistent store engine is an external collaborator; the crate only
// needs a string key-value surface. `SqliteStore` is the default backing
// (single `addon_config` table), `MemoryStore` serves embedded hosts and
// tests. Neither offers optimistic concurrency — callers that read-modify-
// write must serialize per key themselves (see store/page_groups.rs).

pub mod page_groups;

use crate::atoms::error::{AddonError, AddonResult};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;

pub use page_groups::{GroupSummary, PageGroupStore};

// ── Trait ──────────────────────────────────────────────────────────────────

pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> AddonResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> AddonResult<()>;
    fn remove(&self, key: &str) -> AddonResult<()>;
}

// ── SQLite backing ─────────────────────────────────────────────────────────

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> AddonResult<Self> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> AddonResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> AddonResult<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS addon_config (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(SqliteStore { conn: Mutex::new(conn) })
    }
}

impl KvStore for SqliteStore {
    fn get(&self, key: &str) -> AddonResult<Option<String>> {
        let conn = self.conn.lock();
        let result = conn.query_row(
            "SELECT value FROM addon_config WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AddonError::Storage(e.to_string())),
        }
    }

    fn set(&self, key: &str, value: &str) -> AddonResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO addon_config (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> AddonResult<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM addon_config WHERE key = ?1", params![key])?;
        Ok(())
    }
}

// ── In-memory backing ──────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> AddonResult<Option<String>> {
        Ok(self.map.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> AddonResult<()> {
        self.map.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> AddonResult<()> {
        self.map.lock().remove(key);
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
