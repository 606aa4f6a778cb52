//! Durable key-value storage trait and SQLite implementation.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Trait for durable key-value storage backends.
///
/// A storage instance is bound to one namespace; keys from other namespaces
/// sharing the same database are never visible through it.
pub trait KvStorage: Send + Sync {
  /// Read the raw bytes stored under `key`.
  fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

  /// Store `data` under `key`, replacing any existing value.
  fn write(&self, key: &str, data: &[u8]) -> Result<()>;

  /// Delete `key`. Missing keys are not an error.
  fn delete(&self, key: &str) -> Result<()>;

  /// Delete every key in the namespace.
  fn clear(&self) -> Result<()>;
}

/// SQLite-based storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
  namespace: String,
}

impl SqliteStorage {
  /// Open the storage at the default location.
  pub fn open(namespace: &str) -> Result<Self> {
    let path = Self::default_path()?;
    Self::open_at(&path, namespace)
  }

  /// Open the storage at an explicit database path.
  pub fn open_at(path: &Path, namespace: &str) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create storage directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open store database at {}: {}", path.display(), e))?;

    Self::with_connection(conn, namespace)
  }

  /// Open a throwaway in-memory storage.
  #[allow(dead_code)]
  pub fn open_in_memory(namespace: &str) -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory store: {}", e))?;
    Self::with_connection(conn, namespace)
  }

  fn with_connection(conn: Connection, namespace: &str) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
      namespace: namespace.to_string(),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("station-sync").join("store.db"))
  }

  pub fn namespace(&self) -> &str {
    &self.namespace
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(STORE_SCHEMA)
      .map_err(|e| eyre!("Failed to run store migrations: {}", e))?;

    Ok(())
  }
}

const STORE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    namespace TEXT NOT NULL,
    key TEXT NOT NULL,
    data BLOB NOT NULL,
    written_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (namespace, key)
);
"#;

impl KvStorage for SqliteStorage {
  fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .query_row(
        "SELECT data FROM kv_store WHERE namespace = ? AND key = ?",
        params![self.namespace, key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read key '{}': {}", key, e))
  }

  fn write(&self, key: &str, data: &[u8]) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO kv_store (namespace, key, data, written_at)
         VALUES (?, ?, ?, datetime('now'))",
        params![self.namespace, key, data],
      )
      .map_err(|e| eyre!("Failed to write key '{}': {}", key, e))?;

    Ok(())
  }

  fn delete(&self, key: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "DELETE FROM kv_store WHERE namespace = ? AND key = ?",
        params![self.namespace, key],
      )
      .map_err(|e| eyre!("Failed to delete key '{}': {}", key, e))?;

    Ok(())
  }

  fn clear(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "DELETE FROM kv_store WHERE namespace = ?",
        params![self.namespace],
      )
      .map_err(|e| eyre!("Failed to clear namespace '{}': {}", self.namespace, e))?;

    Ok(())
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_write_then_read() {
    let storage = SqliteStorage::open_in_memory("test").unwrap();
    storage.write("a", b"hello").unwrap();
    assert_eq!(storage.read("a").unwrap(), Some(b"hello".to_vec()));
    assert_eq!(storage.read("missing").unwrap(), None);
  }

  #[test]
  fn test_delete_missing_is_ok() {
    let storage = SqliteStorage::open_in_memory("test").unwrap();
    storage.delete("nothing").unwrap();
  }

  #[test]
  fn test_namespaces_are_isolated() {
    let dir = std::env::temp_dir().join(format!("station-sync-ns-{}", std::process::id()));
    let path = dir.join("store.db");
    let _ = std::fs::remove_file(&path);

    let a = SqliteStorage::open_at(&path, "a").unwrap();
    let b = SqliteStorage::open_at(&path, "b").unwrap();
    a.write("k", b"1").unwrap();
    b.write("k", b"2").unwrap();

    a.clear().unwrap();
    assert_eq!(a.read("k").unwrap(), None);
    assert_eq!(b.read("k").unwrap(), Some(b"2".to_vec()));

    let _ = std::fs::remove_dir_all(&dir);
  }

  #[test]
  fn test_survives_reopen() {
    let dir = std::env::temp_dir().join(format!("station-sync-reopen-{}", std::process::id()));
    let path = dir.join("store.db");
    let _ = std::fs::remove_file(&path);

    {
      let storage = SqliteStorage::open_at(&path, "ns").unwrap();
      storage.write("persisted", b"yes").unwrap();
    }

    let storage = SqliteStorage::open_at(&path, "ns").unwrap();
    assert_eq!(storage.read("persisted").unwrap(), Some(b"yes".to_vec()));

    let _ = std::fs::remove_dir_all(&dir);
  }
}
