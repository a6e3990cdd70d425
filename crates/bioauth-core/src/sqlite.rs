//! SQLite-backed key/value storage for the identity blob.

use crate::error::PersistenceError;
use crate::persistence::{decode, encode, PersistenceAdapter, STORAGE_KEY};
use crate::types::Identity;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kv (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
)";

/// Stores the identity list under [`STORAGE_KEY`] in a single-table SQLite database.
pub struct SqlitePersistence {
    conn: Connection,
}

impl SqlitePersistence {
    /// Open (or create) the database at `path`, creating parent directories as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        tracing::debug!(path = %path.display(), "opened identity database");
        Self::init(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, PersistenceError> {
        conn.execute(SCHEMA, [])?;
        Ok(Self { conn })
    }
}

impl PersistenceAdapter for SqlitePersistence {
    fn read_all(&self) -> Result<Option<Vec<Identity>>, PersistenceError> {
        let blob: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![STORAGE_KEY],
                |row| row.get(0),
            )
            .optional()?;
        blob.as_deref().map(decode).transpose()
    }

    fn write_all(&self, records: &[Identity]) -> Result<(), PersistenceError> {
        let blob = encode(records)?;
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![STORAGE_KEY, blob],
        )?;
        Ok(())
    }

    fn erase_all(&self) -> Result<(), PersistenceError> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![STORAGE_KEY])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Descriptor;

    fn record(email: &str) -> Identity {
        Identity::new("Test", email, Descriptor::new(vec![0.25, 0.5, 0.75]))
    }

    #[test]
    fn test_fresh_database_has_no_blob() {
        let storage = SqlitePersistence::open_in_memory().unwrap();
        assert!(storage.read_all().unwrap().is_none());
    }

    #[test]
    fn test_write_replaces_whole_list() {
        let storage = SqlitePersistence::open_in_memory().unwrap();
        storage.write_all(&[record("a@x.com"), record("b@x.com")]).unwrap();
        storage.write_all(&[record("c@x.com")]).unwrap();

        let records = storage.read_all().unwrap().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].email, "c@x.com");
    }

    #[test]
    fn test_erase_removes_blob() {
        let storage = SqlitePersistence::open_in_memory().unwrap();
        storage.write_all(&[record("a@x.com")]).unwrap();
        storage.erase_all().unwrap();
        assert!(storage.read_all().unwrap().is_none());
        // erasing twice is harmless
        storage.erase_all().unwrap();
    }

    #[test]
    fn test_reopen_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("identities.db");
        let original = record("a@x.com");

        {
            let storage = SqlitePersistence::open(&path).unwrap();
            storage.write_all(std::slice::from_ref(&original)).unwrap();
        }

        let storage = SqlitePersistence::open(&path).unwrap();
        assert_eq!(storage.read_all().unwrap().unwrap(), vec![original]);
    }

    #[test]
    fn test_corrupt_blob_is_an_error() {
        let storage = SqlitePersistence::open_in_memory().unwrap();
        storage
            .conn
            .execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)",
                params![STORAGE_KEY, "[{\"id\":"],
            )
            .unwrap();
        assert!(matches!(storage.read_all(), Err(PersistenceError::Codec(_))));
    }
}
