//! Durable storage of the full identity list as one opaque blob.
//!
//! Every mutation rewrites the whole list; there is no per-record persistence.
//! The blob is a JSON array of [`Identity`] records.

use crate::error::PersistenceError;
use crate::types::Identity;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Well-known key under which the identity list is stored.
pub const STORAGE_KEY: &str = "bioauth_users";

/// Read/replace/erase access to the persisted identity list.
pub trait PersistenceAdapter: Send {
    /// Read the persisted list. `Ok(None)` means nothing was ever written.
    fn read_all(&self) -> Result<Option<Vec<Identity>>, PersistenceError>;

    /// Replace the persisted list with `records`.
    fn write_all(&self, records: &[Identity]) -> Result<(), PersistenceError>;

    /// Remove the persisted list entirely.
    fn erase_all(&self) -> Result<(), PersistenceError>;
}

pub fn encode(records: &[Identity]) -> Result<String, PersistenceError> {
    Ok(serde_json::to_string(records)?)
}

pub fn decode(blob: &str) -> Result<Vec<Identity>, PersistenceError> {
    Ok(serde_json::from_str(blob)?)
}

/// In-process blob storage.
///
/// Clones share the same blob, so dropping a registry and building a new one
/// from a clone behaves like a process restart over the same storage.
#[derive(Clone, Default)]
pub struct MemoryPersistence {
    blob: Arc<Mutex<Option<String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing raw blob.
    pub fn with_blob(blob: impl Into<String>) -> Self {
        let storage = Self::default();
        if let Ok(mut slot) = storage.blob.lock() {
            *slot = Some(blob.into());
        }
        storage
    }

    /// Current raw blob, if any.
    pub fn blob(&self) -> Option<String> {
        self.blob.lock().ok().and_then(|slot| slot.clone())
    }

    /// Make subsequent writes and erases fail with [`PersistenceError::Unavailable`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), PersistenceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable("writes disabled".into()));
        }
        Ok(())
    }
}

impl PersistenceAdapter for MemoryPersistence {
    fn read_all(&self) -> Result<Option<Vec<Identity>>, PersistenceError> {
        let slot = self
            .blob
            .lock()
            .map_err(|_| PersistenceError::Unavailable("blob lock poisoned".into()))?;
        slot.as_deref().map(decode).transpose()
    }

    fn write_all(&self, records: &[Identity]) -> Result<(), PersistenceError> {
        self.check_writable()?;
        let encoded = encode(records)?;
        let mut slot = self
            .blob
            .lock()
            .map_err(|_| PersistenceError::Unavailable("blob lock poisoned".into()))?;
        *slot = Some(encoded);
        Ok(())
    }

    fn erase_all(&self) -> Result<(), PersistenceError> {
        self.check_writable()?;
        let mut slot = self
            .blob
            .lock()
            .map_err(|_| PersistenceError::Unavailable("blob lock poisoned".into()))?;
        *slot = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Descriptor;

    fn sample() -> Identity {
        Identity {
            id: "0f8c".into(),
            name: "Alice".into(),
            email: "alice@x.com".into(),
            descriptor: Descriptor::new(vec![0.1, -0.2, 0.3]),
            created_at: 1_700_000_000_123,
        }
    }

    #[test]
    fn test_decode_wire_format() {
        let blob = r#"[{"id":"u1","name":"Bob","email":"bob@x.com","descriptor":[0.5,0.25],"createdAt":42}]"#;
        let records = decode(blob).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].email, "bob@x.com");
        assert_eq!(records[0].descriptor.values(), &[0.5, 0.25]);
        assert_eq!(records[0].created_at, 42);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode("{not json"), Err(PersistenceError::Codec(_))));
        assert!(matches!(decode(r#"[{"id":"x"}]"#), Err(PersistenceError::Codec(_))));
    }

    #[test]
    fn test_f32_values_survive_encoding() {
        let original = sample();
        let blob = encode(std::slice::from_ref(&original)).unwrap();
        let restored = decode(&blob).unwrap();
        assert_eq!(restored, vec![original]);
    }

    #[test]
    fn test_memory_absent_until_written() {
        let storage = MemoryPersistence::new();
        assert!(storage.read_all().unwrap().is_none());

        storage.write_all(&[sample()]).unwrap();
        assert_eq!(storage.read_all().unwrap().unwrap().len(), 1);

        storage.erase_all().unwrap();
        assert!(storage.read_all().unwrap().is_none());
        assert!(storage.blob().is_none());
    }

    #[test]
    fn test_memory_clones_share_blob() {
        let storage = MemoryPersistence::new();
        let other = storage.clone();
        storage.write_all(&[sample()]).unwrap();
        assert!(other.blob().is_some());
    }

    #[test]
    fn test_memory_write_failure_leaves_blob() {
        let storage = MemoryPersistence::new();
        storage.write_all(&[sample()]).unwrap();
        let before = storage.blob();

        storage.set_fail_writes(true);
        assert!(matches!(
            storage.write_all(&[]),
            Err(PersistenceError::Unavailable(_))
        ));
        assert!(storage.erase_all().is_err());
        assert_eq!(storage.blob(), before);
    }
}
