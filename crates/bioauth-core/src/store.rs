//! In-memory collection of enrolled identities.
//!
//! The store performs no locking and no uniqueness checks of its own; the
//! [`Registry`](crate::Registry) wraps it in a lock and validates before it
//! inserts.

use crate::error::{PersistenceError, RegistryError};
use crate::persistence::PersistenceAdapter;
use crate::types::Identity;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Uninitialized,
    Ready,
}

/// Ordered identity records, all sharing one descriptor length.
#[derive(Debug)]
pub struct DescriptorStore {
    descriptor_len: usize,
    state: StoreState,
    records: Vec<Identity>,
}

impl DescriptorStore {
    pub fn new(descriptor_len: usize) -> Self {
        Self {
            descriptor_len,
            state: StoreState::Uninitialized,
            records: Vec::new(),
        }
    }

    pub fn descriptor_len(&self) -> usize {
        self.descriptor_len
    }

    pub fn state(&self) -> StoreState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == StoreState::Ready
    }

    /// Populate from persistence. A no-op once the store is ready.
    ///
    /// Missing data yields an empty, ready store. A blob that cannot be read
    /// or fails validation leaves the store uninitialized.
    pub fn load(&mut self, persistence: &dyn PersistenceAdapter) -> Result<(), RegistryError> {
        if self.is_ready() {
            return Ok(());
        }

        let records = persistence.read_all()?.unwrap_or_default();
        self.validate(&records)?;

        tracing::info!(count = records.len(), "identity store loaded");
        self.records = records;
        self.state = StoreState::Ready;
        Ok(())
    }

    fn validate(&self, records: &[Identity]) -> Result<(), PersistenceError> {
        let mut emails = HashSet::with_capacity(records.len());
        for record in records {
            if record.descriptor.len() != self.descriptor_len {
                return Err(PersistenceError::Corrupt(format!(
                    "identity {} has a {}-component descriptor, expected {}",
                    record.id,
                    record.descriptor.len(),
                    self.descriptor_len
                )));
            }
            if !emails.insert(record.email.as_str()) {
                return Err(PersistenceError::Corrupt(format!(
                    "email {} is enrolled more than once",
                    record.email
                )));
            }
        }
        Ok(())
    }

    /// All records in insertion order.
    pub fn all(&self) -> Result<&[Identity], RegistryError> {
        if !self.is_ready() {
            return Err(RegistryError::NotReady);
        }
        Ok(&self.records)
    }

    /// Records in insertion order, regardless of state.
    pub fn records(&self) -> &[Identity] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains_email(&self, email: &str) -> bool {
        self.records.iter().any(|r| r.email == email)
    }

    /// Append a record. No validation happens here.
    pub fn insert(&mut self, record: Identity) {
        self.records.push(record);
    }

    /// Remove and return the most recently inserted record.
    pub fn pop_last(&mut self) -> Option<Identity> {
        self.records.pop()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryPersistence;
    use crate::types::Descriptor;

    fn record(email: &str, len: usize) -> Identity {
        Identity::new("Test", email, Descriptor::new(vec![0.5; len]))
    }

    #[test]
    fn test_uninitialized_store_is_not_ready() {
        let store = DescriptorStore::new(3);
        assert_eq!(store.state(), StoreState::Uninitialized);
        assert!(matches!(store.all(), Err(RegistryError::NotReady)));
    }

    #[test]
    fn test_load_absent_blob_gives_empty_ready_store() {
        let mut store = DescriptorStore::new(3);
        store.load(&MemoryPersistence::new()).unwrap();
        assert!(store.is_ready());
        assert!(store.all().unwrap().is_empty());
    }

    #[test]
    fn test_load_is_idempotent() {
        let storage = MemoryPersistence::new();
        storage.write_all(&[record("a@x.com", 3)]).unwrap();

        let mut store = DescriptorStore::new(3);
        store.load(&storage).unwrap();
        store.insert(record("b@x.com", 3));

        // A second load must not discard the in-memory state.
        storage.write_all(&[]).unwrap();
        store.load(&storage).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_load_rejects_wrong_descriptor_length() {
        let storage = MemoryPersistence::new();
        storage.write_all(&[record("a@x.com", 4)]).unwrap();

        let mut store = DescriptorStore::new(3);
        let err = store.load(&storage).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Persistence(PersistenceError::Corrupt(_))
        ));
        assert!(!store.is_ready());
    }

    #[test]
    fn test_load_rejects_duplicate_emails() {
        let storage = MemoryPersistence::new();
        storage
            .write_all(&[record("a@x.com", 3), record("a@x.com", 3)])
            .unwrap();

        let mut store = DescriptorStore::new(3);
        assert!(store.load(&storage).is_err());
        assert!(!store.is_ready());
    }

    #[test]
    fn test_load_malformed_blob_fails() {
        let storage = MemoryPersistence::with_blob("not json");
        let mut store = DescriptorStore::new(3);
        assert!(matches!(
            store.load(&storage),
            Err(RegistryError::Persistence(PersistenceError::Codec(_)))
        ));
        assert_eq!(store.state(), StoreState::Uninitialized);
    }

    #[test]
    fn test_records_and_pop_last_need_no_ready_state() {
        let mut store = DescriptorStore::new(2);
        store.insert(record("a@x.com", 2));
        assert_eq!(store.records().len(), 1);
        assert!(matches!(store.all(), Err(RegistryError::NotReady)));

        let popped = store.pop_last().unwrap();
        assert_eq!(popped.email, "a@x.com");
        assert!(store.records().is_empty());
        assert!(store.pop_last().is_none());
    }

    #[test]
    fn test_insert_preserves_order_and_clear_empties() {
        let mut store = DescriptorStore::new(2);
        store.load(&MemoryPersistence::new()).unwrap();
        store.insert(record("a@x.com", 2));
        store.insert(record("b@x.com", 2));

        let emails: Vec<_> = store.all().unwrap().iter().map(|r| r.email.as_str()).collect();
        assert_eq!(emails, ["a@x.com", "b@x.com"]);
        assert!(store.contains_email("b@x.com"));
        assert!(!store.contains_email("B@x.com"));

        store.clear();
        assert!(store.is_empty());
        assert!(store.is_ready());
    }
}
