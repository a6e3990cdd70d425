//! Enrollment and clear-all: the mutating side of the registry.

use crate::error::RegistryError;
use crate::persistence::PersistenceAdapter;
use crate::registry::Registry;
use crate::types::{Descriptor, Identity};

/// Reject blank display names.
pub fn validate_name(name: &str) -> Result<(), RegistryError> {
    if name.trim().is_empty() {
        return Err(RegistryError::InvalidName);
    }
    Ok(())
}

/// Reject blank emails and emails without an `@`.
pub fn validate_email(email: &str) -> Result<(), RegistryError> {
    if email.trim().is_empty() || !email.contains('@') {
        return Err(RegistryError::InvalidEmail(email.to_string()));
    }
    Ok(())
}

impl<P: PersistenceAdapter> Registry<P> {
    /// Enroll a new identity.
    ///
    /// The duplicate check, the in-memory insert and the persistence write
    /// happen under one write lock. If the write fails the insert is undone,
    /// so an identity is matchable only once it is durably stored.
    pub fn enroll(
        &self,
        name: &str,
        email: &str,
        descriptor: Descriptor,
    ) -> Result<Identity, RegistryError> {
        validate_name(name)?;
        validate_email(email)?;
        self.check_descriptor(&descriptor)?;

        let mut store = self.write_store()?;
        if !store.is_ready() {
            return Err(RegistryError::NotReady);
        }
        if store.contains_email(email) {
            tracing::info!(email, "enrollment rejected: email already registered");
            return Err(RegistryError::DuplicateEmail(email.to_string()));
        }

        let persistence = self.lock_persistence()?;
        let identity = Identity::new(name, email, descriptor);
        store.insert(identity.clone());

        let written = persistence.write_all(store.records());
        if let Err(err) = written {
            store.pop_last();
            tracing::warn!(email, error = %err, "enrollment rolled back: persistence write failed");
            return Err(err.into());
        }

        tracing::info!(
            email,
            id = %identity.id,
            total = store.len(),
            "identity enrolled"
        );
        Ok(identity)
    }

    /// Remove every enrolled identity, in memory and in persistence.
    ///
    /// Persistence is erased first; if that fails the in-memory store is left
    /// untouched. Returns the number of identities removed.
    pub fn clear_all(&self) -> Result<usize, RegistryError> {
        let mut store = self.write_store()?;
        if !store.is_ready() {
            return Err(RegistryError::NotReady);
        }

        let persistence = self.lock_persistence()?;
        persistence.erase_all()?;

        let removed = store.len();
        store.clear();
        tracing::info!(removed, "identity store cleared");
        Ok(removed)
    }
}
