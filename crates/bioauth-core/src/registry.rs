//! Shared identity registry: one store, one persistence backend, one lock.
//!
//! Matching takes the read side of the store lock. Loading, enrollment and
//! clearing take the write side and keep it until persistence has finished,
//! so a reader never sees a record that is not durably stored.

use crate::enrollment::validate_email;
use crate::error::RegistryError;
use crate::matcher::{EuclideanMatcher, Matcher, DEFAULT_MATCH_THRESHOLD};
use crate::persistence::PersistenceAdapter;
use crate::store::DescriptorStore;
use crate::types::{Descriptor, Identity, MatchResult, Verification};
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Default descriptor length (face-api style 128-dimensional embeddings).
pub const DEFAULT_DESCRIPTOR_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegistryConfig {
    /// Number of components every descriptor must have.
    pub descriptor_len: usize,
    /// Maximum Euclidean distance for a positive match.
    pub match_threshold: f32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            descriptor_len: DEFAULT_DESCRIPTOR_LEN,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

pub struct Registry<P: PersistenceAdapter> {
    config: RegistryConfig,
    store: RwLock<DescriptorStore>,
    persistence: Mutex<P>,
}

impl<P: PersistenceAdapter> Registry<P> {
    /// Create an unloaded registry. Call [`load`](Self::load) before use.
    pub fn new(persistence: P, config: RegistryConfig) -> Self {
        Self {
            config,
            store: RwLock::new(DescriptorStore::new(config.descriptor_len)),
            persistence: Mutex::new(persistence),
        }
    }

    /// Create a registry and load it from `persistence` in one step.
    pub fn open(persistence: P, config: RegistryConfig) -> Result<Self, RegistryError> {
        let registry = Self::new(persistence, config);
        registry.load()?;
        Ok(registry)
    }

    /// Load enrolled identities from persistence. Idempotent.
    pub fn load(&self) -> Result<(), RegistryError> {
        let mut store = self.write_store()?;
        let persistence = self.lock_persistence()?;
        store.load(&*persistence)
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn is_ready(&self) -> bool {
        self.read_store().map(|s| s.is_ready()).unwrap_or(false)
    }

    /// Number of enrolled identities.
    pub fn len(&self) -> Result<usize, RegistryError> {
        Ok(self.read_store()?.all()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, RegistryError> {
        Ok(self.len()? == 0)
    }

    /// Find the closest enrolled identity to `query` within `threshold`.
    pub fn match_descriptor(
        &self,
        query: &Descriptor,
        threshold: f32,
    ) -> Result<MatchResult, RegistryError> {
        let store = self.read_store()?;
        let gallery = store.all()?;
        self.check_descriptor(query)?;

        let result = EuclideanMatcher.compare(query, gallery, threshold);
        tracing::debug!(
            gallery = gallery.len(),
            matched = result.is_match,
            distance = result.distance,
            "match evaluated"
        );
        Ok(result)
    }

    /// [`match_descriptor`](Self::match_descriptor) with the configured threshold.
    pub fn match_default(&self, query: &Descriptor) -> Result<MatchResult, RegistryError> {
        self.match_descriptor(query, self.config.match_threshold)
    }

    /// Check a login attempt: the face must match the identity enrolled under `email`.
    pub fn verify(&self, email: &str, query: &Descriptor) -> Result<Verification, RegistryError> {
        validate_email(email)?;

        let store = self.read_store()?;
        let gallery = store.all()?;
        self.check_descriptor(query)?;

        let result = EuclideanMatcher.compare(query, gallery, self.config.match_threshold);
        let verification = if !result.is_match {
            Verification::Unrecognized {
                distance: result.distance,
            }
        } else {
            match gallery.iter().find(|r| r.email == email) {
                Some(identity) if result.matched_email == email => Verification::Verified {
                    identity: identity.summary(),
                    distance: result.distance,
                },
                _ => Verification::Mismatch {
                    matched_email: result.matched_email,
                    distance: result.distance,
                },
            }
        };

        tracing::info!(
            email,
            verified = verification.is_verified(),
            distance = result.distance,
            "login verification"
        );
        Ok(verification)
    }

    /// Snapshot of all enrolled identities in enrollment order.
    pub fn identities(&self) -> Result<Vec<Identity>, RegistryError> {
        Ok(self.read_store()?.all()?.to_vec())
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<Identity>, RegistryError> {
        let store = self.read_store()?;
        Ok(store.all()?.iter().find(|r| r.email == email).cloned())
    }

    pub(crate) fn check_descriptor(&self, descriptor: &Descriptor) -> Result<(), RegistryError> {
        if descriptor.len() != self.config.descriptor_len {
            return Err(RegistryError::DescriptorLengthMismatch {
                expected: self.config.descriptor_len,
                actual: descriptor.len(),
            });
        }
        if !descriptor.is_finite() {
            return Err(RegistryError::NonFiniteDescriptor);
        }
        Ok(())
    }

    pub(crate) fn read_store(&self) -> Result<RwLockReadGuard<'_, DescriptorStore>, RegistryError> {
        self.store.read().map_err(|_| RegistryError::LockPoisoned)
    }

    pub(crate) fn write_store(
        &self,
    ) -> Result<RwLockWriteGuard<'_, DescriptorStore>, RegistryError> {
        self.store.write().map_err(|_| RegistryError::LockPoisoned)
    }

    pub(crate) fn lock_persistence(&self) -> Result<MutexGuard<'_, P>, RegistryError> {
        self.persistence
            .lock()
            .map_err(|_| RegistryError::LockPoisoned)
    }
}
