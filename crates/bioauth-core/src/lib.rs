//! bioauth-core — Local face-descriptor identity registry.
//!
//! Holds enrolled identities, enforces email uniqueness, persists the
//! identity list as a single blob, and matches live descriptors against it
//! by Euclidean distance.

pub mod enrollment;
pub mod error;
pub mod matcher;
pub mod persistence;
pub mod registry;
pub mod sqlite;
pub mod store;
pub mod types;

pub use error::{PersistenceError, RegistryError};
pub use matcher::{EuclideanMatcher, Matcher, DEFAULT_MATCH_THRESHOLD, EMPTY_GALLERY_DISTANCE};
pub use persistence::{MemoryPersistence, PersistenceAdapter, STORAGE_KEY};
pub use registry::{Registry, RegistryConfig, DEFAULT_DESCRIPTOR_LEN};
pub use sqlite::SqlitePersistence;
pub use store::{DescriptorStore, StoreState};
pub use types::{Descriptor, Identity, IdentitySummary, MatchResult, Verification, UNKNOWN_LABEL};

/// Well-known D-Bus name, object path and interface of the registry daemon.
pub mod bus {
    pub const SERVICE_NAME: &str = "org.bioauth.Registry1";
    pub const OBJECT_PATH: &str = "/org/bioauth/Registry1";
    pub const INTERFACE: &str = "org.bioauth.Registry1";
}
