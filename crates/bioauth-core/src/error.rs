use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("malformed identity blob: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("corrupt identity blob: {0}")]
    Corrupt(String),
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("identity store is not loaded yet")]
    NotReady,
    #[error("user with email {0} already exists")]
    DuplicateEmail(String),
    #[error("descriptor has {actual} components, store expects {expected}")]
    DescriptorLengthMismatch { expected: usize, actual: usize },
    #[error("descriptor contains NaN or infinite components")]
    NonFiniteDescriptor,
    #[error("name must not be blank")]
    InvalidName,
    #[error("invalid email: {0:?}")]
    InvalidEmail(String),
    #[error("persistence failure: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("identity store lock poisoned")]
    LockPoisoned,
}
