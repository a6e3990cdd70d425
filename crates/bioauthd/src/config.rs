use bioauth_core::{RegistryConfig, DEFAULT_DESCRIPTOR_LEN, DEFAULT_MATCH_THRESHOLD};
use std::path::PathBuf;

/// Which D-Bus bus the daemon registers on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusKind {
    Session,
    System,
}

/// Daemon configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database holding the identity blob.
    pub db_path: PathBuf,
    /// Maximum Euclidean distance for a positive match.
    pub match_threshold: f32,
    /// Length every enrolled and queried descriptor must have.
    pub descriptor_len: usize,
    pub bus: BusKind,
}

impl Config {
    /// Load configuration from `BIOAUTH_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                let home = var("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("bioauth");

        let db_path = var("BIOAUTH_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("identities.db"));

        let match_threshold = var("BIOAUTH_MATCH_THRESHOLD")
            .and_then(|v| v.parse::<f32>().ok())
            .filter(|t| t.is_finite() && *t >= 0.0)
            .unwrap_or(DEFAULT_MATCH_THRESHOLD);

        let descriptor_len = var("BIOAUTH_DESCRIPTOR_LEN")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_DESCRIPTOR_LEN);

        let bus = match var("BIOAUTH_BUS").as_deref() {
            Some("system") => BusKind::System,
            _ => BusKind::Session,
        };

        Self {
            db_path,
            match_threshold,
            descriptor_len,
            bus,
        }
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            descriptor_len: self.descriptor_len,
            match_threshold: self.match_threshold,
        }
    }
}
