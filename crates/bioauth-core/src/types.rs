use serde::{Deserialize, Serialize};

/// Label reported by the matcher when no enrolled identity is close enough.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Face descriptor produced by an external embedding model.
///
/// Serialized as a plain JSON number array so the persisted blob does not
/// depend on any particular vector type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Descriptor(Vec<f32>);

impl Descriptor {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if every component is a finite number.
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }

    /// Compute Euclidean distance between two descriptors.
    ///
    /// Callers are expected to have checked that both lengths agree; extra
    /// components on either side are ignored.
    ///
    /// Accumulates in `f64` and saturates at `f32::MAX`, so finite inputs
    /// always give a finite distance.
    pub fn euclidean_distance(&self, other: &Descriptor) -> f32 {
        let sum: f64 = self
            .0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (f64::from(*a) - f64::from(*b)).powi(2))
            .sum();
        sum.sqrt().min(f64::from(f32::MAX)) as f32
    }
}

impl From<Vec<f32>> for Descriptor {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// An enrolled identity. Email is the matching key and is unique per store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub email: String,
    pub descriptor: Descriptor,
    /// Creation time in epoch milliseconds.
    pub created_at: i64,
}

impl Identity {
    /// Build a fresh record with a new random id and the current timestamp.
    pub fn new(name: impl Into<String>, email: impl Into<String>, descriptor: Descriptor) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            email: email.into(),
            descriptor,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn summary(&self) -> IdentitySummary {
        IdentitySummary {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            created_at: self.created_at,
        }
    }
}

/// Identity metadata without the biometric descriptor, for listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: i64,
}

/// Result of matching a query descriptor against the enrolled identities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    /// Email of the closest identity, or [`UNKNOWN_LABEL`].
    pub matched_email: String,
    /// Euclidean distance to the closest identity (1.0 when nothing is enrolled).
    pub distance: f32,
    pub is_match: bool,
}

impl MatchResult {
    pub fn unknown(distance: f32) -> Self {
        Self {
            matched_email: UNKNOWN_LABEL.to_string(),
            distance,
            is_match: false,
        }
    }

    /// Matched email, or `None` for an unknown face.
    pub fn email(&self) -> Option<&str> {
        self.is_match.then_some(self.matched_email.as_str())
    }
}

/// Outcome of a login attempt that pairs a typed email with a live descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Verification {
    /// The face matched the identity registered under the supplied email.
    Verified { identity: IdentitySummary, distance: f32 },
    /// The face matched a different enrolled identity.
    Mismatch { matched_email: String, distance: f32 },
    /// No enrolled identity is within the threshold.
    Unrecognized { distance: f32 },
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verification::Verified { .. })
    }
}
