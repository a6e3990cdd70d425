use crate::worker::{RegistryHandle, WorkerError};
use bioauth_core::{Descriptor, RegistryError};
use serde::Serialize;
use zbus::interface;

/// D-Bus interface for the bioauth identity registry.
///
/// Bus name: org.bioauth.Registry1
/// Object path: /org/bioauth/Registry1
///
/// Descriptors arrive as double arrays and are narrowed to `f32`. Results are
/// returned as JSON strings.
pub struct RegistryService {
    handle: RegistryHandle,
}

impl RegistryService {
    pub fn new(handle: RegistryHandle) -> Self {
        Self { handle }
    }
}

#[interface(name = "org.bioauth.Registry1")]
impl RegistryService {
    /// Enroll a new identity. Returns the created record without its descriptor.
    async fn enroll(
        &self,
        name: &str,
        email: &str,
        descriptor: Vec<f64>,
    ) -> zbus::fdo::Result<String> {
        tracing::info!(email, "enroll requested");
        let identity = self
            .handle
            .enroll(name.to_string(), email.to_string(), narrow(descriptor))
            .await
            .map_err(to_fdo)?;
        to_json(&identity.summary())
    }

    /// Find the closest enrolled identity within the configured threshold.
    #[zbus(name = "Match")]
    async fn match_descriptor(&self, descriptor: Vec<f64>) -> zbus::fdo::Result<String> {
        let result = self
            .handle
            .match_descriptor(narrow(descriptor))
            .await
            .map_err(to_fdo)?;
        to_json(&result)
    }

    /// Check that the live face belongs to the identity enrolled under `email`.
    async fn verify(&self, email: &str, descriptor: Vec<f64>) -> zbus::fdo::Result<String> {
        tracing::info!(email, "verify requested");
        let verification = self
            .handle
            .verify(email.to_string(), narrow(descriptor))
            .await
            .map_err(to_fdo)?;
        to_json(&verification)
    }

    async fn list_identities(&self) -> zbus::fdo::Result<String> {
        let identities = self.handle.list().await.map_err(to_fdo)?;
        to_json(&identities)
    }

    /// Remove every enrolled identity. Returns how many were removed.
    async fn clear_all(&self) -> zbus::fdo::Result<u32> {
        tracing::warn!("clear_all requested");
        let removed = self.handle.clear_all().await.map_err(to_fdo)?;
        Ok(u32::try_from(removed).unwrap_or(u32::MAX))
    }

    async fn status(&self) -> zbus::fdo::Result<String> {
        let status = self.handle.status().await.map_err(to_fdo)?;
        to_json(&status)
    }
}

fn narrow(values: Vec<f64>) -> Descriptor {
    Descriptor::new(values.into_iter().map(|v| v as f32).collect())
}

fn to_json<T: Serialize>(value: &T) -> zbus::fdo::Result<String> {
    serde_json::to_string(value).map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
}

fn to_fdo(err: WorkerError) -> zbus::fdo::Error {
    let message = err.to_string();
    match err {
        WorkerError::Registry(
            RegistryError::DuplicateEmail(_)
            | RegistryError::InvalidName
            | RegistryError::InvalidEmail(_)
            | RegistryError::DescriptorLengthMismatch { .. }
            | RegistryError::NonFiniteDescriptor,
        ) => zbus::fdo::Error::InvalidArgs(message),
        WorkerError::Registry(RegistryError::Persistence(_)) => zbus::fdo::Error::IOError(message),
        _ => {
            tracing::error!(error = %message, "registry call failed");
            zbus::fdo::Error::Failed(message)
        }
    }
}
