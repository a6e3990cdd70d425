use bioauth_core::{
    Descriptor, Identity, IdentitySummary, MatchResult, PersistenceAdapter, Registry,
    RegistryConfig, RegistryError, Verification,
};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("failed to spawn registry thread: {0}")]
    Spawn(std::io::Error),
    #[error("registry thread exited")]
    ChannelClosed,
}

/// Snapshot of registry state for the `Status` call.
#[derive(Debug, Clone, Serialize)]
pub struct RegistryStatus {
    pub version: &'static str,
    pub ready: bool,
    pub identities: usize,
    pub descriptor_len: usize,
    pub match_threshold: f32,
}

/// Messages sent from D-Bus handlers to the registry thread.
enum RegistryRequest {
    Enroll {
        name: String,
        email: String,
        descriptor: Descriptor,
        reply: oneshot::Sender<Result<Identity, RegistryError>>,
    },
    Match {
        descriptor: Descriptor,
        reply: oneshot::Sender<Result<MatchResult, RegistryError>>,
    },
    Verify {
        email: String,
        descriptor: Descriptor,
        reply: oneshot::Sender<Result<Verification, RegistryError>>,
    },
    List {
        reply: oneshot::Sender<Result<Vec<IdentitySummary>, RegistryError>>,
    },
    ClearAll {
        reply: oneshot::Sender<Result<usize, RegistryError>>,
    },
    Status {
        reply: oneshot::Sender<RegistryStatus>,
    },
}

/// Clone-safe handle to the registry thread.
#[derive(Clone)]
pub struct RegistryHandle {
    tx: mpsc::Sender<RegistryRequest>,
}

impl RegistryHandle {
    async fn call<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> RegistryRequest,
    ) -> Result<T, WorkerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| WorkerError::ChannelClosed)?;
        reply_rx.await.map_err(|_| WorkerError::ChannelClosed)
    }

    pub async fn enroll(
        &self,
        name: String,
        email: String,
        descriptor: Descriptor,
    ) -> Result<Identity, WorkerError> {
        Ok(self
            .call(|reply| RegistryRequest::Enroll {
                name,
                email,
                descriptor,
                reply,
            })
            .await??)
    }

    /// Match against the registry using the configured threshold.
    pub async fn match_descriptor(&self, descriptor: Descriptor) -> Result<MatchResult, WorkerError> {
        Ok(self
            .call(|reply| RegistryRequest::Match { descriptor, reply })
            .await??)
    }

    pub async fn verify(
        &self,
        email: String,
        descriptor: Descriptor,
    ) -> Result<Verification, WorkerError> {
        Ok(self
            .call(|reply| RegistryRequest::Verify {
                email,
                descriptor,
                reply,
            })
            .await??)
    }

    pub async fn list(&self) -> Result<Vec<IdentitySummary>, WorkerError> {
        Ok(self.call(|reply| RegistryRequest::List { reply }).await??)
    }

    pub async fn clear_all(&self) -> Result<usize, WorkerError> {
        Ok(self.call(|reply| RegistryRequest::ClearAll { reply }).await??)
    }

    pub async fn status(&self) -> Result<RegistryStatus, WorkerError> {
        self.call(|reply| RegistryRequest::Status { reply }).await
    }
}

/// Spawn the registry on a dedicated OS thread.
///
/// Loads the identity list before returning, so the daemon fails fast when
/// storage is unreadable or corrupt. The thread then serves requests one at a
/// time, which serializes every enrollment and clear against each other and
/// against matching.
pub fn spawn_registry<P>(persistence: P, config: RegistryConfig) -> Result<RegistryHandle, WorkerError>
where
    P: PersistenceAdapter + 'static,
{
    let registry = Registry::open(persistence, config)?;
    tracing::info!(
        identities = registry.len()?,
        descriptor_len = config.descriptor_len,
        threshold = config.match_threshold,
        "identity registry ready"
    );

    let (tx, mut rx) = mpsc::channel::<RegistryRequest>(16);

    std::thread::Builder::new()
        .name("bioauth-registry".into())
        .spawn(move || {
            tracing::info!("registry thread started");
            while let Some(req) = rx.blocking_recv() {
                handle_request(&registry, req);
            }
            tracing::info!("registry thread exiting");
        })
        .map_err(WorkerError::Spawn)?;

    Ok(RegistryHandle { tx })
}

fn handle_request<P: PersistenceAdapter>(registry: &Registry<P>, req: RegistryRequest) {
    // A dropped receiver means the caller went away; nothing to report.
    match req {
        RegistryRequest::Enroll {
            name,
            email,
            descriptor,
            reply,
        } => {
            let _ = reply.send(registry.enroll(&name, &email, descriptor));
        }
        RegistryRequest::Match { descriptor, reply } => {
            let _ = reply.send(registry.match_default(&descriptor));
        }
        RegistryRequest::Verify {
            email,
            descriptor,
            reply,
        } => {
            let _ = reply.send(registry.verify(&email, &descriptor));
        }
        RegistryRequest::List { reply } => {
            let result = registry
                .identities()
                .map(|ids| ids.iter().map(Identity::summary).collect());
            let _ = reply.send(result);
        }
        RegistryRequest::ClearAll { reply } => {
            let _ = reply.send(registry.clear_all());
        }
        RegistryRequest::Status { reply } => {
            let config = registry.config();
            let _ = reply.send(RegistryStatus {
                version: env!("CARGO_PKG_VERSION"),
                ready: registry.is_ready(),
                identities: registry.len().unwrap_or(0),
                descriptor_len: config.descriptor_len,
                match_threshold: config.match_threshold,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bioauth_core::MemoryPersistence;

    fn config() -> RegistryConfig {
        RegistryConfig {
            descriptor_len: 3,
            match_threshold: 0.6,
        }
    }

    fn descriptor(values: [f32; 3]) -> Descriptor {
        Descriptor::new(values.to_vec())
    }

    #[tokio::test]
    async fn test_enroll_then_match_through_handle() {
        let handle = spawn_registry(MemoryPersistence::new(), config()).unwrap();

        let identity = handle
            .enroll("Alice".into(), "alice@x.com".into(), descriptor([0.1, 0.2, 0.3]))
            .await
            .unwrap();
        assert_eq!(identity.email, "alice@x.com");

        let result = handle
            .match_descriptor(descriptor([0.1, 0.2, 0.35]))
            .await
            .unwrap();
        assert!(result.is_match);
        assert_eq!(result.matched_email, "alice@x.com");

        let listed = handle.list().await.unwrap();
        assert_eq!(listed, vec![identity.summary()]);
    }

    #[tokio::test]
    async fn test_duplicate_enrollment_surfaces_registry_error() {
        let handle = spawn_registry(MemoryPersistence::new(), config()).unwrap();
        handle
            .enroll("A".into(), "a@x.com".into(), descriptor([0.0; 3]))
            .await
            .unwrap();

        let err = handle
            .enroll("B".into(), "a@x.com".into(), descriptor([1.0; 3]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkerError::Registry(RegistryError::DuplicateEmail(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_handles_single_winner() {
        let handle = spawn_registry(MemoryPersistence::new(), config()).unwrap();

        let tasks: Vec<_> = (0..4)
            .map(|i| {
                let handle = handle.clone();
                tokio::spawn(async move {
                    handle
                        .enroll(format!("caller {i}"), "same@x.com".into(), descriptor([i as f32; 3]))
                        .await
                })
            })
            .collect();

        let mut successes = 0;
        for task in tasks {
            if task.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(handle.status().await.unwrap().identities, 1);
    }

    #[tokio::test]
    async fn test_clear_and_status() {
        let storage = MemoryPersistence::new();
        let handle = spawn_registry(storage.clone(), config()).unwrap();
        handle
            .enroll("A".into(), "a@x.com".into(), descriptor([0.0; 3]))
            .await
            .unwrap();

        assert_eq!(handle.clear_all().await.unwrap(), 1);
        assert!(storage.blob().is_none());

        let status = handle.status().await.unwrap();
        assert!(status.ready);
        assert_eq!(status.identities, 0);
        assert_eq!(status.descriptor_len, 3);

        let verification = handle
            .verify("a@x.com".into(), descriptor([0.0; 3]))
            .await
            .unwrap();
        assert!(matches!(verification, Verification::Unrecognized { .. }));
    }

    #[test]
    fn test_spawn_fails_fast_on_corrupt_storage() {
        let storage = MemoryPersistence::with_blob("{{{");
        assert!(matches!(
            spawn_registry(storage, config()),
            Err(WorkerError::Registry(RegistryError::Persistence(_)))
        ));
    }
}
