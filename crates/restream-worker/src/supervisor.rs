//! Stream lifecycle service used by the HTTP layer.

use std::collections::HashMap;
use std::sync::Arc;

use restream_media::{HlsOutput, Transcoder};
use restream_models::{SourceList, StreamKey, WorkerSnapshot};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

use crate::artifacts::ArtifactStore;
use crate::config::SupervisorConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::metrics;
use crate::registry::Registry;
use crate::retry::FallbackPolicy;
use crate::worker::Worker;

/// Outcome of [`StreamSupervisor::ensure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ensured {
    /// A new worker was registered and started.
    Created(StreamKey),
    /// A worker for the key was already running.
    Existing(StreamKey),
}

impl Ensured {
    pub fn key(&self) -> &StreamKey {
        match self {
            Ensured::Created(key) | Ensured::Existing(key) => key,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Ensured::Created(_))
    }
}

/// Owns the registry, the output directories and the transcoder.
pub struct StreamSupervisor {
    registry: Registry,
    artifacts: ArtifactStore,
    transcoder: Arc<dyn Transcoder>,
    config: SupervisorConfig,
    /// One lock per key, held across a stop or create and its directory
    /// work. Only the map lookup is shared between keys.
    key_locks: Mutex<HashMap<StreamKey, Arc<Mutex<()>>>>,
}

impl StreamSupervisor {
    pub fn new(config: SupervisorConfig, transcoder: Arc<dyn Transcoder>) -> Self {
        Self {
            registry: Registry::new(),
            artifacts: ArtifactStore::new(config.output_root.clone()),
            transcoder,
            config,
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Clear the output root. Called once before serving.
    pub async fn prepare(&self) -> WorkerResult<()> {
        self.artifacts.reset().await
    }

    /// Reuse the worker for `sources` or create one.
    pub async fn ensure(&self, sources: &SourceList) -> WorkerResult<Ensured> {
        let key = sources.key();
        if self.registry.lookup(&key).await.is_some() {
            return Ok(Ensured::Existing(key));
        }

        let guard = self.lock_key(&key).await;
        let result = match self.registry.lookup(&key).await {
            Some(_) => Ok(Ensured::Existing(key.clone())),
            None => self.create_locked(sources).await.map(Ensured::Created),
        };
        self.unlock_key(&key, guard).await;
        result
    }

    /// Stop the worker for `key` and remove its directory.
    pub async fn stop(&self, key: &StreamKey) -> WorkerResult<()> {
        let guard = self.lock_key(key).await;
        let result = self.stop_locked(key).await;
        self.unlock_key(key, guard).await;
        result
    }

    /// Stop the worker for `sources` if any, then create a fresh one.
    ///
    /// The old process group is dead before the new worker is registered.
    pub async fn restart(&self, sources: &SourceList) -> WorkerResult<StreamKey> {
        let key = sources.key();
        let guard = self.lock_key(&key).await;
        let result = self.restart_locked(&key, sources).await;
        self.unlock_key(&key, guard).await;
        result
    }

    /// Snapshots of all registered workers.
    pub async fn list(&self) -> Vec<WorkerSnapshot> {
        let mut snapshots = Vec::new();
        for worker in self.registry.workers().await {
            snapshots.push(worker.snapshot().await);
        }
        snapshots
    }

    /// Stop every worker. Used on shutdown.
    pub async fn shutdown(&self) {
        let workers = self.registry.workers().await;
        info!("Stopping {} stream(s)", workers.len());

        for worker in workers {
            let key = worker.key();
            let guard = self.lock_key(key).await;
            match self.stop_locked(key).await {
                Ok(()) => {}
                // Stopped by a concurrent request in the meantime.
                Err(e) if e.is_not_found() => {}
                Err(e) => warn!(stream_key = %key, "Failed to stop stream: {}", e),
            }
            self.unlock_key(key, guard).await;
        }
    }

    /// Output layout for `key`.
    pub fn output(&self, key: &StreamKey) -> HlsOutput {
        self.artifacts.output(key)
    }

    /// Whether the transcoder binary can be launched.
    pub fn transcoder_available(&self) -> bool {
        self.transcoder.available()
    }

    /// Number of registered workers.
    pub async fn active_count(&self) -> usize {
        self.registry.len().await
    }

    async fn lock_key(&self, key: &StreamKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.key_locks.lock().await;
            Arc::clone(locks.entry(key.clone()).or_default())
        };
        lock.lock_owned().await
    }

    /// Release a key lock and forget it once nobody else is waiting on it.
    async fn unlock_key(&self, key: &StreamKey, guard: OwnedMutexGuard<()>) {
        drop(guard);
        let mut locks = self.key_locks.lock().await;
        if locks.get(key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(key);
        }
    }

    async fn restart_locked(
        &self,
        key: &StreamKey,
        sources: &SourceList,
    ) -> WorkerResult<StreamKey> {
        match self.stop_locked(key).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                info!(stream_key = %key, "Restart of unknown stream, creating it");
            }
            Err(e) => return Err(e),
        }
        self.create_locked(sources).await
    }

    async fn create_locked(&self, sources: &SourceList) -> WorkerResult<StreamKey> {
        let key = sources.key();
        let worker = Arc::new(Worker::new(
            sources.clone(),
            self.artifacts.output(&key),
            FallbackPolicy::new(self.config.short_backoff, self.config.long_backoff),
            self.config.crash_log_limit,
        ));

        self.registry.insert(key.clone(), Arc::clone(&worker)).await?;

        if let Err(e) = self.artifacts.create(&key).await {
            self.registry.remove_if_same(&key, &worker).await;
            return Err(e);
        }

        worker.start(Arc::clone(&self.transcoder)).await;
        metrics::set_active_workers(self.registry.len().await);

        info!(
            stream_key = %key,
            sources = sources.len(),
            "Stream created"
        );
        Ok(key)
    }

    async fn stop_locked(&self, key: &StreamKey) -> WorkerResult<()> {
        let worker = self
            .registry
            .lookup(key)
            .await
            .ok_or_else(|| WorkerError::NotFound(key.clone()))?;

        worker.stop().await;
        self.registry.remove_if_same(key, &worker).await;
        metrics::set_active_workers(self.registry.len().await);

        self.artifacts.remove(key).await
    }
}
