//! Key -> worker registry.
//!
//! The map lock guards map mutation only. Callers never hold it across
//! process control or filesystem work, and it is independent of every
//! worker's own lock.

use std::collections::HashMap;
use std::sync::Arc;

use restream_models::StreamKey;
use tokio::sync::RwLock;

use crate::error::{WorkerError, WorkerResult};
use crate::worker::Worker;

/// Concurrency-safe mapping from stream key to worker.
#[derive(Default)]
pub struct Registry {
    workers: RwLock<HashMap<StreamKey, Arc<Worker>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the worker for `key`.
    pub async fn lookup(&self, key: &StreamKey) -> Option<Arc<Worker>> {
        self.workers.read().await.get(key).cloned()
    }

    /// Insert a worker, failing if `key` is already taken.
    pub async fn insert(&self, key: StreamKey, worker: Arc<Worker>) -> WorkerResult<()> {
        let mut workers = self.workers.write().await;
        if workers.contains_key(&key) {
            return Err(WorkerError::AlreadyExists(key));
        }
        workers.insert(key, worker);
        Ok(())
    }

    /// Remove the entry for `key` if present.
    pub async fn remove(&self, key: &StreamKey) -> Option<Arc<Worker>> {
        self.workers.write().await.remove(key)
    }

    /// Remove the entry for `key` only if it is `worker`.
    ///
    /// Returns whether an entry was removed.
    pub async fn remove_if_same(&self, key: &StreamKey, worker: &Arc<Worker>) -> bool {
        let mut workers = self.workers.write().await;
        match workers.get(key) {
            Some(current) if Arc::ptr_eq(current, worker) => {
                workers.remove(key);
                true
            }
            _ => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.workers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.workers.read().await.is_empty()
    }

    /// Snapshot of all registered workers, ordered by key.
    pub async fn workers(&self) -> Vec<Arc<Worker>> {
        let workers = self.workers.read().await;
        let mut entries: Vec<_> = workers.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter().map(|(_, w)| Arc::clone(w)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::FallbackPolicy;
    use restream_media::HlsOutput;
    use restream_models::SourceList;
    use std::time::Duration;

    fn worker(specifier: &str) -> Arc<Worker> {
        let sources = SourceList::parse(specifier).unwrap();
        Arc::new(Worker::new(
            sources,
            HlsOutput::new("/tmp/unused"),
            FallbackPolicy::new(Duration::from_millis(1), Duration::from_millis(1)),
            3,
        ))
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let registry = Registry::new();
        let w = worker("http://a/1");
        let key = w.key().clone();

        assert!(registry.lookup(&key).await.is_none());
        registry.insert(key.clone(), Arc::clone(&w)).await.unwrap();

        let found = registry.lookup(&key).await.unwrap();
        assert!(Arc::ptr_eq(&found, &w));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_insert_existing_key_fails() {
        let registry = Registry::new();
        let first = worker("http://a/1");
        let second = worker("http://a/1");
        let key = first.key().clone();

        registry.insert(key.clone(), Arc::clone(&first)).await.unwrap();
        let err = registry.insert(key.clone(), second).await.unwrap_err();
        assert!(err.is_conflict());

        // The original entry is untouched
        let found = registry.lookup(&key).await.unwrap();
        assert!(Arc::ptr_eq(&found, &first));
    }

    #[tokio::test]
    async fn test_remove_missing_is_noop() {
        let registry = Registry::new();
        assert!(registry.remove(&StreamKey::derive("nothing")).await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_remove_if_same_spares_successor() {
        let registry = Registry::new();
        let old = worker("http://a/1");
        let new = worker("http://a/1");
        let key = old.key().clone();

        registry.insert(key.clone(), Arc::clone(&new)).await.unwrap();
        assert!(!registry.remove_if_same(&key, &old).await);
        assert!(registry.lookup(&key).await.is_some());

        assert!(registry.remove_if_same(&key, &new).await);
        assert!(registry.lookup(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_inserts_admit_exactly_one() {
        let registry = Arc::new(Registry::new());
        let key = StreamKey::derive("http://a/1");

        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = Arc::clone(&registry);
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                registry.insert(key, worker("http://a/1")).await.is_ok()
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
        assert_eq!(registry.len().await, 1);
    }
}
