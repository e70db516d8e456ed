//! Per-stream output directories.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use restream_media::HlsOutput;
use restream_models::StreamKey;
use tracing::info;

use crate::error::{WorkerError, WorkerResult};

/// Owns the output root and the `<root>/<key>` directory of every stream.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for `key`.
    pub fn dir(&self, key: &StreamKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    /// HLS output layout for `key`.
    pub fn output(&self, key: &StreamKey) -> HlsOutput {
        HlsOutput::new(self.dir(key))
    }

    /// Empty the output root, creating it if needed.
    ///
    /// Leftovers from a previous run are never served.
    pub async fn reset(&self) -> WorkerResult<()> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => info!("Cleared output root: {}", self.root.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(WorkerError::Io(e)),
        }
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Create the directory for `key`.
    pub async fn create(&self, key: &StreamKey) -> WorkerResult<HlsOutput> {
        let output = self.output(key);
        tokio::fs::create_dir_all(output.dir())
            .await
            .map_err(|e| WorkerError::artifacts(key, e))?;
        Ok(output)
    }

    /// Recursively remove the directory for `key`. A missing directory is fine.
    pub async fn remove(&self, key: &StreamKey) -> WorkerResult<()> {
        let dir = self.dir(key);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                info!("Removed stream directory: {}", dir.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(WorkerError::artifacts(key, e)),
        }
    }

    /// Whether the root exists and accepts new files.
    pub async fn is_writable(&self) -> bool {
        let probe = self.root.join(".ready-probe");
        match tokio::fs::write(&probe, b"").await {
            Ok(()) => {
                let _ = tokio::fs::remove_file(&probe).await;
                true
            }
            Err(_) => false,
        }
    }
}
