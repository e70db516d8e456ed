//! Stream worker registry and transcoder supervision.
//!
//! This crate provides:
//! - The key -> worker registry enforcing one worker per stream
//! - Workers supervising one transcoder each, with cyclic source fallback
//! - Per-stream output directories (artifact store)
//! - The `StreamSupervisor` service used by the HTTP layer

pub mod artifacts;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod registry;
pub mod retry;
pub mod supervisor;
pub mod worker;

pub use artifacts::ArtifactStore;
pub use config::SupervisorConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::WorkerLogger;
pub use registry::Registry;
pub use retry::{FailureTracker, FallbackPolicy, FallbackStep};
pub use supervisor::{Ensured, StreamSupervisor};
pub use worker::Worker;
