//! Shared data models for the restreamer service.
//!
//! This crate provides Serde-serializable types for:
//! - Stream keys derived from source specifiers
//! - Candidate source lists
//! - Worker lifecycle states and snapshots
//! - The dispatcher response payload

pub mod error;
pub mod key;
pub mod response;
pub mod source;
pub mod worker_state;

// Re-export common types
pub use error::{ModelError, ModelResult};
pub use key::StreamKey;
pub use response::{StreamResponse, StreamStatus};
pub use source::SourceList;
pub use worker_state::{WorkerSnapshot, WorkerState};
