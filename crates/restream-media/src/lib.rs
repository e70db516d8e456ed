//! FFmpeg CLI wrapper for live HLS transcoding.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - The fixed live HLS argument template and output layout
//! - The `Transcoder` seam used by the stream supervisor
//! - Spawning transcoders in their own process group and killing the whole group

pub mod command;
pub mod error;
pub mod hls;
pub mod process;
pub mod transcoder;

pub use command::FfmpegCommand;
pub use error::{MediaError, MediaResult};
pub use hls::{HlsOutput, TranscodeSettings, PLAYLIST_NAME, SEGMENT_PATTERN};
pub use process::{spawn_in_group, ProcessGroup, SpawnedProcess};
pub use transcoder::{FfmpegTranscoder, Transcoder};
