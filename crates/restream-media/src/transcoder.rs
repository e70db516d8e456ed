//! Transcoder seam between the supervisor and the external tool.

use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::error::{MediaError, MediaResult};
use crate::hls::{HlsOutput, TranscodeSettings};

/// Produces the command for one transcoder launch.
///
/// The supervisor spawns the returned command in its own process group,
/// waits for it to exit and decides whether to relaunch.
pub trait Transcoder: Send + Sync {
    /// Build the command that reads `source` and writes HLS into `output`.
    fn command(&self, source: &str, output: &HlsOutput) -> Command;

    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Whether the external tool can be launched at all.
    fn available(&self) -> bool {
        true
    }
}

/// The production transcoder: ffmpeg with the live HLS template.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
    settings: TranscodeSettings,
}

impl FfmpegTranscoder {
    pub fn new(settings: TranscodeSettings) -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            settings,
        }
    }

    /// Create from environment variables (`FFMPEG_PATH`, `HLS_*`).
    pub fn from_env() -> Self {
        let program = std::env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string());
        Self::new(TranscodeSettings::from_env()).with_program(program)
    }

    /// Use a specific ffmpeg binary.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn settings(&self) -> &TranscodeSettings {
        &self.settings
    }

    /// Resolve the configured binary on PATH.
    pub fn check(&self) -> MediaResult<PathBuf> {
        which::which(&self.program).map_err(|_| MediaError::FfmpegNotFound)
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new(TranscodeSettings::default())
    }
}

impl Transcoder for FfmpegTranscoder {
    fn command(&self, source: &str, output: &HlsOutput) -> Command {
        let args = self.settings.build_command(source, output).build_os_args();
        let mut command = Command::new(&self.program);
        command.args(args);
        command
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn available(&self) -> bool {
        self.check().is_ok()
    }
}
