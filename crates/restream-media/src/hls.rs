//! Live HLS output layout and encoding template.

use std::path::{Path, PathBuf};

use crate::command::FfmpegCommand;

/// Playlist file written into every stream directory.
pub const PLAYLIST_NAME: &str = "index.m3u8";

/// Segment file pattern handed to ffmpeg.
pub const SEGMENT_PATTERN: &str = "seg_%03d.ts";

/// Output directory of a single stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HlsOutput {
    dir: PathBuf,
}

impl HlsOutput {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the HLS playlist.
    pub fn playlist_path(&self) -> PathBuf {
        self.dir.join(PLAYLIST_NAME)
    }

    /// Path pattern for segment files.
    pub fn segment_pattern(&self) -> PathBuf {
        self.dir.join(SEGMENT_PATTERN)
    }

    /// Whether ffmpeg has written the playlist yet.
    pub async fn playlist_exists(&self) -> bool {
        tokio::fs::try_exists(self.playlist_path())
            .await
            .unwrap_or(false)
    }
}

/// Encoding and segmenting parameters for the live HLS template.
///
/// Defaults produce a 480p/30fps H.264 + AAC ladder rung with 4 second
/// segments and a 5 entry sliding playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeSettings {
    /// Output height; width keeps aspect ratio
    pub height: u32,
    pub frame_rate: u32,
    pub video_codec: String,
    pub preset: String,
    pub tune: String,
    pub video_bitrate: String,
    pub max_rate: String,
    pub buffer_size: String,
    /// Keyframe interval in frames
    pub gop: u32,
    pub audio_codec: String,
    pub audio_bitrate: String,
    pub audio_sample_rate: u32,
    /// Maximum delay between input reconnect attempts, in seconds
    pub reconnect_delay_max: u32,
    /// Target segment duration in seconds
    pub segment_time: u32,
    /// Number of segments kept in the playlist
    pub list_size: u32,
    pub log_level: String,
}

impl Default for TranscodeSettings {
    fn default() -> Self {
        Self {
            height: 480,
            frame_rate: 30,
            video_codec: "libx264".to_string(),
            preset: "ultrafast".to_string(),
            tune: "zerolatency".to_string(),
            video_bitrate: "800k".to_string(),
            max_rate: "1000k".to_string(),
            buffer_size: "2000k".to_string(),
            gop: 60,
            audio_codec: "aac".to_string(),
            audio_bitrate: "64k".to_string(),
            audio_sample_rate: 44100,
            reconnect_delay_max: 2,
            segment_time: 4,
            list_size: 5,
            log_level: "error".to_string(),
        }
    }
}

impl TranscodeSettings {
    /// Create settings from environment variables.
    ///
    /// Only the segmenting parameters are configurable; the encoding ladder
    /// is fixed.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            segment_time: std::env::var("HLS_SEGMENT_TIME")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.segment_time),
            list_size: std::env::var("HLS_LIST_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.list_size),
            ..defaults
        }
    }

    /// Build the ffmpeg command that transcodes `source` into `output`.
    pub fn build_command(&self, source: &str, output: &HlsOutput) -> FfmpegCommand {
        FfmpegCommand::new(source, output.playlist_path())
            .log_level(self.log_level.clone())
            .reconnect(self.reconnect_delay_max)
            .video_filter(format!("scale=-2:{}", self.height))
            .frame_rate(self.frame_rate)
            .video_codec(self.video_codec.clone())
            .preset(self.preset.clone())
            .tune(self.tune.clone())
            .video_bitrate(
                self.video_bitrate.clone(),
                self.max_rate.clone(),
                self.buffer_size.clone(),
            )
            .gop(self.gop)
            .audio_codec(self.audio_codec.clone())
            .audio_bitrate(self.audio_bitrate.clone())
            .audio_sample_rate(self.audio_sample_rate)
            .format("hls")
            .output_arg("-hls_time")
            .output_arg(self.segment_time.to_string())
            .output_arg("-hls_list_size")
            .output_arg(self.list_size.to_string())
            .output_arg("-hls_flags")
            .output_arg("delete_segments+append_list")
            .output_arg("-hls_segment_filename")
            .output_path_arg(output.segment_pattern())
    }
}
