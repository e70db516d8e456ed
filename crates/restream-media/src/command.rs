//! FFmpeg command builder.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Builder for FFmpeg commands.
///
/// The input is a URL rather than a local path; live sources are read over
/// the network.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input URL
    input: String,
    /// Output file path
    output: PathBuf,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i); may carry non-UTF-8 paths
    output_args: Vec<OsString>,
    /// Whether to pass -hide_banner
    hide_banner: bool,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl Into<String>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.into(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            hide_banner: true,
            log_level: "error".to_string(),
        }
    }

    /// Add input arguments (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add multiple input arguments.
    pub fn input_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        let arg: String = arg.into();
        self.output_args.push(arg.into());
        self
    }

    /// Add an output path argument, kept byte for byte.
    pub fn output_path_arg(mut self, path: impl AsRef<Path>) -> Self {
        self.output_args.push(path.as_ref().as_os_str().to_owned());
        self
    }

    /// Reconnect to the input on errors, on EOF and for streamed inputs.
    pub fn reconnect(self, max_delay_secs: u32) -> Self {
        self.input_args([
            "-reconnect",
            "1",
            "-reconnect_at_eof",
            "1",
            "-reconnect_streamed",
            "1",
            "-reconnect_delay_max",
        ])
        .input_arg(max_delay_secs.to_string())
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set output frame rate.
    pub fn frame_rate(self, fps: u32) -> Self {
        self.output_arg("-r").output_arg(fps.to_string())
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set preset.
    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    /// Set encoder tuning.
    pub fn tune(self, tune: impl Into<String>) -> Self {
        self.output_arg("-tune").output_arg(tune)
    }

    /// Set target video bitrate with its rate-control ceiling and buffer.
    pub fn video_bitrate(
        self,
        bitrate: impl Into<String>,
        max_rate: impl Into<String>,
        buffer_size: impl Into<String>,
    ) -> Self {
        self.output_arg("-b:v")
            .output_arg(bitrate)
            .output_arg("-maxrate")
            .output_arg(max_rate)
            .output_arg("-bufsize")
            .output_arg(buffer_size)
    }

    /// Set keyframe interval in frames.
    pub fn gop(self, frames: u32) -> Self {
        self.output_arg("-g").output_arg(frames.to_string())
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Set audio bitrate.
    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    /// Set audio sample rate.
    pub fn audio_sample_rate(self, hz: u32) -> Self {
        self.output_arg("-ar").output_arg(hz.to_string())
    }

    /// Set output container format.
    pub fn format(self, format: impl Into<String>) -> Self {
        self.output_arg("-f").output_arg(format)
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Input URL.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Build the command arguments, lossily converting any non-UTF-8 path.
    pub fn build_args(&self) -> Vec<String> {
        self.build_os_args()
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    /// Build the arguments as OS strings, keeping non-UTF-8 paths intact.
    pub fn build_os_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();

        if self.hide_banner {
            args.push("-hide_banner".into());
        }

        // Log level
        args.push("-loglevel".into());
        args.push(OsString::from(&self.log_level));

        // Input args
        args.extend(self.input_args.iter().map(OsString::from));

        // Input URL
        args.push("-i".into());
        args.push(OsString::from(&self.input));

        // Output args
        args.extend(self.output_args.iter().cloned());

        // Output file
        args.push(self.output.clone().into_os_string());

        args
    }
}
