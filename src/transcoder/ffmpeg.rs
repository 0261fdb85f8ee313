//! ffmpeg/ffprobe backed transcoder.

use crate::config::TranscoderConfig;
use crate::error::{ChunkscribeError, Result};
use crate::transcoder::command::{CommandRunner, TokioCommandRunner};
use crate::transcoder::{ExtractRequest, MediaInfo, Transcoder};
use serde::Deserialize;
use std::ffi::OsString;
use std::path::Path;

/// Transcoder that shells out to `ffprobe` and `ffmpeg`.
pub struct FfmpegTranscoder<R: CommandRunner = TokioCommandRunner> {
    runner: R,
    ffmpeg: String,
    ffprobe: String,
}

impl FfmpegTranscoder<TokioCommandRunner> {
    /// Create a transcoder using the executables named in `config`.
    pub fn new(config: &TranscoderConfig) -> Self {
        Self::with_runner(TokioCommandRunner::new(), config)
    }
}

impl<R: CommandRunner> FfmpegTranscoder<R> {
    pub fn with_runner(runner: R, config: &TranscoderConfig) -> Self {
        Self {
            runner,
            ffmpeg: config.ffmpeg.clone(),
            ffprobe: config.ffprobe.clone(),
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }
}

#[derive(Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Arguments asking ffprobe for the container duration as JSON.
///
/// The input always follows `-i` so a file name starting with `-` is never
/// read as an option.
pub fn probe_args(input: &Path) -> Vec<OsString> {
    vec![
        "-v".into(),
        "error".into(),
        "-show_entries".into(),
        "format=duration".into(),
        "-of".into(),
        "json".into(),
        "-i".into(),
        input.into(),
    ]
}

/// Arguments extracting one time range as mono FLAC at the requested rate.
///
/// `-ss` before `-i` seeks in the input instead of decoding up to `start`.
pub fn extract_args(input: &Path, request: &ExtractRequest, output: &Path) -> Vec<OsString> {
    vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-y".into(),
        "-ss".into(),
        format_seconds(request.start).into(),
        "-t".into(),
        format_seconds(request.duration).into(),
        "-i".into(),
        input.into(),
        "-vn".into(),
        "-ac".into(),
        "1".into(),
        "-ar".into(),
        request.sample_rate.to_string().into(),
        "-f".into(),
        "flac".into(),
        output.into(),
    ]
}

fn format_seconds(secs: f64) -> String {
    format!("{secs:.3}")
}

/// Parse `ffprobe -of json` output into [`MediaInfo`].
pub fn parse_probe_output(stdout: &str) -> Result<MediaInfo> {
    let output: ProbeOutput = serde_json::from_str(stdout)
        .map_err(|e| ChunkscribeError::transcode(format!("Failed to parse ffprobe output: {e}")))?;

    let raw = output
        .format
        .duration
        .ok_or_else(|| ChunkscribeError::transcode("ffprobe reported no duration"))?;

    let duration: f64 = raw.trim().parse().map_err(|e| {
        ChunkscribeError::transcode(format!("Invalid duration '{raw}' from ffprobe: {e}"))
    })?;

    if !duration.is_finite() || duration < 0.0 {
        return Err(ChunkscribeError::transcode(format!(
            "Invalid duration '{raw}' from ffprobe"
        )));
    }

    Ok(MediaInfo { duration })
}

#[async_trait::async_trait]
impl<R: CommandRunner> Transcoder for FfmpegTranscoder<R> {
    async fn probe(&self, input: &Path) -> Result<MediaInfo> {
        let stdout = self.runner.run(&self.ffprobe, &probe_args(input)).await?;
        parse_probe_output(&stdout)
    }

    async fn extract_segment(
        &self,
        input: &Path,
        request: &ExtractRequest,
        output: &Path,
    ) -> Result<()> {
        self.runner
            .run(&self.ffmpeg, &extract_args(input, request, output))
            .await
            .map(|_| ())
    }

    fn name(&self) -> &str {
        &self.ffmpeg
    }
}
