//! Rendering of finished transcripts for stdout.

use crate::error::{ChunkscribeError, Result};
use crate::transcript::FinalTranscript;

/// How `recognize` prints its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputFormat {
    /// The merged text only
    #[default]
    Text,
    /// Segments and merged text as pretty JSON
    Json,
    /// One `[start - end] text` line per segment
    Timed,
}

/// Render `transcript` in `format`, without a trailing newline.
pub fn render(transcript: &FinalTranscript, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(transcript.text.clone()),
        OutputFormat::Json => serde_json::to_string_pretty(transcript)
            .map_err(|e| ChunkscribeError::Other(format!("Failed to encode transcript: {e}"))),
        OutputFormat::Timed => {
            let mut out = String::new();
            for (i, segment) in transcript.segments.iter().enumerate() {
                if i > 0 {
                    out.push('\n');
                }
                out.push_str(&format!(
                    "[{} - {}] {}",
                    timestamp(segment.start),
                    timestamp(segment.start + segment.duration),
                    segment.text
                ));
            }
            Ok(out)
        }
    }
}

/// Format seconds as `HH:MM:SS.mmm`.
fn timestamp(secs: f64) -> String {
    let millis = (secs.max(0.0) * 1000.0).round() as u64;
    let (hours, rest) = (millis / 3_600_000, millis % 3_600_000);
    let (minutes, rest) = (rest / 60_000, rest % 60_000);
    let (seconds, millis) = (rest / 1000, rest % 1000);
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}
