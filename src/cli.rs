//! Command-line interface for chunkscribe
//!
//! Provides argument parsing using clap derive macros.

use crate::config::RecognitionOverrides;
use crate::output::OutputFormat;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Transcribe long recordings through a streaming speech service
#[derive(Parser, Debug)]
#[command(
    name = "chunkscribe",
    version,
    about = "Transcribe long recordings through a streaming speech service"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose logging (-v: progress, -vv: per-segment diagnostics)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transcribe a media file
    Recognize(RecognizeArgs),

    /// Check system dependencies and credentials
    Check,

    /// Inspect configuration
    Config {
        /// Action to perform
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Args, Debug)]
pub struct RecognizeArgs {
    /// Audio or video file to transcribe
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Segment start times in seconds (comma-separated or repeated)
    #[arg(long, value_name = "SECS", num_args = 1.., value_delimiter = ',')]
    pub split: Option<Vec<f64>>,

    /// Maximum segment length in seconds
    #[arg(long, value_name = "SECS")]
    pub max_segment: Option<f64>,

    /// Extra attempts per segment after an unusable service response
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,

    /// Segments processed at the same time
    #[arg(long, short = 'j', value_name = "N")]
    pub concurrency: Option<usize>,

    /// Language tag sent to the service (e.g. en-us, it-ch)
    #[arg(long, short = 'l', value_name = "TAG")]
    pub language: Option<String>,

    /// Sample rate of the audio sent to the service
    #[arg(long, value_name = "HZ")]
    pub sample_rate: Option<u32>,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Per-request timeout. Examples: 60, 30s, 2m
    #[arg(long, value_name = "DURATION", value_parser = parse_timeout_secs)]
    pub timeout: Option<u64>,

    /// Speech service API key (overrides config and CHUNKSCRIBE_API_KEY)
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,
}

impl RecognizeArgs {
    /// Flags that override the `[recognition]` config section.
    pub fn overrides(&self) -> RecognitionOverrides {
        RecognitionOverrides {
            max_segment_duration: self.max_segment,
            max_retries: self.retries,
            max_concurrency: self.concurrency,
            language: self.language.clone(),
            sample_rate: self.sample_rate,
        }
    }
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the configuration file path
    Path,
}

/// Parse a timeout string into seconds.
///
/// Supports any duration format accepted by `humantime` as well as bare
/// numbers (seconds).
fn parse_timeout_secs(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let secs = match s.parse::<u64>() {
        Ok(secs) => secs,
        Err(_) => humantime::parse_duration(s)
            .map(|d| d.as_secs())
            .map_err(|e| e.to_string())?,
    };
    if secs == 0 {
        return Err("timeout must be at least one second".to_string());
    }
    Ok(secs)
}
