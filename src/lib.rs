//! chunkscribe - transcribe long recordings through a streaming speech service
//!
//! The input is cut into short segments, each segment is transcoded to mono
//! FLAC and sent over a paired upload/download exchange, and the per-segment
//! transcripts are merged in time order.
//!
//! ```no_run
//! # async fn demo() -> chunkscribe::Result<()> {
//! use chunkscribe::{Config, RecognitionOptions, Recognizer};
//!
//! let config = Config::default().with_env_overrides();
//! let recognizer = Recognizer::from_config(&config)?;
//! let transcript = recognizer
//!     .recognize(RecognitionOptions::new("talk.mp4").with_language("en-us"))
//!     .await?;
//! println!("{}", transcript.text);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
#[cfg(feature = "cli")]
pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod options;
pub mod output;
pub mod pipeline;
pub mod segment;
pub mod speech;
pub mod transcoder;
pub mod transcript;

// Boundaries (transcode → exchange)
pub use speech::{HttpTransport, MockTransport, StreamTransport};
pub use transcoder::{FfmpegTranscoder, MockTranscoder, Transcoder};

// Pipeline
pub use pipeline::Recognizer;
pub use segment::{SegmentDescriptor, plan};

// Data
pub use options::RecognitionOptions;
pub use output::{OutputFormat, render};
pub use transcript::{FinalTranscript, SegmentResult};

// Error handling
pub use error::{ChunkscribeError, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
