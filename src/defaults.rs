//! Default configuration constants for chunkscribe.
//!
//! Shared by the config file, the per-call recognition options and the CLI so
//! that every entry point agrees on the same defaults.

/// Default maximum segment duration in seconds.
///
/// The streaming service rejects or truncates long uploads; 15 seconds keeps
/// every upload comfortably inside its limits.
pub const MAX_SEGMENT_DURATION_SECS: f64 = 15.0;

/// Default number of extra attempts after a malformed service response.
pub const MAX_RETRIES: u32 = 1;

/// Default number of segments transcoded and recognized at the same time.
pub const MAX_CONCURRENCY: usize = 20;

/// Default sample rate of the FLAC audio sent to the service, in Hz.
pub const SAMPLE_RATE: u32 = 44100;

/// Default language tag for recognition.
pub const DEFAULT_LANGUAGE: &str = "en-us";

/// Base URL of the full-duplex speech service.
pub const SERVICE_ENDPOINT: &str = "https://www.google.com/speech-api/full-duplex/v1";

/// Client identifier sent with every upload.
pub const SERVICE_CLIENT: &str = "chromium";

/// Per-attempt timeout for each of the two service streams, in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Tolerance used when comparing segment spans, in seconds.
///
/// Spans within this distance of the maximum are not split again, and
/// segments no longer than this are dropped from a plan.
pub const SPAN_TOLERANCE_SECS: f64 = 0.001;

/// Upper bound on the number of segments in one plan.
///
/// Ten days of audio at the default segment length.
pub const MAX_SEGMENTS: usize = 57_600;

/// Default ffmpeg executable.
pub const FFMPEG: &str = "ffmpeg";

/// Default ffprobe executable.
pub const FFPROBE: &str = "ffprobe";

/// Prefix for temporary segment files.
pub const SCRATCH_PREFIX: &str = "chunkscribe-";

/// Suffix for temporary segment files.
pub const SCRATCH_SUFFIX: &str = ".flac";
