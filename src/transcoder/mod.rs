//! Media transcoding boundary.
//!
//! The pipeline only needs two things from a transcoder: the duration of the
//! input, and a FLAC file holding one time range of it. `FfmpegTranscoder`
//! provides both through the ffmpeg command-line tools.

pub mod command;
pub mod ffmpeg;

pub use command::{CommandRunner, MockCommandRunner, TokioCommandRunner};
pub use ffmpeg::FfmpegTranscoder;

use crate::error::{ChunkscribeError, Result};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Container-level facts about an input file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaInfo {
    /// Total duration in seconds.
    pub duration: f64,
}

/// One time range to extract, downmixed to mono at `sample_rate`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractRequest {
    pub start: f64,
    pub duration: f64,
    pub sample_rate: u32,
}

/// Trait for media inspection and segment extraction.
///
/// Implementations must allow concurrent calls on the same input file.
#[async_trait::async_trait]
pub trait Transcoder: Send + Sync {
    /// Read the total duration of `input`.
    async fn probe(&self, input: &Path) -> Result<MediaInfo>;

    /// Write `request`'s time range of `input` to `output` as FLAC.
    ///
    /// `output` may already exist and is overwritten.
    async fn extract_segment(
        &self,
        input: &Path,
        request: &ExtractRequest,
        output: &Path,
    ) -> Result<()>;

    /// Human-readable name for logs.
    fn name(&self) -> &str;
}

/// Mock transcoder for testing
///
/// Writes a few placeholder bytes for every extracted segment and tracks how
/// many extractions run at once.
pub struct MockTranscoder {
    duration: f64,
    probe_fails: bool,
    failing_starts: Vec<f64>,
    delay: Box<dyn Fn(f64) -> Duration + Send + Sync>,
    audio: Vec<u8>,
    active: AtomicUsize,
    max_active: AtomicUsize,
    requests: Mutex<Vec<ExtractRequest>>,
    outputs: Mutex<Vec<PathBuf>>,
}

impl MockTranscoder {
    /// Create a mock reporting `duration` seconds of media.
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            probe_fails: false,
            failing_starts: Vec::new(),
            delay: Box::new(|_| Duration::ZERO),
            audio: b"fLaC-mock-audio".to_vec(),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            outputs: Mutex::new(Vec::new()),
        }
    }

    /// Make `probe` fail.
    pub fn with_probe_failure(mut self) -> Self {
        self.probe_fails = true;
        self
    }

    /// Make extraction of the segment starting at `start` fail.
    pub fn with_failure_at(mut self, start: f64) -> Self {
        self.failing_starts.push(start);
        self
    }

    /// Hold every extraction for `delay`.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.with_delay_fn(move |_| delay)
    }

    /// Hold each extraction for a delay computed from its start time.
    pub fn with_delay_fn(mut self, delay: impl Fn(f64) -> Duration + Send + Sync + 'static) -> Self {
        self.delay = Box::new(delay);
        self
    }

    /// Bytes written to every output file.
    pub fn with_audio(mut self, audio: &[u8]) -> Self {
        self.audio = audio.to_vec();
        self
    }

    /// Highest number of extractions observed running at the same time.
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Extractions currently in flight.
    pub fn in_flight(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Every extraction request received, in call order.
    pub fn requests(&self) -> Vec<ExtractRequest> {
        lock(&self.requests).clone()
    }

    /// Every output path written to, in call order.
    pub fn outputs(&self) -> Vec<PathBuf> {
        lock(&self.outputs).clone()
    }
}

#[async_trait::async_trait]
impl Transcoder for MockTranscoder {
    async fn probe(&self, _input: &Path) -> Result<MediaInfo> {
        if self.probe_fails {
            return Err(ChunkscribeError::transcode("mock probe failure"));
        }
        Ok(MediaInfo {
            duration: self.duration,
        })
    }

    async fn extract_segment(
        &self,
        _input: &Path,
        request: &ExtractRequest,
        output: &Path,
    ) -> Result<()> {
        let _in_flight = InFlight::enter(&self.active, &self.max_active);
        lock(&self.requests).push(*request);
        lock(&self.outputs).push(output.to_path_buf());

        tokio::time::sleep((self.delay)(request.start)).await;

        if self.failing_starts.contains(&request.start) {
            return Err(ChunkscribeError::transcode(format!(
                "mock transcode failure at {}s",
                request.start
            )));
        }
        tokio::fs::write(output, &self.audio)
            .await
            .map_err(ChunkscribeError::from)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Counts one call as in flight until dropped, including when the call's future
/// is cancelled mid-await.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(active: &'a AtomicUsize, max_active: &AtomicUsize) -> Self {
        let now_active = active.fetch_add(1, Ordering::SeqCst) + 1;
        max_active.fetch_max(now_active, Ordering::SeqCst);
        Self(active)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
