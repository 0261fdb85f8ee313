//! Per-call recognition options.

use crate::config::RecognitionConfig;
use crate::defaults::SPAN_TOLERANCE_SECS;
use crate::error::{ChunkscribeError, Result};
use std::path::{Path, PathBuf};

/// Everything one `recognize` call needs to know about its input.
///
/// Built once per call and never mutated afterwards. Converting a bare path
/// (`"talk.mp4".into()`) applies the built-in defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionOptions {
    pub file: PathBuf,
    /// Start times in seconds; `None` tiles the file with fixed-length segments.
    pub explicit_splits: Option<Vec<f64>>,
    pub max_segment_duration: f64,
    /// Extra attempts after a malformed service response.
    pub max_retries: u32,
    pub max_concurrency: usize,
    pub language: String,
    pub sample_rate: u32,
}

impl RecognitionOptions {
    /// Options for `file` with the built-in defaults.
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self::with_config(file, &RecognitionConfig::default())
    }

    /// Options for `file` taking every default from `config`.
    pub fn with_config(file: impl Into<PathBuf>, config: &RecognitionConfig) -> Self {
        Self {
            file: file.into(),
            explicit_splits: None,
            max_segment_duration: config.max_segment_duration,
            max_retries: config.max_retries,
            max_concurrency: config.max_concurrency,
            language: config.language.clone(),
            sample_rate: config.sample_rate,
        }
    }

    pub fn with_splits(mut self, splits: Vec<f64>) -> Self {
        self.explicit_splits = Some(splits);
        self
    }

    pub fn with_max_segment_duration(mut self, secs: f64) -> Self {
        self.max_segment_duration = secs;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = rate;
        self
    }

    /// Reject values no run could succeed with.
    ///
    /// Split points are checked by the planner, once the duration is known.
    pub fn validate(&self) -> Result<()> {
        if self.file.as_os_str().is_empty() {
            return Err(ChunkscribeError::config("no input file specified"));
        }
        if self.max_concurrency == 0 {
            return Err(ChunkscribeError::config(
                "max_concurrency must be at least 1",
            ));
        }
        if !self.max_segment_duration.is_finite()
            || self.max_segment_duration <= SPAN_TOLERANCE_SECS
        {
            return Err(ChunkscribeError::config(format!(
                "max_segment_duration must be longer than {SPAN_TOLERANCE_SECS}s, got {}",
                self.max_segment_duration
            )));
        }
        if self.sample_rate == 0 {
            return Err(ChunkscribeError::config("sample_rate must be positive"));
        }
        if self.language.trim().is_empty() {
            return Err(ChunkscribeError::config("language must not be empty"));
        }
        Ok(())
    }
}

impl From<PathBuf> for RecognitionOptions {
    fn from(file: PathBuf) -> Self {
        Self::new(file)
    }
}

impl From<&Path> for RecognitionOptions {
    fn from(file: &Path) -> Self {
        Self::new(file)
    }
}

impl From<&str> for RecognitionOptions {
    fn from(file: &str) -> Self {
        Self::new(file)
    }
}

impl From<String> for RecognitionOptions {
    fn from(file: String) -> Self {
        Self::new(file)
    }
}
