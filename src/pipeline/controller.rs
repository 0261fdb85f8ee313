//! Top-level recognition: probe, plan, fan out, merge.

use crate::config::{Config, ServiceConfig};
use crate::error::{ChunkscribeError, Result};
use crate::options::RecognitionOptions;
use crate::pipeline::worker::{SegmentJob, SegmentWorker};
use crate::segment;
use crate::speech::{HttpTransport, ServiceEndpoint, StreamTransport, TranscriptFetcher};
use crate::transcoder::{FfmpegTranscoder, Transcoder};
use crate::transcript::{FinalTranscript, SegmentResult};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

/// Transcribes whole media files through the speech service.
///
/// Holds no per-call state, so one `Recognizer` can serve any number of
/// sequential or concurrent `recognize` calls.
pub struct Recognizer {
    transcoder: Arc<dyn Transcoder>,
    fetcher: Arc<TranscriptFetcher>,
    scratch_dir: Option<PathBuf>,
}

impl Recognizer {
    /// Create a recognizer from its two external boundaries.
    ///
    /// # Errors
    /// Returns `ChunkscribeError::Configuration` if `service` has no API key
    /// or an invalid endpoint. Nothing is sent over the network.
    pub fn new(
        transcoder: Arc<dyn Transcoder>,
        transport: Arc<dyn StreamTransport>,
        service: &ServiceConfig,
    ) -> Result<Self> {
        let endpoint = ServiceEndpoint::new(service)?;
        Ok(Self {
            transcoder,
            fetcher: Arc::new(TranscriptFetcher::new(transport, endpoint)),
            scratch_dir: None,
        })
    }

    /// Create a recognizer using ffmpeg and HTTP as configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        if config.service.timeout_secs == 0 {
            return Err(ChunkscribeError::config(
                "service.timeout_secs must be at least 1",
            ));
        }
        let transcoder = Arc::new(FfmpegTranscoder::new(&config.transcoder));
        let transport = Arc::new(HttpTransport::new(Duration::from_secs(
            config.service.timeout_secs,
        ))?);
        Ok(Self::new(transcoder, transport, &config.service)?
            .with_scratch_dir(config.transcoder.scratch_dir.clone()))
    }

    /// Directory for scratch FLAC files; `None` uses the system temp dir.
    pub fn with_scratch_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.scratch_dir = dir;
        self
    }

    /// Transcribe a media file.
    ///
    /// Segments are started in plan order with at most `max_concurrency` in
    /// flight. After the first segment failure no further segments are
    /// started; segments already running finish before the error is returned.
    ///
    /// # Errors
    /// - `ChunkscribeError::Configuration` for unusable options
    /// - `ChunkscribeError::InvalidSegmentPlan` for bad split points
    /// - the first segment error (`Transcode`, `Network`,
    ///   `RecognitionUnavailable`, `Io`)
    pub async fn recognize(
        &self,
        options: impl Into<RecognitionOptions>,
    ) -> Result<FinalTranscript> {
        let options = options.into();
        options.validate()?;

        let started = Instant::now();
        let media = self.transcoder.probe(&options.file).await?;
        let plan = segment::plan(
            media.duration,
            options.explicit_splits.as_deref(),
            options.max_segment_duration,
        )?;

        info!(
            file = %options.file.display(),
            duration = media.duration,
            segments = plan.len(),
            concurrency = options.max_concurrency,
            transcoder = self.transcoder.name(),
            "starting recognition"
        );

        let job = Arc::new(SegmentJob {
            input: options.file.clone(),
            language: options.language.clone(),
            sample_rate: options.sample_rate,
            max_retries: options.max_retries,
        });
        let worker = SegmentWorker::new(
            Arc::clone(&self.transcoder),
            Arc::clone(&self.fetcher),
            self.scratch_dir.clone(),
        );

        let limit = Arc::new(Semaphore::new(options.max_concurrency));
        let failed = Arc::new(AtomicBool::new(false));
        let mut tasks = JoinSet::new();

        for segment in plan {
            let permit = Arc::clone(&limit)
                .acquire_owned()
                .await
                .map_err(|e| ChunkscribeError::Other(format!("segment limiter closed: {e}")))?;

            // A failing task sets the flag before releasing its permit.
            if failed.load(Ordering::SeqCst) {
                debug!(start = segment.start, "not starting segment after failure");
                break;
            }

            let worker = worker.clone();
            let job = Arc::clone(&job);
            let failed = Arc::clone(&failed);
            tasks.spawn(async move {
                let outcome = worker.process(&job, segment).await;
                if outcome.is_err() {
                    failed.store(true, Ordering::SeqCst);
                }
                drop(permit);
                outcome
            });
        }

        let mut results = Vec::new();
        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            match flatten(joined) {
                Ok(result) => results.push(result),
                Err(e) if first_error.is_none() => first_error = Some(e),
                Err(e) => warn!(error = %e, "additional segment failure"),
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        let transcript = FinalTranscript::from_results(results);
        info!(
            segments = transcript.segments.len(),
            chars = transcript.text.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "recognition complete"
        );
        Ok(transcript)
    }
}

fn flatten(
    joined: std::result::Result<Result<SegmentResult>, JoinError>,
) -> Result<SegmentResult> {
    joined.map_err(|e| ChunkscribeError::Other(format!("segment task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::MockTransport;
    use crate::transcoder::MockTranscoder;
    use tempfile::TempDir;

    fn service() -> ServiceConfig {
        ServiceConfig {
            api_key: Some("test-key".to_string()),
            ..Default::default()
        }
    }

    fn recognizer(
        transcoder: Arc<MockTranscoder>,
        transport: Arc<MockTransport>,
        scratch: &TempDir,
    ) -> Recognizer {
        Recognizer::new(transcoder, transport, &service())
            .unwrap()
            .with_scratch_dir(Some(scratch.path().to_path_buf()))
    }

    #[test]
    fn test_new_requires_api_key() {
        let result = Recognizer::new(
            Arc::new(MockTranscoder::new(1.0)),
            Arc::new(MockTransport::new()),
            &ServiceConfig::default(),
        );
        assert!(matches!(result, Err(ChunkscribeError::Configuration { .. })));
    }

    #[test]
    fn test_from_config_rejects_zero_timeout() {
        let mut config = Config::default();
        config.service = ServiceConfig {
            timeout_secs: 0,
            ..service()
        };

        match Recognizer::from_config(&config) {
            Err(ChunkscribeError::Configuration { message }) => {
                assert!(message.contains("timeout_secs"), "unexpected message: {message}");
            }
            Err(other) => panic!("Expected Configuration error, got {other:?}"),
            Ok(_) => panic!("Expected Configuration error, got a recognizer"),
        }
    }

    #[test]
    fn test_from_config_requires_api_key() {
        let result = Recognizer::from_config(&Config::default());
        assert!(matches!(result, Err(ChunkscribeError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_merges_segments_in_start_order() {
        let scratch = TempDir::new().unwrap();
        let transcoder = Arc::new(MockTranscoder::new(45.0));
        let transport = Arc::new(
            MockTransport::new()
                .with_body(&crate::speech::recognition_body("one"))
                .with_body(&crate::speech::recognition_body("two"))
                .with_body(&crate::speech::recognition_body("three")),
        );
        let recognizer = recognizer(transcoder, transport, &scratch);

        let transcript = recognizer
            .recognize(RecognitionOptions::new("talk.mp4").with_max_concurrency(1))
            .await
            .unwrap();

        assert_eq!(transcript.text, "one two three ");
        let starts: Vec<f64> = transcript.segments.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![0.0, 15.0, 30.0]);
    }

    #[tokio::test]
    async fn test_empty_media_yields_empty_transcript() {
        let scratch = TempDir::new().unwrap();
        let transcoder = Arc::new(MockTranscoder::new(0.0));
        let transport = Arc::new(MockTransport::new());
        let recognizer = recognizer(transcoder.clone(), transport.clone(), &scratch);

        let transcript = recognizer.recognize("silence.wav").await.unwrap();

        assert!(transcript.is_empty());
        assert_eq!(transcript.text, "");
        assert!(transcoder.requests().is_empty());
        assert_eq!(transport.attempts(), 0);
    }

    #[tokio::test]
    async fn test_probe_failure_is_returned() {
        let scratch = TempDir::new().unwrap();
        let transcoder = Arc::new(MockTranscoder::new(30.0).with_probe_failure());
        let recognizer = recognizer(transcoder, Arc::new(MockTransport::new()), &scratch);

        let result = recognizer.recognize("talk.mp4").await;
        assert!(matches!(result, Err(ChunkscribeError::Transcode { .. })));
    }

    #[tokio::test]
    async fn test_invalid_options_fail_before_probe() {
        let scratch = TempDir::new().unwrap();
        let transcoder = Arc::new(MockTranscoder::new(30.0).with_probe_failure());
        let recognizer = recognizer(transcoder, Arc::new(MockTransport::new()), &scratch);

        let result = recognizer
            .recognize(RecognitionOptions::new("talk.mp4").with_max_concurrency(0))
            .await;
        assert!(matches!(result, Err(ChunkscribeError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_bad_split_is_plan_error() {
        let scratch = TempDir::new().unwrap();
        let transcoder = Arc::new(MockTranscoder::new(30.0));
        let transport = Arc::new(MockTransport::new());
        let recognizer = recognizer(transcoder.clone(), transport.clone(), &scratch);

        let result = recognizer
            .recognize(RecognitionOptions::new("talk.mp4").with_splits(vec![0.0, 40.0]))
            .await;

        assert!(matches!(
            result,
            Err(ChunkscribeError::InvalidSegmentPlan { .. })
        ));
        assert!(transcoder.requests().is_empty());
        assert_eq!(transport.attempts(), 0);
    }

    #[tokio::test]
    async fn test_no_segments_started_after_failure() {
        let scratch = TempDir::new().unwrap();
        let transcoder = Arc::new(MockTranscoder::new(75.0).with_failure_at(30.0));
        let transport = Arc::new(MockTransport::new());
        let recognizer = recognizer(transcoder.clone(), transport, &scratch);

        let result = recognizer
            .recognize(RecognitionOptions::new("talk.mp4").with_max_concurrency(1))
            .await;

        assert!(matches!(result, Err(ChunkscribeError::Transcode { .. })));
        let starts: Vec<f64> = transcoder.requests().iter().map(|r| r.start).collect();
        assert_eq!(starts, vec![0.0, 15.0, 30.0]);
    }

    #[tokio::test]
    async fn test_options_flow_into_requests() {
        let scratch = TempDir::new().unwrap();
        let transcoder = Arc::new(MockTranscoder::new(20.0));
        let transport = Arc::new(MockTransport::new());
        let recognizer = recognizer(transcoder.clone(), transport.clone(), &scratch);

        recognizer
            .recognize(
                RecognitionOptions::new("talk.mp4")
                    .with_max_segment_duration(10.0)
                    .with_sample_rate(16000)
                    .with_language("de-de"),
            )
            .await
            .unwrap();

        let requests = transcoder.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.sample_rate == 16000 && r.duration == 10.0));
        assert!(
            transport
                .uploads()
                .iter()
                .all(|u| u.url.as_str().contains("lang=de-de"))
        );
    }
}
