//! Processing of a single segment: extract, recognize, clean up.

use crate::defaults;
use crate::error::{ChunkscribeError, Result};
use crate::segment::SegmentDescriptor;
use crate::speech::TranscriptFetcher;
use crate::transcoder::{ExtractRequest, Transcoder};
use crate::transcript::SegmentResult;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Per-call settings every segment of a run shares.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentJob {
    pub input: PathBuf,
    pub language: String,
    pub sample_rate: u32,
    pub max_retries: u32,
}

/// Turns one segment of the input into a `SegmentResult`.
///
/// Cheap to clone; one clone is moved into each spawned segment task.
#[derive(Clone)]
pub struct SegmentWorker {
    transcoder: Arc<dyn Transcoder>,
    fetcher: Arc<TranscriptFetcher>,
    scratch_dir: Option<PathBuf>,
}

impl SegmentWorker {
    pub fn new(
        transcoder: Arc<dyn Transcoder>,
        fetcher: Arc<TranscriptFetcher>,
        scratch_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            transcoder,
            fetcher,
            scratch_dir,
        }
    }

    /// Transcode `segment` into a scratch FLAC file and recognize it.
    ///
    /// The scratch file is removed before returning, whatever the outcome.
    pub async fn process(&self, job: &SegmentJob, segment: SegmentDescriptor) -> Result<SegmentResult> {
        let scratch = self.scratch_file()?;
        debug!(
            start = segment.start,
            duration = segment.duration,
            scratch = %scratch.display(),
            "processing segment"
        );

        let outcome = self.transcode_and_fetch(job, segment, &scratch).await;

        if let Err(e) = scratch.close() {
            warn!(start = segment.start, error = %e, "failed to remove scratch file");
        }
        outcome
    }

    async fn transcode_and_fetch(
        &self,
        job: &SegmentJob,
        segment: SegmentDescriptor,
        scratch: &Path,
    ) -> Result<SegmentResult> {
        let request = ExtractRequest {
            start: segment.start,
            duration: segment.duration,
            sample_rate: job.sample_rate,
        };
        self.transcoder
            .extract_segment(&job.input, &request, scratch)
            .await?;

        self.fetcher
            .fetch(scratch, segment, &job.language, job.sample_rate, job.max_retries)
            .await
    }

    fn scratch_file(&self) -> Result<tempfile::TempPath> {
        let mut builder = tempfile::Builder::new();
        builder
            .prefix(defaults::SCRATCH_PREFIX)
            .suffix(defaults::SCRATCH_SUFFIX);

        let file = match &self.scratch_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| {
            ChunkscribeError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create scratch file: {e}"),
            ))
        })?;

        Ok(file.into_temp_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::speech::{MockTransport, ServiceEndpoint};
    use crate::transcoder::MockTranscoder;
    use tempfile::TempDir;

    fn worker(
        transcoder: Arc<MockTranscoder>,
        transport: Arc<MockTransport>,
        scratch_dir: &Path,
    ) -> SegmentWorker {
        let endpoint = ServiceEndpoint::new(&ServiceConfig {
            api_key: Some("k".to_string()),
            ..Default::default()
        })
        .unwrap();
        SegmentWorker::new(
            transcoder,
            Arc::new(TranscriptFetcher::new(transport, endpoint)),
            Some(scratch_dir.to_path_buf()),
        )
    }

    fn job() -> SegmentJob {
        SegmentJob {
            input: PathBuf::from("talk.mp4"),
            language: "en-us".to_string(),
            sample_rate: 16000,
            max_retries: 1,
        }
    }

    fn dir_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_process_transcodes_then_fetches() {
        let scratch = TempDir::new().unwrap();
        let transcoder = Arc::new(MockTranscoder::new(60.0).with_audio(b"segment-audio"));
        let transport = Arc::new(MockTransport::new().with_transcript("hi there"));
        let worker = worker(transcoder.clone(), transport.clone(), scratch.path());

        let result = worker
            .process(&job(), SegmentDescriptor::new(15.0, 15.0))
            .await
            .unwrap();

        assert_eq!(result.text, "hi there");
        assert_eq!(result.start, 15.0);
        assert_eq!(
            transcoder.requests(),
            vec![ExtractRequest {
                start: 15.0,
                duration: 15.0,
                sample_rate: 16000,
            }]
        );
        assert_eq!(transport.uploads()[0].body, b"segment-audio");
        assert_eq!(transport.uploads()[0].content_type, "audio/x-flac; rate=16000");
    }

    #[tokio::test]
    async fn test_scratch_file_named_and_removed_on_success() {
        let scratch = TempDir::new().unwrap();
        let transcoder = Arc::new(MockTranscoder::new(60.0));
        let worker = worker(transcoder.clone(), Arc::new(MockTransport::new()), scratch.path());

        worker
            .process(&job(), SegmentDescriptor::new(0.0, 15.0))
            .await
            .unwrap();

        let output = &transcoder.outputs()[0];
        assert!(output.starts_with(scratch.path()));
        let name = output.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("chunkscribe-"));
        assert!(name.ends_with(".flac"));
        assert!(dir_is_empty(scratch.path()));
    }

    #[tokio::test]
    async fn test_transcode_failure_skips_service_and_cleans_up() {
        let scratch = TempDir::new().unwrap();
        let transcoder = Arc::new(MockTranscoder::new(60.0).with_failure_at(0.0));
        let transport = Arc::new(MockTransport::new());
        let worker = worker(transcoder, transport.clone(), scratch.path());

        let result = worker.process(&job(), SegmentDescriptor::new(0.0, 15.0)).await;

        assert!(matches!(result, Err(ChunkscribeError::Transcode { .. })));
        assert_eq!(transport.attempts(), 0);
        assert!(dir_is_empty(scratch.path()));
    }

    #[tokio::test]
    async fn test_recognition_failure_cleans_up() {
        let scratch = TempDir::new().unwrap();
        let transcoder = Arc::new(MockTranscoder::new(60.0));
        let transport = Arc::new(MockTransport::new().with_default_body("nope"));
        let worker = worker(transcoder, transport.clone(), scratch.path());

        let result = worker.process(&job(), SegmentDescriptor::new(30.0, 15.0)).await;

        assert!(matches!(
            result,
            Err(ChunkscribeError::RecognitionUnavailable { start }) if start == 30.0
        ));
        assert_eq!(transport.attempts(), 2);
        assert!(dir_is_empty(scratch.path()));
    }

    #[tokio::test]
    async fn test_missing_scratch_dir_is_io_error() {
        let scratch = TempDir::new().unwrap();
        let missing = scratch.path().join("does-not-exist");
        let transcoder = Arc::new(MockTranscoder::new(60.0));
        let worker = worker(transcoder.clone(), Arc::new(MockTransport::new()), &missing);

        let result = worker.process(&job(), SegmentDescriptor::new(0.0, 15.0)).await;

        assert!(matches!(result, Err(ChunkscribeError::Io(_))));
        assert!(transcoder.requests().is_empty());
    }
}
