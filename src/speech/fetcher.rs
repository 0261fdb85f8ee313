//! One segment's round trip to the speech service.

use crate::error::{ChunkscribeError, Result};
use crate::segment::SegmentDescriptor;
use crate::speech::response::parse_final_transcript;
use crate::speech::session::{PairingKey, ServiceEndpoint, content_type};
use crate::speech::transport::StreamTransport;
use crate::transcript::SegmentResult;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Sends transcoded audio to the service and reads back its transcript.
pub struct TranscriptFetcher {
    transport: Arc<dyn StreamTransport>,
    endpoint: ServiceEndpoint,
}

impl TranscriptFetcher {
    pub fn new(transport: Arc<dyn StreamTransport>, endpoint: ServiceEndpoint) -> Self {
        Self {
            transport,
            endpoint,
        }
    }

    /// Recognize the audio in `audio` and label it with `segment`'s timing.
    ///
    /// Makes at most `1 + max_retries` attempts, each with a fresh pairing
    /// key. Only unusable response bodies are retried.
    ///
    /// # Errors
    /// - `ChunkscribeError::Network` as soon as either stream fails
    /// - `ChunkscribeError::RecognitionUnavailable` once every attempt
    ///   returned an unusable body
    /// - `ChunkscribeError::Io` if `audio` cannot be read
    pub async fn fetch(
        &self,
        audio: &Path,
        segment: SegmentDescriptor,
        language: &str,
        sample_rate: u32,
        max_retries: u32,
    ) -> Result<SegmentResult> {
        let content_type = content_type(sample_rate);
        let attempts = max_retries.saturating_add(1);

        for attempt in 1..=attempts {
            let pair = PairingKey::generate();
            let upload_url = self.endpoint.upload_url(&pair, language)?;
            let download_url = self.endpoint.download_url(&pair)?;
            let body = tokio::fs::read(audio).await?;

            debug!(
                start = segment.start,
                attempt,
                %pair,
                bytes = body.len(),
                "sending segment"
            );

            let ((), response) = tokio::try_join!(
                self.transport.upload(&upload_url, &content_type, body),
                self.transport.download(&download_url),
            )?;

            match parse_final_transcript(&response) {
                Ok(text) => {
                    debug!(start = segment.start, attempt, chars = text.len(), "segment recognized");
                    return Ok(SegmentResult {
                        start: segment.start,
                        duration: segment.duration,
                        text,
                    });
                }
                Err(e) => {
                    warn!(
                        start = segment.start,
                        attempt,
                        attempts,
                        error = %e,
                        "unusable response from speech service"
                    );
                }
            }
        }

        Err(ChunkscribeError::RecognitionUnavailable {
            start: segment.start,
        })
    }
}
