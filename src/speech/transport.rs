//! HTTP transport for the two service streams.

use crate::error::{ChunkscribeError, Result};
use crate::speech::response::recognition_body;
use crate::speech::session::redacted;
use futures_util::StreamExt;
use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Trait for the upload/download stream pair of one recognition attempt.
///
/// Both calls of an attempt run concurrently; the service only answers the
/// download once the matching upload has been received.
#[async_trait::async_trait]
pub trait StreamTransport: Send + Sync {
    /// Send `body` on the upload stream.
    async fn upload(&self, url: &Url, content_type: &str, body: Vec<u8>) -> Result<()>;

    /// Read the complete download stream as text.
    async fn download(&self, url: &Url) -> Result<String>;
}

/// Production transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport whose requests each time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChunkscribeError::network(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

fn transport_error(stream: &str, url: &Url, error: reqwest::Error) -> ChunkscribeError {
    let target = redacted(url);
    let error = error.without_url();
    if error.is_timeout() {
        ChunkscribeError::network(format!("{stream} stream to {target} timed out"))
    } else if error.is_connect() {
        ChunkscribeError::network(format!("Failed to connect {stream} stream to {target}: {error}"))
    } else {
        ChunkscribeError::network(format!("{stream} stream to {target} failed: {error}"))
    }
}

#[async_trait::async_trait]
impl StreamTransport for HttpTransport {
    async fn upload(&self, url: &Url, content_type: &str, body: Vec<u8>) -> Result<()> {
        let bytes = body.len();
        let response = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| transport_error("upload", url, e))?;

        // The download stream carries the verdict; a rejected upload shows up
        // there as an unusable body.
        if !response.status().is_success() {
            warn!(status = %response.status(), endpoint = %redacted(url), "upload rejected");
        } else {
            debug!(bytes, status = %response.status(), "upload complete");
        }
        Ok(())
    }

    async fn download(&self, url: &Url) -> Result<String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport_error("download", url, e))?;

        let status = response.status();
        let mut stream = response.bytes_stream();
        let mut body = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| transport_error("download", url, e))?;
            body.extend_from_slice(&chunk);
        }

        debug!(%status, bytes = body.len(), "download complete");
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

/// One upload seen by [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedUpload {
    pub url: Url,
    pub content_type: String,
    pub body: Vec<u8>,
}

/// Mock transport for testing
///
/// Download bodies are replayed from a queue; once the queue is empty every
/// download returns the default body.
pub struct MockTransport {
    download_queue: Mutex<VecDeque<Result<String>>>,
    upload_errors: Mutex<VecDeque<ChunkscribeError>>,
    default_body: String,
    delay: Duration,
    uploads: Mutex<Vec<RecordedUpload>>,
    downloads: Mutex<Vec<Url>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Create a mock whose downloads answer "mock transcription".
    pub fn new() -> Self {
        Self {
            download_queue: Mutex::new(VecDeque::new()),
            upload_errors: Mutex::new(VecDeque::new()),
            default_body: recognition_body("mock transcription"),
            delay: Duration::ZERO,
            uploads: Mutex::new(Vec::new()),
            downloads: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    /// Answer every download (after the queue) with `transcript`.
    pub fn with_transcript(mut self, transcript: &str) -> Self {
        self.default_body = recognition_body(transcript);
        self
    }

    /// Answer every download (after the queue) with a raw body.
    pub fn with_default_body(mut self, body: &str) -> Self {
        self.default_body = body.to_string();
        self
    }

    /// Queue a raw download body.
    pub fn with_body(self, body: &str) -> Self {
        lock(&self.download_queue).push_back(Ok(body.to_string()));
        self
    }

    /// Queue a download failure.
    pub fn with_download_error(self, error: ChunkscribeError) -> Self {
        lock(&self.download_queue).push_back(Err(error));
        self
    }

    /// Queue an upload failure.
    pub fn with_upload_error(self, error: ChunkscribeError) -> Self {
        lock(&self.upload_errors).push_back(error);
        self
    }

    /// Hold every download for `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        lock(&self.uploads).clone()
    }

    pub fn downloads(&self) -> Vec<Url> {
        lock(&self.downloads).clone()
    }

    /// Number of exchanges attempted (one download per attempt).
    pub fn attempts(&self) -> usize {
        lock(&self.downloads).len()
    }

    /// Highest number of downloads observed in flight at the same time.
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Downloads currently in flight.
    pub fn in_flight(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl StreamTransport for MockTransport {
    async fn upload(&self, url: &Url, content_type: &str, body: Vec<u8>) -> Result<()> {
        lock(&self.uploads).push(RecordedUpload {
            url: url.clone(),
            content_type: content_type.to_string(),
            body,
        });
        match lock(&self.upload_errors).pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn download(&self, url: &Url) -> Result<String> {
        lock(&self.downloads).push(url.clone());
        let _in_flight = InFlight::enter(&self.active, &self.max_active);

        tokio::time::sleep(self.delay).await;
        let next = lock(&self.download_queue).pop_front();
        next.unwrap_or_else(|| Ok(self.default_body.clone()))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Counts one call as in flight until dropped, including when the call's
/// future is cancelled mid-await.
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
