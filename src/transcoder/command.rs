//! Subprocess execution behind a trait so transcoder logic is testable
//! without ffmpeg installed.

use crate::error::{ChunkscribeError, Result};
use std::collections::VecDeque;
use std::ffi::OsString;
use std::process::Stdio;
use std::sync::Mutex;
use tokio::process::Command;
use tracing::debug;

/// Runs an external program and returns its stdout.
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`.
    ///
    /// Returns an error if the program is missing or exits unsuccessfully.
    async fn run(&self, program: &str, args: &[OsString]) -> Result<String>;
}

/// Production runner backed by `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct TokioCommandRunner;

impl TokioCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[OsString]) -> Result<String> {
        debug!(program, ?args, "running command");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ChunkscribeError::transcode(format!(
                        "{program} not found. Install ffmpeg:\n\
                         Ubuntu/Debian: sudo apt install ffmpeg\n\
                         Arch: sudo pacman -S ffmpeg\n\
                         macOS: brew install ffmpeg"
                    ))
                } else {
                    ChunkscribeError::transcode(format!("Failed to execute {program}: {e}"))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ChunkscribeError::transcode(format!(
                "{program} failed with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Mock runner that records calls and replays queued responses.
///
/// With an empty queue every call succeeds with empty stdout.
#[derive(Debug, Default)]
pub struct MockCommandRunner {
    calls: Mutex<Vec<(String, Vec<OsString>)>>,
    responses: Mutex<VecDeque<Result<String>>>,
}

impl MockCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response.
    pub fn with_response(self, stdout: &str) -> Self {
        lock(&self.responses).push_back(Ok(stdout.to_string()));
        self
    }

    /// Queue an error response.
    pub fn with_error(self, error: ChunkscribeError) -> Self {
        lock(&self.responses).push_back(Err(error));
        self
    }

    /// All recorded `(program, args)` calls.
    pub fn calls(&self) -> Vec<(String, Vec<OsString>)> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

#[async_trait::async_trait]
impl CommandRunner for MockCommandRunner {
    async fn run(&self, program: &str, args: &[OsString]) -> Result<String> {
        lock(&self.calls).push((program.to_string(), args.to_vec()));
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
