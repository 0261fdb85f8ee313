//! Recognition pipeline.
//!
//! `Recognizer` probes the input, plans its segments and runs one
//! `SegmentWorker` task per segment under a concurrency limit. Each worker
//! extracts its segment to a scratch FLAC file and hands it to the
//! `TranscriptFetcher`.

pub mod controller;
pub mod worker;

pub use controller::Recognizer;
pub use worker::{SegmentJob, SegmentWorker};
