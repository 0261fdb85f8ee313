//! Transcript types and the final merge step.

use serde::{Deserialize, Serialize};

/// Recognized text for one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentResult {
    pub start: f64,
    pub duration: f64,
    pub text: String,
}

/// Complete transcript of a recognition run.
///
/// `segments` is sorted ascending by start time. `text` is every segment's
/// text followed by a single space, so it always ends with a space when there
/// is at least one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalTranscript {
    pub segments: Vec<SegmentResult>,
    pub text: String,
}

impl FinalTranscript {
    /// Merge per-segment results collected in any order.
    pub fn from_results(mut segments: Vec<SegmentResult>) -> Self {
        segments.sort_by(|a, b| a.start.total_cmp(&b.start));
        let text = full_text(&segments);
        Self { segments, text }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

fn full_text(segments: &[SegmentResult]) -> String {
    let mut text = String::with_capacity(segments.iter().map(|s| s.text.len() + 1).sum());
    for segment in segments {
        text.push_str(&segment.text);
        text.push(' ');
    }
    text
}
