//! Segment planner.
//!
//! Computes the ordered list of `(start, duration)` ranges a media file is cut
//! into. Without explicit split points the file is tiled with fixed-length
//! segments; with split points each span between consecutive splits is cut
//! into chunks no longer than the maximum segment duration.

use crate::defaults::{MAX_SEGMENTS, SPAN_TOLERANCE_SECS};
use crate::error::{ChunkscribeError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A contiguous time range of the source media, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentDescriptor {
    pub start: f64,
    pub duration: f64,
}

impl SegmentDescriptor {
    pub fn new(start: f64, duration: f64) -> Self {
        Self { start, duration }
    }

    /// End of the range (exclusive).
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Plan the segments of a media file.
///
/// The returned plan is sorted ascending by `start`. Without `explicit_splits`
/// the final segment may extend past `total_duration`; the transcoder simply
/// produces less audio for it.
///
/// # Errors
/// Returns `ChunkscribeError::InvalidSegmentPlan` if the durations are not
/// finite, `max_segment_duration` is not longer than [`SPAN_TOLERANCE_SECS`],
/// a split is negative, the splits are not ascending and below
/// `total_duration`, or the plan would exceed [`MAX_SEGMENTS`] segments.
pub fn plan(
    total_duration: f64,
    explicit_splits: Option<&[f64]>,
    max_segment_duration: f64,
) -> Result<Vec<SegmentDescriptor>> {
    if !max_segment_duration.is_finite() || max_segment_duration <= SPAN_TOLERANCE_SECS {
        return Err(ChunkscribeError::plan(format!(
            "maximum segment duration must be longer than {SPAN_TOLERANCE_SECS}s, \
             got {max_segment_duration}"
        )));
    }
    if !total_duration.is_finite() || total_duration < 0.0 {
        return Err(ChunkscribeError::plan(format!(
            "total duration must be a non-negative number, got {total_duration}"
        )));
    }

    let segments = match explicit_splits {
        None => tile(total_duration, max_segment_duration)?,
        Some(splits) => subdivide(total_duration, splits, max_segment_duration)?,
    };

    debug!(
        total_duration,
        max_segment_duration,
        segments = segments.len(),
        "planned segments"
    );
    Ok(segments)
}

/// Fixed-length tiling: `ceil(total / max)` segments of exactly `max`.
fn tile(total_duration: f64, max_segment_duration: f64) -> Result<Vec<SegmentDescriptor>> {
    let count = (total_duration / max_segment_duration).ceil();
    check_segment_count(count)?;
    Ok((0..count as usize)
        .map(|i| SegmentDescriptor::new(i as f64 * max_segment_duration, max_segment_duration))
        .collect())
}

fn check_segment_count(count: f64) -> Result<()> {
    if count > MAX_SEGMENTS as f64 {
        return Err(ChunkscribeError::plan(format!(
            "plan would need {count} segments, more than the limit of {MAX_SEGMENTS}; \
             use a longer maximum segment duration"
        )));
    }
    Ok(())
}

fn subdivide(
    total_duration: f64,
    splits: &[f64],
    max_segment_duration: f64,
) -> Result<Vec<SegmentDescriptor>> {
    let mut segments = Vec::with_capacity(splits.len());

    for (i, &split) in splits.iter().enumerate() {
        if !split.is_finite() || split < 0.0 {
            return Err(ChunkscribeError::plan(format!(
                "split {i} must be a non-negative number, got {split}"
            )));
        }

        let span_end = splits.get(i + 1).copied().unwrap_or(total_duration);
        let mut remaining = span_end - split;
        if remaining.is_nan() || remaining < 0.0 {
            return Err(ChunkscribeError::plan(format!(
                "splits must be a sorted list of start times, each less than the total \
                 duration ({total_duration}s); split {i} at {split}s spans {remaining}s"
            )));
        }

        check_segment_count(segments.len() as f64 + (remaining / max_segment_duration).ceil())?;

        let mut start = split;
        while remaining > max_segment_duration + SPAN_TOLERANCE_SECS {
            segments.push(SegmentDescriptor::new(start, max_segment_duration));
            remaining -= max_segment_duration;
            start += max_segment_duration;
        }

        // Coinciding splits, or a split at the very end, leave nothing to send.
        if remaining > SPAN_TOLERANCE_SECS {
            segments.push(SegmentDescriptor::new(start, remaining));
        } else {
            debug!(start, remaining, "dropping zero-length segment");
        }
    }

    Ok(segments)
}
