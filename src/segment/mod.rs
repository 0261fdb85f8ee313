//! Segment planning: turning a media duration into bounded time ranges.
//!
//! ```text
//!  total duration ──┐
//!  explicit splits ─┼──▶ plan() ──▶ [(0,15) (15,15) (30,15) ...]
//!  max duration ────┘
//! ```

pub mod planner;

pub use planner::{SegmentDescriptor, plan};
