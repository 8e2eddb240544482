use thiserror::Error;

mod segment;
pub use segment::*;
mod segments;
pub use segments::*;
mod config;
pub use config::*;
pub mod mapper;
pub use mapper::{
    fraction_to_position, marker_interval, position_to_time, tick_marks, time_to_fraction,
    time_to_position, TickMark, ViewportRect, MAX_TICKS,
};
pub mod timecode;
mod drag;
pub use drag::*;
mod placement;
pub use placement::*;
mod view;
pub use view::*;
mod editor;
pub use editor::*;
pub mod plan;

/// Minimum separation between adjacent segments, in seconds.
pub const MIN_GAP: f64 = 0.1;
/// Minimum segment duration a trim may produce, in seconds.
pub const MIN_DURATION: f64 = 1.0;
/// Length of a segment created by an explicit "add".
pub const DEFAULT_SEGMENT_DURATION: f64 = 60.0;
/// Tolerance for comparisons between accumulated f64 bounds.
pub const EPSILON: f64 = 1e-9;

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("segment not found: {0}")]
    SegmentNotFound(SegmentId),
    #[error("segment id already in use: {0}")]
    DuplicateId(SegmentId),
    #[error("invalid time range: {start}..{end}")]
    InvalidRange { start: f64, end: f64 },
    #[error("segments overlap: {left} ends after {right} starts")]
    Overlap { left: SegmentId, right: SegmentId },
    #[error("segment {id} is {duration}s long, minimum is {min}s")]
    TooShort { id: SegmentId, duration: f64, min: f64 },
    #[error("segment {id} ends at {end}s, past media duration {duration}s")]
    OutOfBounds { id: SegmentId, end: f64, duration: f64 },
    #[error("no free gap for a {duration}s segment")]
    GapNotFound { duration: f64 },
    #[error("could not allocate an unused segment id")]
    IdSpaceExhausted,
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// `Some(d)` when the media duration is known, finite and positive.
pub(crate) fn known_duration(media_duration: Option<f64>) -> Option<f64> {
    media_duration.filter(|d| d.is_finite() && *d > 0.0)
}
