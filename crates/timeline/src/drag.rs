//! Segment drag engine: one pointer gesture at a time, clamped every frame.
//!
//! The clamp math lives in free functions over [`DragBounds`] so it can be
//! exercised without any pointer events. Only the immediate neighbors are
//! consulted; ordering guarantees nothing further away can bind first.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{EditorConfig, Segment, SegmentId, SegmentList, TimeRange};

/// Zone of a segment a gesture grabbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleKind {
    StartEdge,
    EndEdge,
    Body,
}

/// Limits a dragged segment must respect on this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragBounds {
    pub prev_end: Option<f64>,
    pub next_start: Option<f64>,
    pub media_duration: Option<f64>,
    pub gap: f64,
    pub min_duration: f64,
}

impl DragBounds {
    pub fn new(
        prev: Option<&Segment>,
        next: Option<&Segment>,
        media_duration: Option<f64>,
        config: &EditorConfig,
    ) -> Self {
        Self {
            prev_end: prev.map(|s| s.end_time),
            next_start: next.map(|s| s.start_time),
            media_duration,
            gap: config.min_gap,
            min_duration: config.min_duration,
        }
    }

    fn floor(&self) -> f64 {
        self.prev_end.map_or(0.0, |end| end + self.gap)
    }

    fn ceiling(&self) -> f64 {
        match (self.next_start, self.media_duration) {
            (Some(start), _) => start - self.gap,
            (None, Some(duration)) => duration,
            (None, None) => f64::INFINITY,
        }
    }
}

/// `max(lower, min(upper, candidate))`, or `current` when the window is empty.
///
/// An empty window only happens on input that already violates the gap or
/// minimum duration; holding still keeps such a segment from getting worse.
fn saturate(candidate: f64, lower: f64, upper: f64, current: f64) -> f64 {
    if lower > upper {
        current
    } else {
        lower.max(upper.min(candidate))
    }
}

pub fn clamp_start_edge(pointer_time: f64, range: TimeRange, bounds: &DragBounds) -> TimeRange {
    let start = saturate(
        pointer_time,
        bounds.floor(),
        range.end - bounds.min_duration,
        range.start,
    );
    TimeRange::new(start, range.end)
}

pub fn clamp_end_edge(pointer_time: f64, range: TimeRange, bounds: &DragBounds) -> TimeRange {
    let end = saturate(
        pointer_time,
        range.start + bounds.min_duration,
        bounds.ceiling(),
        range.end,
    );
    TimeRange::new(range.start, end)
}

/// Move a whole segment so the grab point stays under the pointer.
///
/// `duration` is the length captured when the gesture began; it never changes.
pub fn clamp_body_move(
    pointer_time: f64,
    origin_offset: f64,
    range: TimeRange,
    duration: f64,
    bounds: &DragBounds,
) -> TimeRange {
    let start = saturate(
        pointer_time - origin_offset,
        bounds.floor(),
        bounds.ceiling() - duration,
        range.start,
    );
    TimeRange::new(start, start + duration)
}

/// Gesture state. Exists only between pointer-down and pointer-up/leave.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragSession {
    #[default]
    Idle,
    Dragging {
        segment_id: SegmentId,
        handle: HandleKind,
        /// Pointer time minus segment start at pointer-down (body drags only)
        origin_offset: Option<f64>,
        /// Bounds at pointer-down
        original: TimeRange,
        /// Whether any pointer-move has been applied
        moved: bool,
    },
}

impl DragSession {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn segment_id(&self) -> Option<SegmentId> {
        match self {
            Self::Idle => None,
            Self::Dragging { segment_id, .. } => Some(*segment_id),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DragEngine {
    session: DragSession,
}

impl DragEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> &DragSession {
        &self.session
    }

    pub fn is_dragging(&self) -> bool {
        !self.session.is_idle()
    }

    /// Idle -> Dragging. A gesture still in flight is ended first.
    pub fn begin(&mut self, segment: &Segment, handle: HandleKind, pointer_time: f64) {
        if self.is_dragging() {
            debug!("new gesture started before the previous one ended");
            self.end();
        }
        let origin_offset = match handle {
            HandleKind::Body => Some(pointer_time - segment.start_time),
            HandleKind::StartEdge | HandleKind::EndEdge => None,
        };
        debug!(id = %segment.id, ?handle, pointer_time, "drag started");
        self.session = DragSession::Dragging {
            segment_id: segment.id,
            handle,
            origin_offset,
            original: segment.range(),
            moved: false,
        };
    }

    /// Dragging -> Dragging. Clamp, write the frame into `segments`, and
    /// return the whole updated segment.
    ///
    /// Returns `None` when idle or when the dragged segment is gone.
    pub fn update(
        &mut self,
        pointer_time: f64,
        segments: &mut SegmentList,
        config: &EditorConfig,
    ) -> Option<Segment> {
        let DragSession::Dragging {
            segment_id,
            handle,
            origin_offset,
            original,
            ref mut moved,
        } = self.session
        else {
            return None;
        };

        let (prev, next) = segments.neighbors(segment_id)?;
        let bounds = DragBounds::new(prev, next, segments.media_duration(), config);
        let current = segments.get(segment_id)?;
        let range = current.range();

        let new_range = match handle {
            HandleKind::StartEdge => clamp_start_edge(pointer_time, range, &bounds),
            HandleKind::EndEdge => clamp_end_edge(pointer_time, range, &bounds),
            HandleKind::Body => clamp_body_move(
                pointer_time,
                origin_offset.unwrap_or(0.0),
                range,
                original.duration(),
                &bounds,
            ),
        };
        let updated = current.with_range(new_range);
        trace!(id = %segment_id, start = new_range.start, end = new_range.end, "drag frame");

        segments.apply_frame(updated.clone());
        *moved = true;
        Some(updated)
    }

    /// Dragging -> Idle. Whatever the last frame wrote stays committed.
    pub fn end(&mut self) -> DragSession {
        let finished = std::mem::take(&mut self.session);
        if let DragSession::Dragging {
            segment_id, moved, ..
        } = finished
        {
            debug!(id = %segment_id, moved, "drag ended");
        }
        finished
    }
}
