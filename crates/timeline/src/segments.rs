use std::collections::HashSet;

use tracing::{debug, warn};

use crate::{
    find_placement, known_duration, ColorTag, EditorConfig, IdAllocator, OverflowPolicy,
    Placement, Segment, SegmentId, TimeRange, TimelineError, EPSILON,
};

/// Segments of one timeline, kept sorted by start time.
///
/// Mutation is limited to replace-by-id, gap-searched insert, rename and
/// remove, so callers cannot break the ordering by convention.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentList {
    segments: Vec<Segment>,
    media_duration: Option<f64>,
}

/// Segment created by [`SegmentList::insert_in_gap`].
#[derive(Debug, Clone, PartialEq)]
pub struct Inserted {
    pub segment: Segment,
    pub placement: Placement,
}

impl SegmentList {
    /// Sort `segments` and check them against the ordering and bounds invariants.
    pub fn new(
        segments: Vec<Segment>,
        media_duration: Option<f64>,
    ) -> Result<Self, TimelineError> {
        let list = Self::unchecked(segments, media_duration)?;
        list.validate()?;
        Ok(list)
    }

    /// Sort and reject duplicate ids, without checking overlap or bounds.
    pub fn unchecked(
        mut segments: Vec<Segment>,
        media_duration: Option<f64>,
    ) -> Result<Self, TimelineError> {
        let mut seen = HashSet::with_capacity(segments.len());
        for seg in &segments {
            if !seen.insert(seg.id) {
                return Err(TimelineError::DuplicateId(seg.id));
            }
        }
        segments.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        Ok(Self {
            segments,
            media_duration,
        })
    }

    pub fn media_duration(&self) -> Option<f64> {
        known_duration(self.media_duration)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    pub fn as_slice(&self) -> &[Segment] {
        &self.segments
    }

    pub fn into_vec(self) -> Vec<Segment> {
        self.segments
    }

    pub fn contains(&self, id: SegmentId) -> bool {
        self.segments.iter().any(|s| s.id == id)
    }

    pub fn index_of(&self, id: SegmentId) -> Option<usize> {
        self.segments.iter().position(|s| s.id == id)
    }

    pub fn get(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id == id)
    }

    /// Immediate neighbors in start order.
    pub fn neighbors(&self, id: SegmentId) -> Option<(Option<&Segment>, Option<&Segment>)> {
        let idx = self.index_of(id)?;
        let prev = idx.checked_sub(1).and_then(|i| self.segments.get(i));
        let next = self.segments.get(idx + 1);
        Some((prev, next))
    }

    /// Segment covering `time`, if any.
    pub fn segment_at(&self, time: f64) -> Option<&Segment> {
        let idx = self.segments.partition_point(|s| s.start_time <= time);
        let candidate = self.segments.get(idx.checked_sub(1)?)?;
        candidate.range().contains(time).then_some(candidate)
    }

    /// Check ordering, non-overlap and media bounds.
    ///
    /// The gap and minimum duration are guarantees of editing, not of input:
    /// externally detected segments may abut.
    pub fn validate(&self) -> Result<(), TimelineError> {
        let media = self.media_duration();
        for seg in &self.segments {
            Self::check_bounds(seg, media)?;
        }
        for pair in self.segments.windows(2) {
            if pair[0].end_time > pair[1].start_time + EPSILON {
                return Err(TimelineError::Overlap {
                    left: pair[0].id,
                    right: pair[1].id,
                });
            }
        }
        Ok(())
    }

    fn check_bounds(seg: &Segment, media: Option<f64>) -> Result<(), TimelineError> {
        if !seg.range().is_valid() {
            return Err(TimelineError::InvalidRange {
                start: seg.start_time,
                end: seg.end_time,
            });
        }
        if let Some(duration) = media {
            if seg.end_time > duration + EPSILON {
                return Err(TimelineError::OutOfBounds {
                    id: seg.id,
                    end: seg.end_time,
                    duration,
                });
            }
        }
        Ok(())
    }

    /// Replace the segment with the same id, keeping its position in order.
    ///
    /// Returns the previous value. The new bounds must stay between the
    /// current neighbors and inside the media.
    pub fn replace(&mut self, segment: Segment) -> Result<Segment, TimelineError> {
        let idx = self
            .index_of(segment.id)
            .ok_or(TimelineError::SegmentNotFound(segment.id))?;
        Self::check_bounds(&segment, self.media_duration())?;

        if let Some(prev) = idx.checked_sub(1).and_then(|i| self.segments.get(i)) {
            if prev.end_time > segment.start_time + EPSILON {
                return Err(TimelineError::Overlap {
                    left: prev.id,
                    right: segment.id,
                });
            }
        }
        if let Some(next) = self.segments.get(idx + 1) {
            if segment.end_time > next.start_time + EPSILON {
                return Err(TimelineError::Overlap {
                    left: segment.id,
                    right: next.id,
                });
            }
        }

        Ok(std::mem::replace(&mut self.segments[idx], segment))
    }

    /// Write a drag frame. The drag engine clamps against the neighbors
    /// before calling this, so order is preserved.
    pub(crate) fn apply_frame(&mut self, segment: Segment) -> bool {
        match self.index_of(segment.id) {
            Some(idx) => {
                self.segments[idx] = segment;
                true
            }
            None => false,
        }
    }

    pub fn rename(
        &mut self,
        id: SegmentId,
        label: impl Into<String>,
    ) -> Result<Segment, TimelineError> {
        let idx = self.index_of(id).ok_or(TimelineError::SegmentNotFound(id))?;
        self.segments[idx].label = label.into();
        Ok(self.segments[idx].clone())
    }

    pub fn remove(&mut self, id: SegmentId) -> Result<Segment, TimelineError> {
        let idx = self.index_of(id).ok_or(TimelineError::SegmentNotFound(id))?;
        Ok(self.segments.remove(idx))
    }

    /// Add a `config.default_segment_duration` segment in the first free gap.
    pub fn insert_in_gap(
        &mut self,
        label: impl Into<String>,
        ids: &mut IdAllocator,
        config: &EditorConfig,
    ) -> Result<Inserted, TimelineError> {
        self.insert_with_duration(label, config.default_segment_duration, ids, config)
    }

    pub fn insert_with_duration(
        &mut self,
        label: impl Into<String>,
        duration: f64,
        ids: &mut IdAllocator,
        config: &EditorConfig,
    ) -> Result<Inserted, TimelineError> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(TimelineError::InvalidRange {
                start: 0.0,
                end: duration,
            });
        }

        let placement = find_placement(
            &self.segments,
            duration,
            config.min_gap,
            self.media_duration(),
        );

        if placement.is_best_effort() {
            if config.overflow_policy == OverflowPolicy::Reject {
                return Err(TimelineError::GapNotFound { duration });
            }
            warn!(
                start = placement.range.start,
                end = placement.range.end,
                "no free gap for new segment, placing after the last one"
            );
        }

        let id = ids.allocate(|id| self.contains(id))?;
        let segment = Segment::new(id, placement.range.start, placement.range.end, label)
            .with_color(ColorTag::cycle(self.segments.len()));
        debug!(%id, fit = ?placement.fit, start = segment.start_time, "inserted segment");

        let idx = self
            .segments
            .partition_point(|s| s.start_time <= segment.start_time);
        self.segments.insert(idx, segment.clone());

        Ok(Inserted { segment, placement })
    }

    pub fn ranges(&self) -> impl Iterator<Item = (SegmentId, TimeRange)> + '_ {
        self.segments.iter().map(|s| (s.id, s.range()))
    }
}

impl<'a> IntoIterator for &'a SegmentList {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}
