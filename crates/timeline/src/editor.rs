//! Interaction surface glue: pointer events in, segment edits and seek requests out.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::mapper::{position_to_time, tick_marks, time_to_fraction, time_to_position, TickMark};
use crate::{
    DragSession, EditorConfig, HandleKind, IdAllocator, Inserted, Segment, SegmentId, SegmentList,
    TimelineError, ViewState, ViewportRect, EPSILON,
};

/// Outbound callbacks of a timeline surface.
///
/// Updates always carry the whole segment; consumers replace by id.
pub trait TimelineObserver {
    fn on_seek(&mut self, _time: f64) {}
    fn on_segment_update(&mut self, _segment: &Segment) {}
    fn on_segment_click(&mut self, _segment: &Segment) {}
    fn on_segment_delete(&mut self, _id: SegmentId) {}
}

impl TimelineObserver for () {}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EditorEvent {
    Seek { time: f64 },
    SegmentUpdate { segment: Segment },
    SegmentClick { segment: Segment },
    SegmentDelete { id: SegmentId },
}

/// Observer that records every callback in order.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    pub events: Vec<EditorEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn last_seek(&self) -> Option<f64> {
        self.events.iter().rev().find_map(|e| match e {
            EditorEvent::Seek { time } => Some(*time),
            _ => None,
        })
    }

    pub fn updates(&self) -> impl Iterator<Item = &Segment> {
        self.events.iter().filter_map(|e| match e {
            EditorEvent::SegmentUpdate { segment } => Some(segment),
            _ => None,
        })
    }
}

impl TimelineObserver for EventLog {
    fn on_seek(&mut self, time: f64) {
        self.events.push(EditorEvent::Seek { time });
    }

    fn on_segment_update(&mut self, segment: &Segment) {
        self.events.push(EditorEvent::SegmentUpdate {
            segment: segment.clone(),
        });
    }

    fn on_segment_click(&mut self, segment: &Segment) {
        self.events.push(EditorEvent::SegmentClick {
            segment: segment.clone(),
        });
    }

    fn on_segment_delete(&mut self, id: SegmentId) {
        self.events.push(EditorEvent::SegmentDelete { id });
    }
}

/// What a pointer landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "on", rename_all = "snake_case")]
pub enum HitTarget {
    Background,
    Segment { id: SegmentId, handle: HandleKind },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointerEvent {
    /// `target` comes from the surface's element identification; when absent
    /// the editor hit-tests `x` against segment geometry.
    Down {
        x: f64,
        #[serde(default)]
        target: Option<HitTarget>,
    },
    Move {
        x: f64,
    },
    Up,
    Leave,
}

/// One timeline surface: segments, view state and the active gesture.
#[derive(Debug, Clone)]
pub struct TimelineEditor {
    segments: SegmentList,
    view: ViewState,
    config: EditorConfig,
    ids: IdAllocator,
    left: f64,
    base_width: f64,
    /// Time span frozen for the active gesture while the media length is unknown
    gesture_extent: Option<f64>,
}

impl TimelineEditor {
    pub fn new(segments: SegmentList, config: EditorConfig) -> Self {
        Self::with_ids(segments, config, IdAllocator::new())
    }

    pub fn with_ids(segments: SegmentList, config: EditorConfig, mut ids: IdAllocator) -> Self {
        ids.reserve(segments.iter().map(|s| s.id));
        Self {
            view: ViewState::new(&config),
            segments,
            config,
            ids,
            left: 0.0,
            base_width: 1000.0,
            gesture_extent: None,
        }
    }

    pub fn segments(&self) -> &SegmentList {
        &self.segments
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn drag_session(&self) -> &DragSession {
        self.view.drag.session()
    }

    /// Swap in a different segment collection or media. View state starts over.
    pub fn load(&mut self, segments: SegmentList) {
        debug!(count = segments.len(), "timeline reloaded");
        self.ids.reserve(segments.iter().map(|s| s.id));
        self.segments = segments;
        self.gesture_extent = None;
        self.view.reset();
    }

    /// Unzoomed width and on-screen left (scroll) of the timeline track.
    pub fn set_viewport(&mut self, left: f64, base_width: f64) {
        self.left = left;
        self.base_width = base_width.max(0.0);
    }

    pub fn viewport(&self) -> ViewportRect {
        ViewportRect::zoomed(self.left, self.base_width, self.view.zoom())
    }

    pub fn set_zoom(&mut self, zoom: f64) -> f64 {
        self.view.set_zoom(zoom)
    }

    /// Playback position reported by the player. Emits nothing.
    pub fn set_current_time(&mut self, time: f64) -> f64 {
        self.view
            .set_current_time(time, self.segments.media_duration())
    }

    /// Time span the track represents: the media length, or the end of the
    /// last segment while the media length is unknown.
    pub fn time_extent(&self) -> f64 {
        self.segments.media_duration().unwrap_or_else(|| {
            self.segments
                .as_slice()
                .last()
                .map_or(0.0, |s| s.end_time)
        })
    }

    /// Extent the pixel mapping uses right now. Equal to [`time_extent`]
    /// except during a gesture over media of unknown length, where the
    /// extent is frozen at pointer-down (plus room to grow) so moving the
    /// last segment does not rescale the track under the pointer.
    ///
    /// [`time_extent`]: Self::time_extent
    pub fn mapping_extent(&self) -> f64 {
        self.gesture_extent.unwrap_or_else(|| self.time_extent())
    }

    pub fn time_at(&self, pixel_x: f64) -> f64 {
        position_to_time(pixel_x, self.viewport(), self.mapping_extent())
    }

    pub fn x_at(&self, time: f64) -> f64 {
        time_to_position(time, self.viewport(), self.mapping_extent())
    }

    pub fn playhead_fraction(&self) -> f64 {
        time_to_fraction(self.view.current_time(), self.mapping_extent())
    }

    /// `(id, start fraction, end fraction)` for each segment block.
    pub fn segment_fractions(&self) -> Vec<(SegmentId, f64, f64)> {
        let extent = self.mapping_extent();
        self.segments
            .iter()
            .map(|s| {
                (
                    s.id,
                    time_to_fraction(s.start_time, extent),
                    time_to_fraction(s.end_time, extent),
                )
            })
            .collect()
    }

    pub fn tick_marks(&self) -> Vec<TickMark> {
        tick_marks(self.mapping_extent(), self.view.zoom())
    }

    /// Classify a pointer by geometry: within `edge_handle_px` of a rendered
    /// edge is that edge; between the edges is the body.
    pub fn hit_test(&self, pixel_x: f64) -> HitTarget {
        let tolerance = self.config.edge_handle_px;
        for seg in &self.segments {
            let x0 = self.x_at(seg.start_time);
            let x1 = self.x_at(seg.end_time);
            if pixel_x < x0 - tolerance {
                break;
            }
            if pixel_x > x1 + tolerance {
                continue;
            }

            let to_start = (pixel_x - x0).abs();
            let to_end = (pixel_x - x1).abs();
            let handle = if to_start <= tolerance && to_start <= to_end {
                HandleKind::StartEdge
            } else if to_end <= tolerance {
                HandleKind::EndEdge
            } else {
                HandleKind::Body
            };
            return HitTarget::Segment { id: seg.id, handle };
        }
        HitTarget::Background
    }

    pub fn handle_pointer(&mut self, event: PointerEvent, observer: &mut impl TimelineObserver) {
        match event {
            PointerEvent::Down { x, target } => {
                if self.view.drag.is_dragging() {
                    self.end_gesture();
                }
                let target = target.unwrap_or_else(|| self.hit_test(x));
                self.pointer_down(x, target, observer);
            }
            PointerEvent::Move { x } => self.pointer_move(x, observer),
            PointerEvent::Up => self.pointer_up(observer),
            PointerEvent::Leave => {
                self.end_gesture();
            }
        }
    }

    fn end_gesture(&mut self) -> DragSession {
        self.gesture_extent = None;
        self.view.drag.end()
    }

    fn pointer_down(&mut self, x: f64, target: HitTarget, observer: &mut impl TimelineObserver) {
        match target {
            HitTarget::Background => {
                let time = self.time_at(x);
                self.seek(time, observer);
            }
            HitTarget::Segment { id, handle } => {
                if !self.segments.contains(id) {
                    warn!(%id, "pointer-down on unknown segment");
                    return;
                }
                if self.segments.media_duration().is_none() {
                    let extent = self.time_extent() + self.config.default_segment_duration;
                    debug!(extent, "media length unknown, mapping frozen for gesture");
                    self.gesture_extent = Some(extent);
                }
                let time = self.time_at(x);
                if let Some(segment) = self.segments.get(id) {
                    self.view.drag.begin(segment, handle, time);
                }
            }
        }
    }

    fn pointer_move(&mut self, x: f64, observer: &mut impl TimelineObserver) {
        if !self.view.drag.is_dragging() {
            return;
        }
        let time = self.time_at(x);
        if let Some(updated) = self
            .view
            .drag
            .update(time, &mut self.segments, &self.config)
        {
            observer.on_segment_update(&updated);
        }
    }

    fn pointer_up(&mut self, observer: &mut impl TimelineObserver) {
        // press and release without movement is a click
        if let DragSession::Dragging {
            segment_id,
            moved: false,
            ..
        } = self.end_gesture()
        {
            if let Err(err) = self.select_segment(segment_id, observer) {
                warn!(%err, "click on a segment that no longer exists");
            }
        }
    }

    /// Request playback at `time`, clamped to the media.
    pub fn seek(&mut self, time: f64, observer: &mut impl TimelineObserver) -> f64 {
        let applied = self.set_current_time(time);
        observer.on_seek(applied);
        applied
    }

    /// Make `id` the active segment and seek to its start.
    pub fn select_segment(
        &mut self,
        id: SegmentId,
        observer: &mut impl TimelineObserver,
    ) -> Result<(), TimelineError> {
        let segment = self
            .segments
            .get(id)
            .cloned()
            .ok_or(TimelineError::SegmentNotFound(id))?;
        self.view.select(id);
        observer.on_segment_click(&segment);
        self.seek(segment.start_time, observer);
        Ok(())
    }

    /// Insert a default-length segment in the first free gap.
    pub fn add_segment(
        &mut self,
        label: impl Into<String>,
        observer: &mut impl TimelineObserver,
    ) -> Result<Inserted, TimelineError> {
        let inserted = self
            .segments
            .insert_in_gap(label, &mut self.ids, &self.config)?;
        observer.on_segment_update(&inserted.segment);
        Ok(inserted)
    }

    pub fn rename_segment(
        &mut self,
        id: SegmentId,
        label: impl Into<String>,
        observer: &mut impl TimelineObserver,
    ) -> Result<Segment, TimelineError> {
        let updated = self.segments.rename(id, label)?;
        observer.on_segment_update(&updated);
        Ok(updated)
    }

    pub fn delete_segment(
        &mut self,
        id: SegmentId,
        observer: &mut impl TimelineObserver,
    ) -> Result<Segment, TimelineError> {
        let removed = self.segments.remove(id)?;
        if self.view.drag.session().segment_id() == Some(id) {
            self.end_gesture();
        }
        if self.view.is_active(id) {
            self.view.clear_selection();
        }
        observer.on_segment_delete(id);
        Ok(removed)
    }

    /// Replace-by-id from outside the surface (e.g. a form edit). Not echoed
    /// back to the observer.
    pub fn apply_update(&mut self, segment: Segment) -> Result<Segment, TimelineError> {
        let duration = segment.duration();
        if segment.range().is_valid() && duration < self.config.min_duration - EPSILON {
            return Err(TimelineError::TooShort {
                id: segment.id,
                duration,
                min: self.config.min_duration,
            });
        }
        self.segments.replace(segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(id: u64, start: f64, end: f64) -> Segment {
        Segment::new(SegmentId(id), start, end, format!("S{id}"))
    }

    /// 100 s of media on a 1000 px track: 10 px per second at zoom 1.
    fn editor(segments: Vec<Segment>) -> TimelineEditor {
        let list = SegmentList::new(segments, Some(100.0)).unwrap();
        let mut editor =
            TimelineEditor::with_ids(list, EditorConfig::default(), IdAllocator::seeded(3));
        editor.set_viewport(0.0, 1000.0);
        editor
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_background_click_seeks() {
        let mut editor = editor(vec![seg(1, 10.0, 20.0)]);
        let mut log = EventLog::new();
        editor.handle_pointer(PointerEvent::Down { x: 500.0, target: None }, &mut log);

        assert_eq!(log.events, vec![EditorEvent::Seek { time: 50.0 }]);
        assert!(!editor.view().drag().is_dragging());
        assert_eq!(editor.view().current_time(), 50.0);
    }

    #[test]
    fn test_hit_test() {
        let editor = editor(vec![seg(1, 10.0, 20.0), seg(2, 40.0, 60.0)]);
        let hit = |x| editor.hit_test(x);

        assert_eq!(hit(50.0), HitTarget::Background);
        assert_eq!(
            hit(97.0),
            HitTarget::Segment { id: SegmentId(1), handle: HandleKind::StartEdge }
        );
        assert_eq!(
            hit(150.0),
            HitTarget::Segment { id: SegmentId(1), handle: HandleKind::Body }
        );
        assert_eq!(
            hit(204.0),
            HitTarget::Segment { id: SegmentId(1), handle: HandleKind::EndEdge }
        );
        assert_eq!(
            hit(500.0),
            HitTarget::Segment { id: SegmentId(2), handle: HandleKind::Body }
        );
        assert_eq!(hit(900.0), HitTarget::Background);
    }

    #[test]
    fn test_press_release_is_click() {
        let mut editor = editor(vec![seg(1, 10.0, 20.0), seg(2, 40.0, 60.0)]);
        let mut log = EventLog::new();

        editor.handle_pointer(PointerEvent::Down { x: 500.0, target: None }, &mut log);
        editor.handle_pointer(PointerEvent::Up, &mut log);

        assert_eq!(editor.view().active_segment_id(), Some(SegmentId(2)));
        assert!(matches!(log.events[0], EditorEvent::SegmentClick { .. }));
        assert_eq!(log.last_seek(), Some(40.0));
        assert_eq!(editor.segments().get(SegmentId(2)).unwrap().start_time, 40.0);
    }

    #[test]
    fn test_drag_is_not_click() {
        let mut editor = editor(vec![seg(1, 10.0, 20.0)]);
        let mut log = EventLog::new();

        editor.handle_pointer(PointerEvent::Down { x: 150.0, target: None }, &mut log);
        editor.handle_pointer(PointerEvent::Move { x: 250.0 }, &mut log);
        editor.handle_pointer(PointerEvent::Up, &mut log);

        assert_eq!(editor.view().active_segment_id(), None);
        assert_eq!(log.updates().count(), 1);
        assert!(log.last_seek().is_none());
        let moved = editor.segments().get(SegmentId(1)).unwrap();
        assert!(close(moved.start_time, 20.0));
        assert!(close(moved.end_time, 30.0));
    }

    #[test]
    fn test_end_edge_drag_scenario() {
        let mut editor = editor(vec![seg(1, 10.0, 50.0), seg(2, 60.0, 90.0)]);
        let mut log = EventLog::new();
        let target = Some(HitTarget::Segment {
            id: SegmentId(1),
            handle: HandleKind::EndEdge,
        });

        editor.handle_pointer(PointerEvent::Down { x: 500.0, target }, &mut log);
        editor.handle_pointer(PointerEvent::Move { x: 650.0 }, &mut log);
        editor.handle_pointer(PointerEvent::Leave, &mut log);

        let first = editor.segments().get(SegmentId(1)).unwrap();
        assert_eq!(first.start_time, 10.0);
        assert!(close(first.end_time, 59.9));

        // moves after leave are ignored
        editor.handle_pointer(PointerEvent::Move { x: 100.0 }, &mut log);
        assert!(close(editor.segments().get(SegmentId(1)).unwrap().end_time, 59.9));
        assert_eq!(log.updates().count(), 1);
    }

    #[test]
    fn test_zoom_changes_mapping_width_only() {
        let mut editor = editor(vec![]);
        assert_eq!(editor.time_at(500.0), 50.0);
        editor.set_zoom(2.0);
        assert_eq!(editor.viewport().width, 2000.0);
        assert_eq!(editor.time_at(500.0), 25.0);
        assert_eq!(editor.time_at(2000.0), 100.0);
        assert_eq!(editor.tick_marks().len(), 4);
    }

    #[test]
    fn test_add_rename_delete() {
        let mut editor = editor(vec![seg(1, 0.0, 20.0)]);
        let mut log = EventLog::new();

        let inserted = editor.add_segment("Segment 2", &mut log).unwrap();
        assert!(close(inserted.segment.start_time, 20.1));
        assert!(close(inserted.segment.end_time, 80.1));
        let new_id = inserted.segment.id;
        assert_ne!(new_id, SegmentId(1));

        editor.select_segment(new_id, &mut log).unwrap();
        let renamed = editor.rename_segment(new_id, "Closing", &mut log).unwrap();
        assert_eq!(renamed.label, "Closing");

        editor.delete_segment(new_id, &mut log).unwrap();
        assert_eq!(editor.view().active_segment_id(), None);
        assert_eq!(log.events.last(), Some(&EditorEvent::SegmentDelete { id: new_id }));
        assert_eq!(editor.segments().len(), 1);
    }

    #[test]
    fn test_load_resets_view() {
        let mut editor = editor(vec![seg(1, 0.0, 20.0)]);
        editor.set_zoom(3.0);
        editor.select_segment(SegmentId(1), &mut ()).unwrap();
        editor.handle_pointer(
            PointerEvent::Down { x: 100.0, target: None },
            &mut (),
        );

        let fresh = SegmentList::new(vec![seg(9, 5.0, 8.0)], Some(10.0)).unwrap();
        editor.load(fresh);
        assert_eq!(editor.view().zoom(), 1.0);
        assert_eq!(editor.view().active_segment_id(), None);
        assert!(editor.drag_session().is_idle());
        assert_eq!(editor.time_extent(), 10.0);
    }

    #[test]
    fn test_pointer_event_json() {
        let event: PointerEvent = serde_json::from_str(
            r#"{"kind":"down","x":12.5,"target":{"on":"segment","id":4,"handle":"start_edge"}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            PointerEvent::Down {
                x: 12.5,
                target: Some(HitTarget::Segment {
                    id: SegmentId(4),
                    handle: HandleKind::StartEdge
                })
            }
        );
        let up: PointerEvent = serde_json::from_str(r#"{"kind":"up"}"#).unwrap();
        assert_eq!(up, PointerEvent::Up);
    }
}
