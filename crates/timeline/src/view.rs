use crate::{known_duration, DragEngine, EditorConfig, SegmentId};

const ZOOM_STEP: f64 = 0.5;

/// Ephemeral per-surface state. Never persisted.
#[derive(Debug, Clone)]
pub struct ViewState {
    zoom: f64,
    zoom_min: f64,
    zoom_max: f64,
    current_time: f64,
    active_segment_id: Option<SegmentId>,
    pub(crate) drag: DragEngine,
}

impl ViewState {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            zoom: config.zoom_min,
            zoom_min: config.zoom_min,
            zoom_max: config.zoom_max,
            current_time: 0.0,
            active_segment_id: None,
            drag: DragEngine::new(),
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Set zoom, clamped into the configured range. Returns the applied value.
    pub fn set_zoom(&mut self, zoom: f64) -> f64 {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(self.zoom_min, self.zoom_max);
        }
        self.zoom
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.set_zoom(self.zoom + ZOOM_STEP)
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.set_zoom(self.zoom - ZOOM_STEP)
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Move the playhead, clamped to the media. Returns the applied time.
    pub fn set_current_time(&mut self, time: f64, media_duration: Option<f64>) -> f64 {
        let time = if time.is_finite() { time.max(0.0) } else { 0.0 };
        self.current_time = match known_duration(media_duration) {
            Some(duration) => time.min(duration),
            None => time,
        };
        self.current_time
    }

    pub fn active_segment_id(&self) -> Option<SegmentId> {
        self.active_segment_id
    }

    pub fn is_active(&self, id: SegmentId) -> bool {
        self.active_segment_id == Some(id)
    }

    /// Make `id` the only active segment. Returns the one it replaced.
    pub fn select(&mut self, id: SegmentId) -> Option<SegmentId> {
        self.active_segment_id.replace(id)
    }

    pub fn clear_selection(&mut self) -> Option<SegmentId> {
        self.active_segment_id.take()
    }

    pub fn drag(&self) -> &DragEngine {
        &self.drag
    }

    /// Back to a fresh surface: zoomed out, playhead at 0, nothing selected, no gesture.
    pub fn reset(&mut self) {
        self.zoom = self.zoom_min;
        self.current_time = 0.0;
        self.active_segment_id = None;
        self.drag = DragEngine::new();
    }
}
