use serde::{Deserialize, Serialize};
use std::fmt;

/// Segment identifier. Stable across edits and never reused within a timeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct SegmentId(pub u64);

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Rendering tag. Carries no meaning for editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ColorTag {
    #[default]
    Blue,
    Green,
    Purple,
    Orange,
    Pink,
    Teal,
}

impl ColorTag {
    pub const PALETTE: [ColorTag; 6] = [
        ColorTag::Blue,
        ColorTag::Green,
        ColorTag::Purple,
        ColorTag::Orange,
        ColorTag::Pink,
        ColorTag::Teal,
    ];

    /// Palette entry for the n-th segment, wrapping around.
    pub fn cycle(index: usize) -> Self {
        Self::PALETTE[index % Self::PALETTE.len()]
    }

    pub fn hex(&self) -> &'static str {
        match self {
            Self::Blue => "#4A9EFF",
            Self::Green => "#3DDC84",
            Self::Purple => "#A56EFF",
            Self::Orange => "#FFA500",
            Self::Pink => "#FF5FA2",
            Self::Teal => "#2EC4B6",
        }
    }
}

/// Half-open span of media time in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time < self.end
    }

    /// Finite, non-negative and strictly increasing.
    pub fn is_valid(&self) -> bool {
        self.start.is_finite() && self.end.is_finite() && self.start >= 0.0 && self.start < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    pub start_time: f64,
    pub end_time: f64,
    pub label: String,
    #[serde(default)]
    pub color_tag: ColorTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl Segment {
    pub fn new(id: SegmentId, start_time: f64, end_time: f64, label: impl Into<String>) -> Self {
        Self {
            id,
            start_time,
            end_time,
            label: label.into(),
            color_tag: ColorTag::default(),
            summary: None,
        }
    }

    pub fn with_color(mut self, color_tag: ColorTag) -> Self {
        self.color_tag = color_tag;
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start_time, self.end_time)
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Copy of this segment with new bounds; everything else is kept.
    pub fn with_range(&self, range: TimeRange) -> Self {
        Self {
            start_time: range.start,
            end_time: range.end,
            ..self.clone()
        }
    }
}
