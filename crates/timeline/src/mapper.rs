//! Pixel <-> media time mapping for a zoomable, horizontally scrollable timeline.
//!
//! The rendered timeline is `zoom * base_width` pixels wide. Zoom only widens the
//! rendered region; the time domain is always `[0, media_duration]`.

use serde::{Deserialize, Serialize};

use crate::timecode::format_clock;

/// On-screen extent of the rendered timeline. `left` moves with horizontal scroll.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportRect {
    pub left: f64,
    pub width: f64,
}

impl ViewportRect {
    pub const fn new(left: f64, width: f64) -> Self {
        Self { left, width }
    }

    /// Rect for a timeline whose unzoomed width is `base_width`.
    pub fn zoomed(left: f64, base_width: f64, zoom: f64) -> Self {
        Self {
            left,
            width: base_width * zoom,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }
}

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn usable_duration(media_duration: f64) -> Option<f64> {
    (media_duration.is_finite() && media_duration > 0.0).then_some(media_duration)
}

/// Media time under `pixel_x`. Out-of-range pixels clamp to the timeline ends.
pub fn position_to_time(pixel_x: f64, rect: ViewportRect, media_duration: f64) -> f64 {
    let Some(duration) = usable_duration(media_duration) else {
        return 0.0;
    };
    if !(rect.width > 0.0) {
        return 0.0;
    }
    unit((pixel_x - rect.left) / rect.width) * duration
}

/// Fraction of the timeline width at which `time` is drawn.
pub fn time_to_fraction(time: f64, media_duration: f64) -> f64 {
    match usable_duration(media_duration) {
        Some(duration) => unit(time / duration),
        None => 0.0,
    }
}

pub fn fraction_to_position(fraction: f64, rect: ViewportRect) -> f64 {
    rect.left + unit(fraction) * rect.width
}

pub fn time_to_position(time: f64, rect: ViewportRect, media_duration: f64) -> f64 {
    fraction_to_position(time_to_fraction(time, media_duration), rect)
}

/// Seconds between labeled ruler markers. Finer as zoom grows.
pub fn marker_interval(zoom: f64) -> f64 {
    if zoom >= 3.0 {
        15.0
    } else if zoom >= 2.0 {
        30.0
    } else {
        60.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickMark {
    pub time: f64,
    pub fraction: f64,
    pub label: String,
}

/// Upper bound on the intervals one ruler is divided into.
pub const MAX_TICKS: usize = 10_000;

/// Labeled ruler markers from 0 through the media end.
pub fn tick_marks(media_duration: f64, zoom: f64) -> Vec<TickMark> {
    let Some(duration) = usable_duration(media_duration) else {
        return Vec::new();
    };
    let mut interval = marker_interval(zoom);
    // very long media: widen the spacing by whole multiples instead of
    // emitting an unbounded ruler
    let steps = duration / interval;
    if steps > MAX_TICKS as f64 {
        interval *= (steps / MAX_TICKS as f64).ceil();
    }
    let count = ((duration / interval).floor() as usize).min(MAX_TICKS);

    (0..=count)
        .map(|i| {
            let time = i as f64 * interval;
            TickMark {
                time,
                fraction: time_to_fraction(time, duration),
                label: format_clock(time),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_to_time_linear() {
        let rect = ViewportRect::new(100.0, 1000.0);
        assert_eq!(position_to_time(100.0, rect, 300.0), 0.0);
        assert_eq!(position_to_time(600.0, rect, 300.0), 150.0);
        assert_eq!(position_to_time(1100.0, rect, 300.0), 300.0);
    }

    #[test]
    fn test_position_to_time_clamps() {
        let rect = ViewportRect::new(0.0, 500.0);
        assert_eq!(position_to_time(-40.0, rect, 120.0), 0.0);
        assert_eq!(position_to_time(9000.0, rect, 120.0), 120.0);
        assert_eq!(position_to_time(f64::NAN, rect, 120.0), 0.0);
    }

    #[test]
    fn test_degenerate_inputs_map_to_zero() {
        assert_eq!(position_to_time(50.0, ViewportRect::new(0.0, 0.0), 120.0), 0.0);
        assert_eq!(position_to_time(50.0, ViewportRect::new(0.0, 100.0), 0.0), 0.0);
        assert_eq!(time_to_fraction(10.0, f64::INFINITY), 0.0);
    }

    #[test]
    fn test_zoom_widens_but_keeps_domain() {
        let base = ViewportRect::zoomed(0.0, 800.0, 1.0);
        let zoomed = ViewportRect::zoomed(0.0, 800.0, 4.0);
        assert_eq!(zoomed.width, 3200.0);
        assert_eq!(position_to_time(base.right(), base, 600.0), 600.0);
        assert_eq!(position_to_time(zoomed.right(), zoomed, 600.0), 600.0);
        assert_eq!(position_to_time(1600.0, zoomed, 600.0), 300.0);
    }

    #[test]
    fn test_round_trip_within_pixel() {
        let rect = ViewportRect::new(-250.0, 2400.0);
        let duration = 1234.5;
        let mut x = rect.left;
        while x <= rect.right() {
            let t = position_to_time(x, rect, duration);
            let back = time_to_position(t, rect, duration);
            assert!((back - x).abs() <= 1.0, "x={x} back={back}");
            x += 37.3;
        }
    }

    #[test]
    fn test_marker_interval_breakpoints() {
        assert_eq!(marker_interval(1.0), 60.0);
        assert_eq!(marker_interval(1.99), 60.0);
        assert_eq!(marker_interval(2.0), 30.0);
        assert_eq!(marker_interval(2.5), 30.0);
        assert_eq!(marker_interval(3.0), 15.0);
        assert_eq!(marker_interval(4.0), 15.0);
    }

    #[test]
    fn test_tick_marks() {
        let ticks = tick_marks(150.0, 1.0);
        let times: Vec<f64> = ticks.iter().map(|t| t.time).collect();
        assert_eq!(times, vec![0.0, 60.0, 120.0]);
        assert_eq!(ticks[1].label, "01:00");
        assert!((ticks[2].fraction - 0.8).abs() < 1e-12);

        assert_eq!(tick_marks(150.0, 3.0).len(), 11);
        assert!(tick_marks(0.0, 1.0).is_empty());
    }

    #[test]
    fn test_tick_marks_bounded_for_huge_media() {
        let duration = 1e15;
        let ticks = tick_marks(duration, 1.0);
        assert!(ticks.len() <= MAX_TICKS + 1);
        assert!(ticks.len() > MAX_TICKS / 2);
        assert_eq!(ticks[0].time, 0.0);
        let step = ticks[1].time - ticks[0].time;
        assert_eq!(step % 60.0, 0.0);
        assert!(ticks.last().unwrap().time <= duration);

        // ten thousand minutes still gets one tick per minute
        assert_eq!(tick_marks(600_000.0, 1.0).len(), MAX_TICKS + 1);
    }
}
