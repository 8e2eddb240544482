use serde::{Deserialize, Serialize};

use crate::{OverflowPolicy, TimelineError, DEFAULT_SEGMENT_DURATION, MIN_DURATION, MIN_GAP};

/// Editing constants for one timeline surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Seconds kept between adjacent segments by every edit
    pub min_gap: f64,

    /// Shortest segment a trim may produce
    pub min_duration: f64,

    /// Length of a segment created by "add"
    pub default_segment_duration: f64,

    pub zoom_min: f64,
    pub zoom_max: f64,

    /// Pointer tolerance in pixels around a rendered segment edge
    pub edge_handle_px: f64,

    /// What "add" does when no legal gap exists
    pub overflow_policy: OverflowPolicy,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            min_gap: MIN_GAP,
            min_duration: MIN_DURATION,
            default_segment_duration: DEFAULT_SEGMENT_DURATION,
            zoom_min: 1.0,
            zoom_max: 4.0,
            edge_handle_px: 6.0,
            overflow_policy: OverflowPolicy::BestEffort,
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, TimelineError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TimelineError> {
        let positive = [
            ("min_duration", self.min_duration),
            ("default_segment_duration", self.default_segment_duration),
            ("zoom_min", self.zoom_min),
            ("zoom_max", self.zoom_max),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(TimelineError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        for (name, value) in [("min_gap", self.min_gap), ("edge_handle_px", self.edge_handle_px)] {
            if !value.is_finite() || value < 0.0 {
                return Err(TimelineError::InvalidConfig(format!(
                    "{name} must not be negative, got {value}"
                )));
            }
        }
        if self.zoom_min > self.zoom_max {
            return Err(TimelineError::InvalidConfig(format!(
                "zoom_min {} exceeds zoom_max {}",
                self.zoom_min, self.zoom_max
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = EditorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_gap, 0.1);
        assert_eq!(config.min_duration, 1.0);
        assert_eq!(config.default_segment_duration, 60.0);
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config = EditorConfig::from_json(r#"{"min_gap": 0.5, "overflow_policy": "reject"}"#)
            .unwrap();
        assert_eq!(config.min_gap, 0.5);
        assert_eq!(config.min_duration, 1.0);
        assert_eq!(config.overflow_policy, OverflowPolicy::Reject);
    }

    #[test]
    fn test_rejects_inverted_zoom() {
        let err = EditorConfig::from_json(r#"{"zoom_min": 3.0, "zoom_max": 2.0}"#).unwrap_err();
        assert!(matches!(err, TimelineError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_zero_duration() {
        let config = EditorConfig {
            min_duration: 0.0,
            ..EditorConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
