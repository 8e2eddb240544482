//! Segmentation plans: the `{ "snippets": [...] }` documents produced by the
//! AI segmentation step and accepted back by the session store.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    known_duration, ColorTag, EditorConfig, IdAllocator, Segment, SegmentList, TimelineError,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanItem {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub end: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub snippets: Vec<PlanItem>,
}

impl Plan {
    pub fn from_json(json: &str) -> Result<Self, TimelineError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, TimelineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Turn a plan into a valid segment list.
///
/// Items without both bounds are skipped. Bounds are clamped to the media,
/// overlaps are resolved by pushing the later item past the earlier one plus
/// the gap, and anything left shorter than `min_duration` is dropped.
pub fn import_plan(
    plan: &Plan,
    media_duration: Option<f64>,
    config: &EditorConfig,
    ids: &mut IdAllocator,
) -> Result<SegmentList, TimelineError> {
    let media = known_duration(media_duration);

    let mut ranges: Vec<(usize, f64, f64)> = plan
        .snippets
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let (Some(start), Some(end)) = (item.start, item.end) else {
                debug!(index = i, "plan item without bounds skipped");
                return None;
            };
            if !start.is_finite() || !end.is_finite() {
                return None;
            }
            let start = start.max(0.0);
            let end = media.map_or(end, |m| end.min(m));
            Some((i, start, end))
        })
        .collect();
    ranges.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut segments: Vec<Segment> = Vec::with_capacity(ranges.len());
    for (i, start, end) in ranges {
        let start = match segments.last() {
            Some(prev) if start < prev.end_time + config.min_gap => prev.end_time + config.min_gap,
            _ => start,
        };
        if end - start < config.min_duration {
            warn!(index = i, start, end, "plan item too short after clamping, dropped");
            continue;
        }

        let item = &plan.snippets[i];
        let id = ids.allocate(|id| segments.iter().any(|s| s.id == id))?;
        let label = item
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("Snippet {}", segments.len() + 1));
        let mut segment =
            Segment::new(id, start, end, label).with_color(ColorTag::cycle(segments.len()));
        segment.summary = item.summary.clone();
        segments.push(segment);
    }

    debug!(
        imported = segments.len(),
        total = plan.snippets.len(),
        "plan imported"
    );
    SegmentList::new(segments, media_duration)
}

pub fn export_plan(segments: &SegmentList) -> Plan {
    Plan {
        snippets: segments
            .iter()
            .map(|s| PlanItem {
                name: Some(s.label.clone()),
                start: Some(s.start_time),
                end: Some(s.end_time),
                summary: s.summary.clone(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, start: f64, end: f64) -> PlanItem {
        PlanItem {
            name: Some(name.to_string()),
            start: Some(start),
            end: Some(end),
            summary: None,
        }
    }

    fn import(plan: &Plan, media: Option<f64>) -> SegmentList {
        import_plan(plan, media, &EditorConfig::default(), &mut IdAllocator::seeded(11)).unwrap()
    }

    #[test]
    fn test_import_sorts_and_labels() {
        let plan = Plan {
            snippets: vec![
                item("Second", 120.0, 200.0),
                PlanItem {
                    name: None,
                    start: Some(0.0),
                    end: Some(100.0),
                    summary: Some("intro".to_string()),
                },
            ],
        };
        let list = import(&plan, Some(300.0));
        let labels: Vec<&str> = list.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["Snippet 1", "Second"]);
        assert_eq!(list.as_slice()[0].summary.as_deref(), Some("intro"));
        assert_eq!(list.as_slice()[1].color_tag, ColorTag::Green);
    }

    #[test]
    fn test_import_clamps_and_resolves_overlap() {
        let plan = Plan {
            snippets: vec![
                item("A", -5.0, 50.0),
                item("B", 40.0, 90.0),
                item("C", 85.0, 500.0),
            ],
        };
        let list = import(&plan, Some(120.0));
        let s = list.as_slice();
        assert_eq!(s[0].start_time, 0.0);
        assert!((s[1].start_time - 50.1).abs() < 1e-9);
        assert!((s[2].start_time - 90.1).abs() < 1e-9);
        assert_eq!(s[2].end_time, 120.0);
        assert!(list.validate().is_ok());
    }

    #[test]
    fn test_import_skips_incomplete_and_too_short() {
        let plan = Plan {
            snippets: vec![
                item("A", 0.0, 30.0),
                PlanItem {
                    name: Some("no end".to_string()),
                    start: Some(40.0),
                    ..PlanItem::default()
                },
                item("swallowed", 10.0, 30.5),
            ],
        };
        let list = import(&plan, None);
        assert_eq!(list.len(), 1);
        assert_eq!(list.as_slice()[0].label, "A");
    }

    #[test]
    fn test_export_round_trip_shape() {
        let plan = Plan::from_json(
            r#"{"snippets":[{"name":"Talk","start":3.0,"end":63.0,"summary":"opening"}]}"#,
        )
        .unwrap();
        let list = import(&plan, Some(100.0));
        let exported = export_plan(&list);
        assert_eq!(exported, plan);
    }
}
