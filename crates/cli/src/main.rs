use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use segment_timeline::mapper::tick_marks;
use segment_timeline::plan::{import_plan, Plan};
use segment_timeline::timecode::{format_clock, format_precise, parse_clock};
use segment_timeline::{
    EditorConfig, EventLog, IdAllocator, OverflowPolicy, PointerEvent, Segment, SegmentId,
    SegmentList, TimelineEditor, TimelineError, EPSILON,
};

#[derive(Parser)]
#[command(name = "segtl")]
#[command(about = "Segment timeline editor - headless editing operations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,

    /// Editor configuration (JSON); missing fields take defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print ruler tick marks
    Ticks {
        /// Media duration (seconds, MM:SS or H:MM:SS)
        #[arg(short, long, value_parser = parse_seconds)]
        duration: f64,

        #[arg(short, long, default_value = "1")]
        zoom: f64,
    },

    /// Add a segment in the first free gap of a segment list
    Add {
        /// Segment list JSON file
        #[arg(short, long)]
        segments: PathBuf,

        /// Media duration
        #[arg(short, long, value_parser = parse_seconds)]
        duration: f64,

        /// Length of the new segment (defaults to the configured length)
        #[arg(short, long, value_parser = parse_seconds)]
        length: Option<f64>,

        #[arg(long, default_value = "New segment")]
        label: String,

        /// Fail instead of overlapping when no gap fits
        #[arg(long)]
        strict: bool,
    },

    /// Normalize an AI segmentation plan into a segment list
    ImportPlan {
        /// Plan JSON file ({"snippets": [...]})
        #[arg(short, long)]
        plan: PathBuf,

        /// Media duration
        #[arg(short, long, value_parser = parse_seconds)]
        duration: f64,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replay a scripted editing session and report every callback
    Replay {
        /// Script JSON file
        #[arg(short, long)]
        script: PathBuf,
    },

    /// Check a segment list against ordering and bounds
    Validate {
        /// Segment list JSON file
        #[arg(short, long)]
        segments: PathBuf,

        /// Media duration
        #[arg(short, long, value_parser = parse_seconds)]
        duration: f64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Ticks { duration, zoom } => ticks_command(duration, zoom),
        Commands::Add {
            segments,
            duration,
            length,
            label,
            strict,
        } => add_command(config, segments, duration, length, label, strict),
        Commands::ImportPlan {
            plan,
            duration,
            output,
        } => import_plan_command(config, plan, duration, output),
        Commands::Replay { script } => replay_command(config, script),
        Commands::Validate { segments, duration } => {
            validate_command(config, segments, duration)
        }
    }
}

fn parse_seconds(input: &str) -> std::result::Result<f64, String> {
    parse_clock(input).ok_or_else(|| format!("invalid duration '{input}'"))
}

fn load_config(path: Option<&Path>) -> Result<EditorConfig> {
    let Some(path) = path else {
        return Ok(EditorConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = EditorConfig::from_json(&json)
        .with_context(|| format!("invalid config {}", path.display()))?;
    debug!(?config, "config loaded");
    Ok(config)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))
}

fn write_output(output: Option<&Path>, value: &serde_json::Value) -> Result<()> {
    let pretty = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, pretty)
                .with_context(|| format!("writing {}", path.display()))?;
            info!("Written to: {:?}", path);
        }
        None => println!("{pretty}"),
    }
    Ok(())
}

fn ticks_command(duration: f64, zoom: f64) -> Result<()> {
    let marks = tick_marks(duration, zoom);
    info!("{} tick marks for {}", marks.len(), format_clock(duration));
    for mark in marks {
        println!("{:>8}  {:>8.1}s  {:.4}", mark.label, mark.time, mark.fraction);
    }
    Ok(())
}

fn add_command(
    mut config: EditorConfig,
    segments_path: PathBuf,
    duration: f64,
    length: Option<f64>,
    label: String,
    strict: bool,
) -> Result<()> {
    if strict {
        config.overflow_policy = OverflowPolicy::Reject;
    }
    let segments: Vec<Segment> = read_json(&segments_path)?;
    let mut list = SegmentList::new(segments, Some(duration))
        .with_context(|| format!("invalid segment list {}", segments_path.display()))?;

    let length = length.unwrap_or(config.default_segment_duration);
    let inserted = list.insert_with_duration(label, length, &mut IdAllocator::new(), &config)?;
    info!(
        "Added {} at {} - {} ({:?})",
        inserted.segment.id,
        format_precise(inserted.segment.start_time),
        format_precise(inserted.segment.end_time),
        inserted.placement.fit
    );

    write_output(
        None,
        &serde_json::json!({
            "inserted": inserted.segment,
            "placement": inserted.placement,
            "segments": list.as_slice(),
        }),
    )
}

fn import_plan_command(
    config: EditorConfig,
    plan_path: PathBuf,
    duration: f64,
    output: Option<PathBuf>,
) -> Result<()> {
    let json = std::fs::read_to_string(&plan_path)
        .with_context(|| format!("reading plan {}", plan_path.display()))?;
    let plan = Plan::from_json(&json)?;
    let list = import_plan(&plan, Some(duration), &config, &mut IdAllocator::new())?;

    if list.len() < plan.snippets.len() {
        warn!(
            "{} of {} plan items were dropped",
            plan.snippets.len() - list.len(),
            plan.snippets.len()
        );
    }
    info!("Imported {} segments", list.len());

    write_output(
        output.as_deref(),
        &serde_json::to_value(list.as_slice())?,
    )
}

fn default_base_width() -> f64 {
    1000.0
}

/// A scripted session: the initial surface plus the steps to replay.
#[derive(Debug, Deserialize)]
struct ReplayScript {
    #[serde(default)]
    media_duration: Option<f64>,
    #[serde(default)]
    left: f64,
    #[serde(default = "default_base_width")]
    base_width: f64,
    #[serde(default)]
    zoom: Option<f64>,
    #[serde(default)]
    current_time: Option<f64>,
    #[serde(default)]
    segments: Vec<Segment>,
    /// Seed for new segment ids, so replays are reproducible
    #[serde(default)]
    seed: u64,
    steps: Vec<ReplayStep>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReplayStep {
    Pointer(PointerEvent),
    Edit(EditStep),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum EditStep {
    Add {
        #[serde(default)]
        label: Option<String>,
    },
    Rename {
        id: SegmentId,
        label: String,
    },
    Delete {
        id: SegmentId,
    },
    Select {
        id: SegmentId,
    },
    Seek {
        time: f64,
    },
    Zoom {
        zoom: f64,
    },
    /// Playback position report; not echoed as a seek
    Playback {
        time: f64,
    },
}

fn apply_edit(
    editor: &mut TimelineEditor,
    step: EditStep,
    log: &mut EventLog,
) -> std::result::Result<(), TimelineError> {
    match step {
        EditStep::Add { label } => {
            let label = label.unwrap_or_else(|| format!("Segment {}", editor.segments().len() + 1));
            editor.add_segment(label, log)?;
        }
        EditStep::Rename { id, label } => {
            editor.rename_segment(id, label, log)?;
        }
        EditStep::Delete { id } => {
            editor.delete_segment(id, log)?;
        }
        EditStep::Select { id } => editor.select_segment(id, log)?,
        EditStep::Seek { time } => {
            editor.seek(time, log);
        }
        EditStep::Zoom { zoom } => {
            editor.set_zoom(zoom);
        }
        EditStep::Playback { time } => {
            editor.set_current_time(time);
        }
    }
    Ok(())
}

fn replay_command(config: EditorConfig, script_path: PathBuf) -> Result<()> {
    let script: ReplayScript = read_json(&script_path)?;
    info!(
        "Replaying {} steps from {:?}",
        script.steps.len(),
        script_path
    );

    let list = SegmentList::new(script.segments, script.media_duration)
        .context("invalid initial segments")?;
    let mut editor = TimelineEditor::with_ids(list, config, IdAllocator::seeded(script.seed));
    editor.set_viewport(script.left, script.base_width);
    if let Some(zoom) = script.zoom {
        editor.set_zoom(zoom);
    }
    if let Some(time) = script.current_time {
        editor.set_current_time(time);
    }

    let mut log = EventLog::new();
    let mut failures = Vec::new();
    for (index, step) in script.steps.into_iter().enumerate() {
        match step {
            ReplayStep::Pointer(event) => editor.handle_pointer(event, &mut log),
            ReplayStep::Edit(edit) => {
                if let Err(e) = apply_edit(&mut editor, edit, &mut log) {
                    warn!("Step {} failed: {}", index, e);
                    failures.push(serde_json::json!({ "step": index, "error": e.to_string() }));
                }
            }
        }
    }

    let view = editor.view();
    let report = serde_json::json!({
        "events": log.events,
        "segments": editor.segments().as_slice(),
        "view": {
            "zoom": view.zoom(),
            "current_time": view.current_time(),
            "active_segment_id": view.active_segment_id(),
        },
        "failures": failures,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    write_output(None, &report)
}

fn validate_command(config: EditorConfig, segments_path: PathBuf, duration: f64) -> Result<()> {
    let segments: Vec<Segment> = read_json(&segments_path)?;
    let list = SegmentList::unchecked(segments, Some(duration))?;
    list.validate()
        .with_context(|| format!("{} is not a valid timeline", segments_path.display()))?;

    // Legal, but an edit touching these would be clamped.
    for pair in list.as_slice().windows(2) {
        if pair[1].start_time - pair[0].end_time < config.min_gap - EPSILON {
            warn!(
                "{} and {} are closer than {}s",
                pair[0].id, pair[1].id, config.min_gap
            );
        }
    }
    for seg in &list {
        if seg.duration() < config.min_duration {
            warn!("{} is shorter than {}s", seg.id, config.min_duration);
        }
    }

    println!(
        "{} segments, {} of {} covered",
        list.len(),
        format_clock(list.iter().map(Segment::duration).sum()),
        format_clock(duration)
    );
    Ok(())
}
