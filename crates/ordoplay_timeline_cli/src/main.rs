// SPDX-License-Identifier: MIT OR Apache-2.0
//! `ordoplay-timeline` - command-line front end for timeline documents.
//!
//! Creates, inspects and evaluates RON timeline documents without the editor.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use ordoplay_timeline::settings::SETTINGS_FILE_NAME;
use ordoplay_timeline::{EngineSettings, TimelineDocument, TimelineEditor, TrackKind};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ordoplay-timeline", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write an empty document with a scene track.
    New(NewArgs),
    /// Print tracks, clips, anchors and editing state.
    Inspect(InspectArgs),
    /// Print the render order at a time as JSON.
    Eval(EvalArgs),
}

#[derive(Parser, Debug)]
struct NewArgs {
    /// Output document path.
    #[arg(long)]
    out: PathBuf,

    /// Engine settings (RON). Falls back to `timeline.settings.ron` next to
    /// the output, then to the defaults.
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Input document.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct EvalArgs {
    /// Input document.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Query time in milliseconds.
    #[arg(long)]
    at: f64,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,
}

fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ordoplay_timeline=info,ordoplay_timeline_cli=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::New(args) => cmd_new(args),
        Command::Inspect(args) => cmd_inspect(args),
        Command::Eval(args) => cmd_eval(args),
    }
}

fn load_document(path: &Path) -> anyhow::Result<TimelineDocument> {
    TimelineDocument::load(path).with_context(|| format!("load document '{}'", path.display()))
}

/// An explicit settings path, else `timeline.settings.ron` beside `out` if present
fn settings_path(explicit: Option<&Path>, out: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let dir = out.parent().unwrap_or_else(|| Path::new(""));
    Some(dir.join(SETTINGS_FILE_NAME)).filter(|path| path.is_file())
}

fn cmd_new(args: NewArgs) -> anyhow::Result<()> {
    let settings = match settings_path(args.settings.as_deref(), &args.out) {
        Some(path) => EngineSettings::load(&path)
            .with_context(|| format!("load settings '{}'", path.display()))?,
        None => EngineSettings::default(),
    };

    let mut editor = TimelineEditor::with_settings(&settings);
    editor
        .add_track(TrackKind::Scene, "Scene")
        .context("add default scene track")?;

    editor
        .into_document()
        .save(&args.out)
        .with_context(|| format!("write document '{}'", args.out.display()))?;
    tracing::info!("Created {}", args.out.display());
    Ok(())
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let doc = load_document(&args.in_path)?;
    let state = &doc.state;

    println!(
        "format v{}  tracks={} clips={} anchors={} duration={}ms",
        doc.format_version,
        doc.track_count(),
        doc.clip_count(),
        doc.anchors().len(),
        doc.content_duration()
    );
    println!(
        "playhead={}ms (frame {} @ {} fps)  snap={} grid={}ms  ripple={:?}  selected={}",
        state.playhead_ms,
        state.current_frame(),
        state.frame_rate,
        state.snap.enable,
        state.snap.grid_ms,
        state.ripple_mode,
        state.selection.len()
    );

    for track in doc.tracks() {
        let mut flags = Vec::new();
        if !track.visible {
            flags.push("hidden");
        }
        if track.muted {
            flags.push("muted");
        }
        if track.locked {
            flags.push("locked");
        }
        println!(
            "[{}] {} z={} {}",
            track.kind.name(),
            track.name,
            track.z_stack,
            flags.join(",")
        );
        for clip in doc.clips_on_track(track.id) {
            println!(
                "    [{}, {}) {} {:?}",
                clip.start, clip.end, clip.payload_ref, clip.id.0
            );
        }
    }

    for anchor in doc.anchors() {
        match anchor.time_ms {
            Some(t) => println!("anchor {:?} {:?} @ {}ms", anchor.kind, anchor.id.0, t),
            None => println!("anchor {:?} {:?}", anchor.kind, anchor.id.0),
        }
    }

    Ok(())
}

fn cmd_eval(args: EvalArgs) -> anyhow::Result<()> {
    let doc = load_document(&args.in_path)?;
    let order = ordoplay_timeline::evaluate_render_order(&doc, args.at);

    let json = if args.pretty {
        serde_json::to_string_pretty(&order)
    } else {
        serde_json::to_string(&order)
    }
    .context("encode render order")?;

    println!("{json}");
    Ok(())
}
