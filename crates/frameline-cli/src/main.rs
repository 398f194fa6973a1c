//! # Frameline CLI
//!
//! Command-line front end for the frameline timeline engine.
//!
//! ## Commands
//! - `inspect`: print the layer/frame map of a document
//! - `frame`: dump the resolved content of one frame as JSON
//! - `tween`: apply a tween span to a document and save it
//! - `play`: step through a document at its frame rate
//! - `demo`: write a small animated document

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use frameline_core::{
    DisplayRole, Easing, FrameType, Layer, Playback, Timeline, TimelineConfig,
};
use frameline_data::VisualItem;
use glam::Vec2;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "frameline")]
#[command(about = "Inspect, edit and play frameline timeline documents")]
#[command(version)]
struct Cli {
    /// Timeline config (JSON); document values override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print layers and their frame map
    Inspect {
        /// Document to read
        file: PathBuf,
    },

    /// Dump what is displayed at one frame
    Frame {
        file: PathBuf,

        /// 1-based frame number
        #[arg(short, long)]
        frame: u32,

        /// Include onion-skin overlays
        #[arg(long)]
        onion: bool,
    },

    /// Apply a tween between two frames of a layer
    Tween {
        file: PathBuf,

        #[arg(short, long, default_value_t = 0)]
        layer: usize,

        #[arg(long)]
        start: u32,

        #[arg(long)]
        end: u32,

        /// "linear", "ease-in", "ease-out", "ease-in-out"
        #[arg(short, long, default_value = "linear")]
        easing: String,

        /// Where to save (defaults to overwriting the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Play a document, printing each frame
    Play {
        file: PathBuf,

        /// Number of frames to play
        #[arg(short, long, default_value_t = 24)]
        count: u32,
    },

    /// Write a demo document: a square sliding across the canvas
    Demo {
        #[arg(short, long, default_value = "demo.json")]
        output: PathBuf,

        #[arg(long, default_value_t = 24)]
        frames: u32,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("frameline_cli=info,frameline_core=warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Inspect { file } => cmd_inspect(&file, config),
        Commands::Frame { file, frame, onion } => cmd_frame(&file, config, frame, onion),
        Commands::Tween {
            file,
            layer,
            start,
            end,
            easing,
            output,
        } => cmd_tween(&file, config, layer, start, end, &easing, output.as_deref()),
        Commands::Play { file, count } => cmd_play(&file, config, count),
        Commands::Demo { output, frames } => cmd_demo(&output, config, frames),
    }
}

fn load_config(path: Option<&Path>) -> Result<TimelineConfig> {
    match path {
        Some(path) => TimelineConfig::load(path)
            .with_context(|| format!("reading config {}", path.display())),
        None => Ok(TimelineConfig::default()),
    }
}

fn open(file: &Path, config: TimelineConfig) -> Result<Timeline> {
    Timeline::load_json(file, config).with_context(|| format!("loading {}", file.display()))
}

/// One character per frame: `K` keyframe, `k` empty keyframe, `>` tween
/// interior, `-` extended frame, `.` empty.
fn frame_map(layer: &Layer, total: u32) -> String {
    (1..=total)
        .map(|frame| match layer.frame_type(frame) {
            FrameType::Keyframe if layer.persisted_items(frame).is_empty() => 'k',
            FrameType::Keyframe => 'K',
            FrameType::ExtendedFrame if layer.tween_covering(frame).is_some() => '>',
            FrameType::ExtendedFrame => '-',
            FrameType::Empty => '.',
        })
        .collect()
}

fn cmd_inspect(file: &Path, config: TimelineConfig) -> Result<()> {
    let tl = open(file, config)?;
    println!(
        "{}: {}x{} @ {} fps, {} frames",
        file.display(),
        tl.config().canvas_width,
        tl.config().canvas_height,
        tl.config().fps,
        tl.total_frames()
    );
    for (index, layer) in tl.layers().iter().enumerate().rev() {
        let mut flags = Vec::new();
        if !layer.is_visible() {
            flags.push("hidden");
        }
        if layer.is_locked() {
            flags.push("locked");
        }
        println!(
            "  [{index}] {:<16} {} opacity {:.2} {} {}",
            layer.name(),
            frame_map(layer, tl.total_frames()),
            layer.opacity(),
            layer.blend_mode(),
            flags.join(",")
        );
    }
    Ok(())
}

fn cmd_frame(file: &Path, config: TimelineConfig, frame: u32, onion: bool) -> Result<()> {
    let mut tl = open(file, config)?;
    if frame == 0 || frame > tl.total_frames() {
        bail!("frame {frame} is outside 1..={}", tl.total_frames());
    }
    tl.set_onion_skin_enabled(onion);
    tl.set_current_frame(frame);

    let entries: Vec<serde_json::Value> = tl
        .scene()
        .in_z_order()
        .into_iter()
        .filter(|(key, _)| onion || key.role == DisplayRole::Live)
        .map(|(key, entry)| {
            serde_json::json!({
                "item": key.item.to_string(),
                "role": format!("{:?}", key.role),
                "layer": entry.placement.layer.to_string(),
                "z": entry.placement.z,
                "opacity": entry.placement.opacity,
                "kind": format!("{:?}", entry.placement.kind),
                "data": entry.item,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

fn cmd_tween(
    file: &Path,
    config: TimelineConfig,
    layer: usize,
    start: u32,
    end: u32,
    easing: &str,
    output: Option<&Path>,
) -> Result<()> {
    let easing: Easing = easing.parse()?;
    let mut tl = open(file, config)?;
    tl.set_current_layer(layer)?;
    tl.apply_tweening(start, end, easing)
        .with_context(|| format!("tweening {start}..{end} on layer {layer}"))?;
    let output = output.unwrap_or(file);
    tl.save_json(output)?;
    info!(path = %output.display(), start, end, %easing, "tween saved");
    Ok(())
}

fn cmd_play(file: &Path, config: TimelineConfig, count: u32) -> Result<()> {
    let mut tl = open(file, config)?;
    let mut playback = Playback::for_timeline(&tl);
    playback.start(Instant::now());
    let mut played = 0;
    while played < count {
        if playback.poll(Instant::now(), &mut tl) {
            played += 1;
            let live = tl
                .displayed_items()
                .iter()
                .filter(|key| key.role == DisplayRole::Live)
                .count();
            println!("frame {:>4}  {live} item(s)", tl.current_frame());
        } else {
            std::thread::sleep(playback.interval() / 4);
        }
    }
    playback.stop();
    Ok(())
}

fn cmd_demo(output: &Path, mut config: TimelineConfig, frames: u32) -> Result<()> {
    if frames < 2 {
        bail!("a demo needs at least 2 frames");
    }
    config.total_frames = frames;
    let mut tl = Timeline::new(config);
    tl.set_layer_name(0, "Square")?;
    tl.add_item(VisualItem::rectangle(40.0, 40.0).with_position(Vec2::new(20.0, 180.0)))?;
    tl.create_keyframe(frames)?;
    let id = tl
        .current_items()
        .first()
        .map(|(id, _)| *id)
        .context("keyframe copy is missing")?;
    tl.edit_item(id, |item| {
        item.transform.position = Vec2::new(480.0, 180.0);
        item.transform.origin = Vec2::new(20.0, 20.0);
        item.transform.rotation = 180.0;
    })?;
    tl.apply_tweening(1, frames, Easing::EaseInOut)?;

    tl.add_layer(Some("Background"));
    tl.set_current_frame(1);
    tl.add_item(VisualItem::rectangle(550.0, 400.0))?;
    tl.create_extended_frame(frames)?;
    tl.move_layer(1, 0)?;
    tl.set_layer_locked(0, true)?;

    tl.save_json(output)
        .with_context(|| format!("writing {}", output.display()))?;
    info!(path = %output.display(), frames, "demo written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_map_marks_each_frame_kind() {
        let mut tl = Timeline::new(TimelineConfig {
            total_frames: 8,
            ..TimelineConfig::default()
        });
        tl.add_item(VisualItem::rectangle(1.0, 1.0)).unwrap();
        tl.apply_tweening(1, 4, Easing::Linear).unwrap();
        tl.create_extended_frame(6).unwrap();
        tl.create_blank_keyframe(8).unwrap();
        assert_eq!(frame_map(tl.layer(0).unwrap(), 8), "K>>K--.k");
    }

    #[test]
    fn demo_document_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.json");
        cmd_demo(&path, TimelineConfig::default(), 12).unwrap();

        let tl = open(&path, TimelineConfig::default()).unwrap();
        assert_eq!(tl.total_frames(), 12);
        assert_eq!(tl.layer(0).unwrap().name(), "Background");
        assert!(tl.layer(0).unwrap().is_locked());
        assert_eq!(frame_map(tl.layer(1).unwrap(), 12), "K>>>>>>>>>>K");
    }
}
