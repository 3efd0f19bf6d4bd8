use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use renderer::HostEvent;
use wallconfig::{parse_audio_source, parse_color, parse_size, AudioSource, Rgba};

#[derive(Parser, Debug)]
#[command(
    name = "gifwall",
    author,
    version,
    about = "Animated GIF live wallpaper",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Asset name (looked up in the asset directories) or path to a GIF.
    #[arg(value_name = "ASSET")]
    pub asset: Option<String>,

    /// Configuration file; defaults to `gifwall.toml` in the config directory.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Surface size in pixels (e.g. `1080x1920`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Redraw rate.
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Background colour behind the animation (`#RRGGBB` or `#RRGGBBAA`).
    #[arg(long, value_name = "COLOUR", value_parser = parse_color)]
    pub background: Option<Rgba>,

    /// Audio signal: `active`, `inactive`, or `file:PATH` to poll a flag file.
    #[arg(long, value_name = "SOURCE", value_parser = parse_audio_source)]
    pub audio: Option<AudioSource>,

    /// Stop after this many frames have been presented.
    #[arg(long, value_name = "COUNT")]
    pub frames: Option<u64>,

    /// Stop after this long (e.g. `5s`, `2m`).
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,

    /// Write the last presented frame to this PNG file on exit.
    #[arg(long, value_name = "PATH")]
    pub snapshot: Option<PathBuf>,

    /// Read host events (`show`, `hide`, `resize WxH`, ...) from stdin.
    #[arg(long)]
    pub stdin_events: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode an asset and report its size, frames, and fitted transform.
    Probe(ProbeArgs),
    /// Print resolved config and asset directories.
    Where,
}

#[derive(Parser, Debug)]
pub struct ProbeArgs {
    /// Asset name or path to a GIF.
    #[arg(value_name = "ASSET")]
    pub asset: String,

    /// Surface size to fit the asset into.
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Emit the report as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

/// Parses one line of the stdin event protocol. Blank lines yield `None`.
pub fn parse_event_line(line: &str) -> Result<Option<HostEvent>, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let argument = words.next();

    let event = match command.to_ascii_lowercase().as_str() {
        "show" | "visible" => HostEvent::Visibility(true),
        "hide" | "hidden" => HostEvent::Visibility(false),
        "offsets" | "scroll" => HostEvent::OffsetsChanged,
        "destroy" => HostEvent::SurfaceDestroyed,
        "quit" | "exit" | "shutdown" => HostEvent::Shutdown,
        "create" | "resize" => {
            let raw = argument.ok_or_else(|| format!("'{command}' requires WIDTHxHEIGHT"))?;
            let (width, height) = parse_size(raw)?;
            if command.eq_ignore_ascii_case("create") {
                HostEvent::SurfaceCreated { width, height }
            } else {
                HostEvent::SurfaceChanged { width, height }
            }
        }
        other => return Err(format!("unknown host event '{other}'")),
    };
    Ok(Some(event))
}
