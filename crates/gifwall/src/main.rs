//! Entry point wiring the CLI surface, directory discovery, and the wallpaper
//! host loop in `run.rs`, plus the `probe` and `where` utility commands.

mod cli;
mod paths;
mod run;

use anyhow::Result;
use cli::{Command, ProbeArgs};
use paths::AppPaths;
use renderer::{AnimatedImage, ScaleTransform};
use serde::Serialize;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Probe(args)) => run_probe(args),
        Some(Command::Where) => run_where(),
        None => run::run(cli.run),
    }
}

#[derive(Debug, Serialize)]
struct ProbeReport {
    path: String,
    width: u32,
    height: u32,
    frames: usize,
    loop_ms: u64,
    surface_width: u32,
    surface_height: u32,
    scale: Option<f32>,
    offset_x: Option<i32>,
    offset_y: Option<i32>,
}

fn run_probe(args: ProbeArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let config = run::load_config(&paths, None)?;
    let (path, animation) = run::load_animation(&paths, &args.asset)?;
    let (width, height) = animation.intrinsic_size();
    let (surface_width, surface_height) = args.size.unwrap_or_else(|| config.surface_size());
    let transform = ScaleTransform::fit((width, height), (surface_width, surface_height));

    let report = ProbeReport {
        path: path.display().to_string(),
        width,
        height,
        frames: animation.frame_count(),
        loop_ms: animation.loop_duration().as_millis() as u64,
        surface_width,
        surface_height,
        scale: transform.map(|t| t.scale),
        offset_x: transform.map(|t| t.offset_x),
        offset_y: transform.map(|t| t.offset_y),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Asset:     {}", report.path);
    println!("Size:      {}x{}", report.width, report.height);
    println!("Frames:    {} ({} ms per loop)", report.frames, report.loop_ms);
    match transform {
        Some(t) => println!(
            "Fit:       scale {} offset ({}, {}) on {}x{}",
            t.scale, t.offset_x, t.offset_y, surface_width, surface_height
        ),
        None => println!("Fit:       none for {surface_width}x{surface_height}"),
    }
    Ok(())
}

fn run_where() -> Result<()> {
    let paths = AppPaths::discover()?;
    println!("Configuration directories:");
    println!("  config:     {}", paths.config_dir().display());
    println!("  data:       {}", paths.data_dir().display());
    println!("  share:      {}", paths.share_dir().display());
    println!("  file:       {}", paths.config_file().display());
    println!("Asset search roots:");
    for root in paths.asset_roots() {
        println!("  {}", root.display());
    }
    Ok(())
}
