use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use renderer::{
    audio_from_source, EngineOptions, GifAnimation, HostEvent, MemorySurface, WallpaperEngine,
    WallpaperHost,
};
use tracing_subscriber::EnvFilter;
use wallconfig::{frame_interval_for_fps, AudioSource, Rgba, WallpaperConfig};

use crate::cli::{parse_event_line, RunArgs};
use crate::paths::AppPaths;

/// Effective settings after layering CLI flags over the config file.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub asset: String,
    pub fps: f32,
    pub background: Rgba,
    pub audio: AudioSource,
    pub surface_size: (u32, u32),
    pub run_for: Option<Duration>,
}

impl Settings {
    pub fn resolve(args: &RunArgs, config: &WallpaperConfig) -> Self {
        Self {
            asset: args
                .asset
                .clone()
                .unwrap_or_else(|| config.asset().to_string()),
            fps: args.fps.filter(|fps| *fps > 0.0).unwrap_or_else(|| config.fps()),
            background: args.background.unwrap_or_else(|| config.background()),
            audio: args.audio.clone().unwrap_or_else(|| config.audio()),
            surface_size: args.size.unwrap_or_else(|| config.surface_size()),
            run_for: args.duration.or(config.run_for),
        }
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions::new(frame_interval_for_fps(self.fps), self.background)
    }
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

pub fn load_config(paths: &AppPaths, explicit: Option<&PathBuf>) -> Result<WallpaperConfig> {
    match explicit {
        Some(path) => WallpaperConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => {
            let path = paths.config_file();
            let config = WallpaperConfig::load_or_default(&path)
                .with_context(|| format!("failed to load config from {}", path.display()))?;
            tracing::debug!(path = %path.display(), exists = path.exists(), "resolved config");
            Ok(config)
        }
    }
}

/// Resolves `asset` and decodes it. Lookup and decode failures are both
/// logged before being returned.
pub fn load_animation(paths: &AppPaths, asset: &str) -> Result<(PathBuf, GifAnimation)> {
    let loaded = paths.resolve_asset(asset).and_then(|path| {
        let animation = GifAnimation::open(&path)
            .with_context(|| format!("failed to load {}", path.display()))?;
        Ok((path, animation))
    });
    if let Err(err) = &loaded {
        tracing::error!(error = %format!("{err:#}"), asset, "could not load animated wallpaper");
    }
    loaded
}

pub fn run(args: RunArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let config = load_config(&paths, args.config.as_ref())?;
    let settings = Settings::resolve(&args, &config);
    tracing::debug!(?settings, "resolved wallpaper settings");

    let (path, animation) = load_animation(&paths, &settings.asset)?;
    let (width, height) = settings.surface_size;
    tracing::info!(
        asset = %path.display(),
        frames = animation.frame_count(),
        width,
        height,
        fps = settings.fps,
        "starting gifwall"
    );

    let engine = WallpaperEngine::with_boxed_audio(
        animation,
        audio_from_source(&settings.audio),
        settings.engine_options(),
        Instant::now(),
    );

    let (tx, rx) = crossbeam_channel::unbounded();
    tx.send(HostEvent::SurfaceCreated { width, height })
        .context("host event channel closed")?;
    tx.send(HostEvent::Visibility(true))
        .context("host event channel closed")?;
    if args.stdin_events {
        spawn_stdin_events(tx.clone());
    }

    let mut host =
        WallpaperHost::new(engine, MemorySurface::new(width, height), rx).with_frame_limit(args.frames);
    let deadline = settings.run_for.map(|run_for| Instant::now() + run_for);
    let exit = host.run_until(deadline);
    drop(tx);

    let stats = host.engine().stats();
    tracing::info!(
        ?exit,
        rendered = stats.rendered,
        skipped = stats.skipped,
        failed = stats.failed,
        "gifwall stopped"
    );

    if let Some(path) = args.snapshot.as_ref() {
        let written = host
            .surface()
            .save_png(path)
            .with_context(|| format!("failed to write snapshot to {}", path.display()))?;
        if written {
            tracing::info!(path = %path.display(), "wrote snapshot");
        } else {
            tracing::warn!("no frame was presented; snapshot not written");
        }
    }

    Ok(())
}

fn spawn_stdin_events(tx: Sender<HostEvent>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            match parse_event_line(&line) {
                Ok(Some(event)) => {
                    let stop = event == HostEvent::Shutdown;
                    if tx.send(event).is_err() || stop {
                        break;
                    }
                }
                Ok(None) => {}
                Err(err) => tracing::warn!(error = %err, "ignoring stdin event"),
            }
        }
    });
}
