//! Renderer crate for gifwall (animated GIF live wallpaper).
//!
//! The crate turns a decoded GIF into a wallpaper that redraws itself at a
//! fixed cadence and freezes while no audio is playing. The overall flow is:
//!
//! ```text
//!   host signals (HostEvent over crossbeam)
//!          │
//!          ▼
//!   WallpaperHost::run_until ──▶ WallpaperEngine::on_*  (visibility, surface)
//!          │                             │ posts EngineTask::Draw
//!          ▼                             ▼
//!   WallpaperEngine::dispatch ──▶ render_frame() ──▶ lock surface
//!                                        │            translate + scale
//!                                        │            background fill
//!                                        └─▶ AudioActivity? draw+start : stop+draw
//! ```
//!
//! `WallpaperEngine` owns the animation and a `scheduler::MessageQueue` of
//! pending ticks; the surface is only lent to it for one `dispatch` call.
//! Platform pieces (surface, audio probe, animated image) are traits so a
//! host can plug in its own implementations; `MemorySurface`,
//! `GifAnimation`, and the probes in [`audio`] are the software defaults.

pub mod animation;
pub mod audio;
mod canvas;
mod engine;
mod error;
pub mod host;
mod scale;
mod surface;

pub use animation::{AnimatedImage, GifAnimation, GifFrame};
pub use audio::{audio_from_source, AudioActivity, FixedAudio, FlagFileAudio, SharedAudioFlag};
pub use canvas::Canvas;
pub use engine::{
    EngineOptions, EngineState, EngineTask, FrameOutcome, FrameStats, WallpaperEngine,
};
pub use error::{RenderError, SurfaceError};
pub use host::{HostEvent, HostExit, WallpaperHost};
pub use scale::ScaleTransform;
pub use surface::{lock, LockedCanvas, MemorySurface, Surface};
