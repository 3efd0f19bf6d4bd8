use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::animation::AnimatedImage;
use crate::engine::WallpaperEngine;
use crate::surface::MemorySurface;

/// Lifecycle signals a host environment pushes to the wallpaper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    Visibility(bool),
    SurfaceCreated { width: u32, height: u32 },
    SurfaceChanged { width: u32, height: u32 },
    SurfaceDestroyed,
    OffsetsChanged,
    Shutdown,
}

/// Why [`WallpaperHost::run_until`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostExit {
    Shutdown,
    Disconnected,
    Deadline,
    FrameLimit,
}

/// Single-threaded main loop: applies host events and pumps engine ticks.
///
/// Other threads talk to the wallpaper only by sending [`HostEvent`]s; the
/// engine, its animation, and the surface never leave the loop's thread.
pub struct WallpaperHost<A: AnimatedImage> {
    engine: WallpaperEngine<A>,
    surface: MemorySurface,
    events: Receiver<HostEvent>,
    frame_limit: Option<u64>,
}

impl<A: AnimatedImage> WallpaperHost<A> {
    pub fn new(
        engine: WallpaperEngine<A>,
        surface: MemorySurface,
        events: Receiver<HostEvent>,
    ) -> Self {
        Self {
            engine,
            surface,
            events,
            frame_limit: None,
        }
    }

    /// Stops the loop once this many frames have been presented.
    pub fn with_frame_limit(mut self, frames: Option<u64>) -> Self {
        self.frame_limit = frames;
        self
    }

    pub fn engine(&self) -> &WallpaperEngine<A> {
        &self.engine
    }

    pub fn surface(&self) -> &MemorySurface {
        &self.surface
    }

    /// Runs until shutdown, disconnection, the frame limit, or `deadline`.
    pub fn run_until(&mut self, deadline: Option<Instant>) -> HostExit {
        loop {
            let now = Instant::now();
            self.engine.dispatch(&mut self.surface, now);

            if let Some(limit) = self.frame_limit {
                if self.surface.presented_frames() >= limit {
                    return self.finish(HostExit::FrameLimit);
                }
            }
            if deadline.is_some_and(|deadline| now >= deadline) {
                return self.finish(HostExit::Deadline);
            }

            let wake = match (self.engine.next_deadline(), deadline) {
                (Some(next), Some(deadline)) => Some(next.min(deadline)),
                (next, deadline) => next.or(deadline),
            };

            let received = match wake {
                Some(at) => match self.events.recv_deadline(at) {
                    Ok(event) => Some(event),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => {
                        return self.finish(HostExit::Disconnected)
                    }
                },
                None => match self.events.recv() {
                    Ok(event) => Some(event),
                    Err(_) => return self.finish(HostExit::Disconnected),
                },
            };

            if let Some(event) = received {
                if !self.apply(event, Instant::now()) {
                    return HostExit::Shutdown;
                }
            }
        }
    }

    /// Applies one host event; returns `false` once the host asked to stop.
    pub fn apply(&mut self, event: HostEvent, now: Instant) -> bool {
        tracing::debug!(?event, "host event");
        match event {
            HostEvent::Visibility(visible) => self.engine.on_visibility_changed(visible, now),
            HostEvent::SurfaceCreated { width, height } => {
                self.surface.resize(width, height);
                self.surface.set_available(true);
                self.engine.on_surface_created(width, height, now);
            }
            HostEvent::SurfaceChanged { width, height } => {
                self.surface.resize(width, height);
                self.engine.on_surface_changed(width, height, now);
            }
            HostEvent::SurfaceDestroyed => {
                self.surface.set_available(false);
                self.engine.on_surface_destroyed();
            }
            HostEvent::OffsetsChanged => self.engine.on_offsets_changed(now),
            HostEvent::Shutdown => {
                self.engine.shutdown();
                return false;
            }
        }
        true
    }

    fn finish(&mut self, reason: HostExit) -> HostExit {
        tracing::debug!(?reason, "host loop finished");
        self.engine.shutdown();
        reason
    }
}
