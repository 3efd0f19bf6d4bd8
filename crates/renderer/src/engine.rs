use std::time::{Duration, Instant};

use image::Rgba;
use scheduler::MessageQueue;

use crate::animation::{AnimatedImage, GifAnimation};
use crate::audio::AudioActivity;
use crate::canvas::Canvas;
use crate::error::RenderError;
use crate::scale::ScaleTransform;
use crate::surface::{self, Surface};

/// Work items the engine posts to its message queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineTask {
    /// One-shot start of playback, queued when the engine is created.
    StartPlayback,
    /// Render one frame and reschedule.
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No ticks are scheduled.
    Hidden,
    /// Ticks are scheduled while a surface exists.
    Visible,
    /// Terminal; all host signals are ignored.
    ShutDown,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineOptions {
    pub frame_interval: Duration,
    pub background: Rgba<u8>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from_config(&wallconfig::WallpaperConfig::default())
    }
}

impl EngineOptions {
    pub fn new(frame_interval: Duration, background: wallconfig::Rgba) -> Self {
        Self {
            frame_interval,
            background: Rgba(background.0),
        }
    }

    pub fn from_config(config: &wallconfig::WallpaperConfig) -> Self {
        Self::new(config.frame_interval(), config.background())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented,
    /// The surface could not be locked; nothing was drawn.
    Skipped,
    /// Drawing failed after the surface was locked; the canvas was still presented.
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub rendered: u64,
    pub skipped: u64,
    pub failed: u64,
}

/// Animated wallpaper engine driven by host lifecycle signals.
///
/// The engine owns the animation and a queue of pending ticks. The host
/// delivers lifecycle signals through the `on_*` methods and pumps the queue
/// with [`WallpaperEngine::dispatch`], lending the surface for the duration of
/// the call. At most one [`EngineTask::Draw`] is ever pending.
pub struct WallpaperEngine<A: AnimatedImage = GifAnimation> {
    animation: A,
    audio: Box<dyn AudioActivity>,
    options: EngineOptions,
    transform: Option<ScaleTransform>,
    surface_size: Option<(u32, u32)>,
    state: EngineState,
    queue: MessageQueue<EngineTask>,
    stats: FrameStats,
}

impl<A: AnimatedImage> WallpaperEngine<A> {
    pub fn new(
        animation: A,
        audio: impl AudioActivity + 'static,
        options: EngineOptions,
        now: Instant,
    ) -> Self {
        Self::with_boxed_audio(animation, Box::new(audio), options, now)
    }

    pub fn with_boxed_audio(
        animation: A,
        audio: Box<dyn AudioActivity>,
        options: EngineOptions,
        now: Instant,
    ) -> Self {
        let mut queue = MessageQueue::new();
        // A fresh queue is never closed.
        let _ = queue.post(EngineTask::StartPlayback, now);
        let (width, height) = animation.intrinsic_size();
        tracing::debug!(
            width,
            height,
            interval_ms = options.frame_interval.as_millis() as u64,
            "wallpaper engine created"
        );
        Self {
            animation,
            audio,
            options,
            transform: None,
            surface_size: None,
            state: EngineState::Hidden,
            queue,
            stats: FrameStats::default(),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn transform(&self) -> Option<ScaleTransform> {
        self.transform
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn animation(&self) -> &A {
        &self.animation
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.next_deadline()
    }

    pub fn pending_draws(&self) -> usize {
        self.queue.pending_count(&EngineTask::Draw)
    }

    pub fn on_surface_created(&mut self, width: u32, height: u32, now: Instant) {
        self.on_surface_changed(width, height, now);
    }

    pub fn on_surface_changed(&mut self, width: u32, height: u32, now: Instant) {
        if self.state == EngineState::ShutDown {
            return;
        }
        self.surface_size = Some((width, height));
        self.on_surface_ready(width, height);
        if self.state == EngineState::Visible {
            self.schedule_draw(now, Duration::ZERO);
        }
    }

    /// Recomputes the cached transform for a surface of `width` x `height`.
    pub fn on_surface_ready(&mut self, width: u32, height: u32) -> Option<ScaleTransform> {
        self.transform = ScaleTransform::fit(self.animation.intrinsic_size(), (width, height));
        match self.transform {
            Some(transform) => tracing::debug!(
                width,
                height,
                scale = transform.scale,
                offset_x = transform.offset_x,
                offset_y = transform.offset_y,
                "updated wallpaper transform"
            ),
            None => tracing::debug!(width, height, "surface has no drawable area"),
        }
        self.transform
    }

    pub fn on_surface_destroyed(&mut self) {
        self.surface_size = None;
        self.queue.remove(&EngineTask::Draw);
    }

    pub fn on_visibility_changed(&mut self, visible: bool, now: Instant) {
        match (self.state, visible) {
            (EngineState::ShutDown, _) => {}
            (_, true) => {
                self.state = EngineState::Visible;
                if self.surface_size.is_some() {
                    self.schedule_draw(now, Duration::ZERO);
                }
            }
            (_, false) => {
                self.state = EngineState::Hidden;
                self.queue.remove(&EngineTask::Draw);
            }
        }
    }

    /// Wallpaper scrolled inside its container; redraw promptly.
    pub fn on_offsets_changed(&mut self, now: Instant) {
        if self.state == EngineState::Visible && self.surface_size.is_some() {
            self.schedule_draw(now, Duration::ZERO);
        }
    }

    /// Cancels pending ticks and stops reacting to host signals. Idempotent.
    pub fn shutdown(&mut self) {
        if self.state == EngineState::ShutDown {
            return;
        }
        self.state = EngineState::ShutDown;
        self.queue.quit();
        tracing::info!(
            rendered = self.stats.rendered,
            skipped = self.stats.skipped,
            failed = self.stats.failed,
            "wallpaper engine shut down"
        );
    }

    /// Runs every task due at `now`, returning how many ran.
    ///
    /// Tasks posted while dispatching wait for the next call.
    pub fn dispatch<S: Surface + ?Sized>(&mut self, surface: &mut S, now: Instant) -> usize {
        let due = self.queue.take_due(now);
        let count = due.len();
        for task in due {
            match task {
                EngineTask::StartPlayback => self.animation.start(now),
                EngineTask::Draw => self.tick(surface, now),
            }
        }
        count
    }

    fn tick<S: Surface + ?Sized>(&mut self, surface: &mut S, now: Instant) {
        self.render_frame(surface, now);
        if self.state == EngineState::Visible && self.surface_size.is_some() {
            self.schedule_draw(now, self.options.frame_interval);
        }
    }

    fn schedule_draw(&mut self, now: Instant, delay: Duration) {
        self.queue.remove(&EngineTask::Draw);
        if let Err(err) = self.queue.post_delayed(EngineTask::Draw, now, delay) {
            tracing::debug!(error = %err, "draw not scheduled");
        }
    }

    /// Locks the surface, draws one frame, and presents it.
    ///
    /// Never fails: an unavailable surface skips the frame, and drawing errors
    /// are logged after the canvas has been presented.
    pub fn render_frame<S: Surface + ?Sized>(&mut self, surface: &mut S, now: Instant) -> FrameOutcome {
        let mut canvas = match surface::lock(surface) {
            Ok(canvas) => canvas,
            Err(err) => {
                tracing::debug!(error = %err, "skipping frame");
                self.stats.skipped += 1;
                return FrameOutcome::Skipped;
            }
        };
        let result = self.paint(&mut canvas, now);
        drop(canvas);

        match result {
            Ok(()) => {
                self.stats.rendered += 1;
                FrameOutcome::Presented
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to draw wallpaper frame");
                self.stats.failed += 1;
                FrameOutcome::Failed
            }
        }
    }

    fn paint(&mut self, canvas: &mut Canvas, now: Instant) -> Result<(), RenderError> {
        let transform = match self.transform {
            Some(transform) => transform,
            None => {
                let (width, height) = canvas.size();
                self.on_surface_ready(width, height)
                    .ok_or_else(|| {
                        let (image_width, image_height) = self.animation.intrinsic_size();
                        RenderError::DegenerateSize {
                            image_width,
                            image_height,
                            surface_width: width,
                            surface_height: height,
                        }
                    })?
            }
        };

        canvas.translate(transform.offset_x as f32, transform.offset_y as f32);
        canvas.scale(transform.scale);
        canvas.draw_color(self.options.background);

        if self.audio.is_audio_active() {
            self.animation.draw(canvas, now)?;
            self.animation.start(now);
        } else {
            self.animation.stop();
            self.animation.draw(canvas, now)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::GifFrame;
    use crate::audio::{FixedAudio, SharedAudioFlag};
    use crate::error::SurfaceError;
    use crate::surface::MemorySurface;
    use image::RgbaImage;

    const INTERVAL: Duration = Duration::from_millis(16);
    const GREY: Rgba<u8> = Rgba([128, 128, 128, 255]);

    fn shade(frame: usize) -> Rgba<u8> {
        Rgba([frame as u8 * 40, 0, 200, 255])
    }

    fn animation(frames: usize) -> GifAnimation {
        GifAnimation::from_frames(
            (0..frames)
                .map(|index| {
                    GifFrame::new(
                        RgbaImage::from_pixel(4, 2, shade(index)),
                        Duration::from_millis(50),
                    )
                })
                .collect(),
        )
        .unwrap()
    }

    fn options() -> EngineOptions {
        EngineOptions {
            frame_interval: INTERVAL,
            background: GREY,
        }
    }

    fn visible_engine(
        audio: SharedAudioFlag,
        surface: &mut MemorySurface,
        now: Instant,
    ) -> WallpaperEngine {
        let mut engine = WallpaperEngine::new(animation(4), audio, options(), now);
        let (width, height) = surface.size();
        engine.on_surface_created(width, height, now);
        engine.on_visibility_changed(true, now);
        engine
    }

    fn centre_pixel(surface: &MemorySurface) -> Rgba<u8> {
        let front = surface.front_buffer().expect("a presented frame");
        *front.get_pixel(front.width() / 2, front.height() / 2)
    }

    #[test]
    fn starts_hidden_with_playback_queued() {
        let now = Instant::now();
        let mut surface = MemorySurface::new(8, 8);
        let mut engine = WallpaperEngine::new(animation(2), FixedAudio(true), options(), now);
        assert_eq!(engine.state(), EngineState::Hidden);
        assert_eq!(engine.pending_draws(), 0);

        assert_eq!(engine.dispatch(&mut surface, now), 1);
        assert!(engine.animation().is_running());
        assert_eq!(surface.presented_frames(), 0);
    }

    #[test]
    fn draws_scaled_and_centred_frame() {
        let now = Instant::now();
        let mut surface = MemorySurface::new(8, 16);
        let mut engine = visible_engine(SharedAudioFlag::new(true), &mut surface, now);

        let transform = engine.transform().unwrap();
        assert_eq!(transform.scale, 2.0);
        assert_eq!((transform.offset_x, transform.offset_y), (0, 6));

        engine.dispatch(&mut surface, now);
        assert_eq!(surface.presented_frames(), 1);
        let front = surface.front_buffer().unwrap();
        assert_eq!(*front.get_pixel(0, 0), GREY);
        assert_eq!(*front.get_pixel(0, 6), shade(0));
        assert_eq!(*front.get_pixel(7, 9), shade(0));
        assert_eq!(*front.get_pixel(7, 10), GREY);
    }

    #[test]
    fn ticks_repeat_at_frame_interval() {
        let t0 = Instant::now();
        let mut surface = MemorySurface::new(8, 8);
        let mut engine = visible_engine(SharedAudioFlag::new(true), &mut surface, t0);

        engine.dispatch(&mut surface, t0);
        assert_eq!(engine.next_deadline(), Some(t0 + INTERVAL));
        assert_eq!(engine.dispatch(&mut surface, t0 + INTERVAL / 2), 0);
        engine.dispatch(&mut surface, t0 + INTERVAL);
        engine.dispatch(&mut surface, t0 + INTERVAL * 2);
        assert_eq!(surface.presented_frames(), 3);
        assert_eq!(engine.pending_draws(), 1);
    }

    #[test]
    fn silence_freezes_on_last_drawn_frame() {
        let audio = SharedAudioFlag::new(true);
        let t0 = Instant::now();
        let mut surface = MemorySurface::new(4, 2);
        let mut engine = visible_engine(audio.clone(), &mut surface, t0);

        // Run through to the third frame (50ms per frame).
        let mut now = t0;
        while now <= t0 + Duration::from_millis(112) {
            engine.dispatch(&mut surface, now);
            now += INTERVAL;
        }
        let drawn = engine.animation().current_frame();
        assert_eq!(drawn, 2);
        assert_eq!(centre_pixel(&surface), shade(2));

        audio.set(false);
        for _ in 0..20 {
            engine.dispatch(&mut surface, now);
            now += INTERVAL;
        }
        assert!(!engine.animation().is_running());
        assert_eq!(engine.animation().current_frame(), drawn);
        assert_eq!(centre_pixel(&surface), shade(drawn));

        audio.set(true);
        engine.dispatch(&mut surface, now);
        assert!(engine.animation().is_running());
        assert_eq!(engine.animation().current_frame(), drawn);
    }

    #[test]
    fn rapid_visibility_flips_keep_one_pending_tick() {
        let now = Instant::now();
        let mut surface = MemorySurface::new(8, 8);
        let mut engine = visible_engine(SharedAudioFlag::new(true), &mut surface, now);

        for _ in 0..5 {
            engine.on_visibility_changed(false, now);
            assert_eq!(engine.pending_draws(), 0);
            engine.on_visibility_changed(true, now);
            engine.on_visibility_changed(true, now);
            engine.on_offsets_changed(now);
            assert_eq!(engine.pending_draws(), 1);
        }
        engine.on_surface_changed(8, 8, now);
        assert_eq!(engine.pending_draws(), 1);
    }

    #[test]
    fn hidden_engine_stops_ticking() {
        let t0 = Instant::now();
        let mut surface = MemorySurface::new(8, 8);
        let mut engine = visible_engine(SharedAudioFlag::new(true), &mut surface, t0);
        engine.dispatch(&mut surface, t0);
        engine.on_visibility_changed(false, t0);
        assert_eq!(engine.next_deadline(), None);
        assert_eq!(engine.dispatch(&mut surface, t0 + INTERVAL * 10), 0);
        assert_eq!(surface.presented_frames(), 1);

        // Surface changes while hidden refresh the transform without ticking.
        engine.on_surface_changed(16, 4, t0);
        assert_eq!(engine.pending_draws(), 0);
        assert_eq!(engine.transform().unwrap().scale, 2.0);
    }

    #[test]
    fn unavailable_surface_skips_frame_but_keeps_ticking() {
        let t0 = Instant::now();
        let mut surface = MemorySurface::new(8, 8);
        let mut engine = visible_engine(SharedAudioFlag::new(true), &mut surface, t0);
        surface.set_available(false);

        engine.dispatch(&mut surface, t0);
        assert_eq!(engine.stats().skipped, 1);
        assert_eq!(engine.pending_draws(), 1);

        surface.set_available(true);
        engine.dispatch(&mut surface, t0 + INTERVAL);
        assert_eq!(engine.stats().rendered, 1);
        assert_eq!(surface.presented_frames(), 1);
    }

    #[test]
    fn destroyed_surface_cancels_ticks_until_recreated() {
        let t0 = Instant::now();
        let mut surface = MemorySurface::new(8, 8);
        let mut engine = visible_engine(SharedAudioFlag::new(true), &mut surface, t0);
        engine.on_surface_destroyed();
        assert_eq!(engine.pending_draws(), 0);
        engine.on_visibility_changed(true, t0);
        assert_eq!(engine.pending_draws(), 0);

        engine.on_surface_created(8, 8, t0);
        assert_eq!(engine.pending_draws(), 1);
    }

    #[test]
    fn transform_is_computed_lazily_from_canvas() {
        let now = Instant::now();
        let mut surface = MemorySurface::new(4, 8);
        let mut engine = WallpaperEngine::new(animation(1), FixedAudio(false), options(), now);
        assert!(engine.transform().is_none());

        assert_eq!(engine.render_frame(&mut surface, now), FrameOutcome::Presented);
        let transform = engine.transform().unwrap();
        assert_eq!(transform.scale, 1.0);
        assert_eq!((transform.offset_x, transform.offset_y), (0, 3));
    }

    #[test]
    fn drawing_errors_still_present_the_canvas() {
        struct Broken;
        impl AnimatedImage for Broken {
            fn intrinsic_size(&self) -> (u32, u32) {
                (2, 2)
            }
            fn start(&mut self, _now: Instant) {}
            fn stop(&mut self) {}
            fn is_running(&self) -> bool {
                false
            }
            fn current_frame(&self) -> usize {
                0
            }
            fn draw(&mut self, _canvas: &mut Canvas, _now: Instant) -> Result<(), RenderError> {
                Err(RenderError::EmptyAnimation)
            }
        }

        let now = Instant::now();
        let mut surface = MemorySurface::new(4, 4);
        let mut engine = WallpaperEngine::new(Broken, FixedAudio(true), options(), now);
        engine.on_surface_created(4, 4, now);
        engine.on_visibility_changed(true, now);
        engine.dispatch(&mut surface, now);

        assert_eq!(engine.stats().failed, 1);
        assert_eq!(surface.presented_frames(), 1);
        assert_eq!(engine.pending_draws(), 1);
        assert_eq!(surface.acquire().map(|_| ()), Ok(()));
    }

    #[test]
    fn shutdown_is_idempotent_and_terminal() {
        let now = Instant::now();
        let mut surface = MemorySurface::new(8, 8);
        let mut engine = visible_engine(SharedAudioFlag::new(true), &mut surface, now);
        engine.shutdown();
        assert_eq!(engine.state(), EngineState::ShutDown);
        assert_eq!(engine.next_deadline(), None);

        engine.shutdown();
        assert_eq!(engine.state(), EngineState::ShutDown);

        engine.on_visibility_changed(true, now);
        engine.on_surface_changed(8, 8, now);
        assert_eq!(engine.state(), EngineState::ShutDown);
        assert_eq!(engine.pending_draws(), 0);
        assert_eq!(engine.dispatch(&mut surface, now), 0);
    }

    #[test]
    fn zero_sized_surface_has_no_transform() {
        let now = Instant::now();
        let mut engine = WallpaperEngine::new(animation(1), FixedAudio(true), options(), now);
        assert!(engine.on_surface_ready(0, 100).is_none());
        let mut surface = MemorySurface::new(0, 100);
        assert_eq!(engine.render_frame(&mut surface, now), FrameOutcome::Skipped);
        assert_eq!(surface.acquire().map(|_| ()), Err(SurfaceError::Unavailable));
    }
}
