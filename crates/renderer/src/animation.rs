use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::time::{Duration, Instant};

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, RgbaImage};

use crate::canvas::Canvas;
use crate::error::RenderError;

/// Frames shorter than this are shown for [`DEFAULT_FRAME_DELAY`] instead.
pub const MIN_FRAME_DELAY: Duration = Duration::from_millis(20);
pub const DEFAULT_FRAME_DELAY: Duration = Duration::from_millis(100);

/// Decoded multi-frame image with its own play/pause control.
pub trait AnimatedImage {
    fn intrinsic_size(&self) -> (u32, u32);

    /// Resumes playback from the current frame. No-op while already running.
    fn start(&mut self, now: Instant);

    /// Freezes playback on the current frame.
    fn stop(&mut self);

    fn is_running(&self) -> bool;

    fn current_frame(&self) -> usize;

    /// Advances to the frame due at `now` when running, then draws it at the
    /// canvas origin.
    fn draw(&mut self, canvas: &mut Canvas, now: Instant) -> Result<(), RenderError>;
}

#[derive(Debug, Clone)]
pub struct GifFrame {
    pixels: RgbaImage,
    delay: Duration,
}

impl GifFrame {
    pub fn new(pixels: RgbaImage, delay: Duration) -> Self {
        let delay = if delay < MIN_FRAME_DELAY {
            DEFAULT_FRAME_DELAY
        } else {
            delay
        };
        Self { pixels, delay }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Playback {
    Stopped,
    /// `frame_started` is when the current frame first became visible.
    Running { frame_started: Instant },
}

/// Fully composited GIF animation that loops forever.
#[derive(Debug, Clone)]
pub struct GifAnimation {
    frames: Vec<GifFrame>,
    size: (u32, u32),
    current: usize,
    playback: Playback,
    loop_duration: Duration,
}

impl GifAnimation {
    pub fn decode(bytes: &[u8]) -> Result<Self, RenderError> {
        let decoder = GifDecoder::new(Cursor::new(bytes))?;
        let frames = decoder
            .into_frames()
            .collect_frames()?
            .into_iter()
            .map(|frame| {
                let delay = Duration::from(frame.delay());
                GifFrame::new(frame.into_buffer(), delay)
            })
            .collect();
        Self::from_frames(frames)
    }

    pub fn open(path: &Path) -> Result<Self, RenderError> {
        let bytes = fs::read(path).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let animation = Self::decode(&bytes)?;
        tracing::debug!(
            path = %path.display(),
            width = animation.size.0,
            height = animation.size.1,
            frames = animation.frames.len(),
            "decoded animated image"
        );
        Ok(animation)
    }

    /// Builds an animation from already composited frames. The intrinsic size
    /// is taken from the first frame.
    pub fn from_frames(frames: Vec<GifFrame>) -> Result<Self, RenderError> {
        let first = frames.first().ok_or(RenderError::EmptyAnimation)?;
        let size = first.pixels.dimensions();
        let loop_duration = frames.iter().map(|frame| frame.delay).sum();
        Ok(Self {
            frames,
            size,
            current: 0,
            playback: Playback::Stopped,
            loop_duration,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn loop_duration(&self) -> Duration {
        self.loop_duration
    }

    fn advance(&mut self, now: Instant) {
        let Playback::Running { mut frame_started } = self.playback else {
            return;
        };
        if self.frames.len() < 2 {
            return;
        }

        let mut elapsed = now.saturating_duration_since(frame_started);
        let loop_nanos = self.loop_duration.as_nanos();
        if loop_nanos > 0 && elapsed.as_nanos() >= loop_nanos {
            // Whole loops land back on the same frame; skip them outright.
            let whole = (elapsed.as_nanos() / loop_nanos) * loop_nanos;
            let whole = Duration::from_nanos(u64::try_from(whole).unwrap_or(u64::MAX));
            frame_started += whole;
            elapsed = elapsed.saturating_sub(whole);
        }

        while elapsed >= self.frames[self.current].delay {
            let delay = self.frames[self.current].delay;
            elapsed -= delay;
            frame_started += delay;
            self.current = (self.current + 1) % self.frames.len();
        }
        self.playback = Playback::Running { frame_started };
    }
}

impl AnimatedImage for GifAnimation {
    fn intrinsic_size(&self) -> (u32, u32) {
        self.size
    }

    fn start(&mut self, now: Instant) {
        if self.playback == Playback::Stopped {
            self.playback = Playback::Running { frame_started: now };
        }
    }

    fn stop(&mut self) {
        self.playback = Playback::Stopped;
    }

    fn is_running(&self) -> bool {
        matches!(self.playback, Playback::Running { .. })
    }

    fn current_frame(&self) -> usize {
        self.current
    }

    fn draw(&mut self, canvas: &mut Canvas, now: Instant) -> Result<(), RenderError> {
        self.advance(now);
        canvas.draw_image(&self.frames[self.current].pixels);
        Ok(())
    }
}
