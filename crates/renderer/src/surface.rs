use std::ops::{Deref, DerefMut};
use std::path::Path;

use image::RgbaImage;

use crate::canvas::Canvas;
use crate::error::{RenderError, SurfaceError};

/// Drawing target owned by the host and borrowed for one frame at a time.
///
/// `acquire` hands out the back buffer; `present` takes it back and shows it.
/// Every successful `acquire` must be paired with exactly one `present`;
/// [`lock`] enforces that through a drop guard.
pub trait Surface {
    fn acquire(&mut self) -> Result<Canvas, SurfaceError>;
    fn present(&mut self, canvas: Canvas);
}

/// Canvas locked from a surface; presents itself when dropped, including
/// during unwinding.
pub struct LockedCanvas<'a, S: Surface + ?Sized> {
    surface: &'a mut S,
    canvas: Canvas,
}

pub fn lock<S: Surface + ?Sized>(surface: &mut S) -> Result<LockedCanvas<'_, S>, SurfaceError> {
    let canvas = surface.acquire()?;
    Ok(LockedCanvas { surface, canvas })
}

impl<S: Surface + ?Sized> Deref for LockedCanvas<'_, S> {
    type Target = Canvas;

    fn deref(&self) -> &Canvas {
        &self.canvas
    }
}

impl<S: Surface + ?Sized> DerefMut for LockedCanvas<'_, S> {
    fn deref_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }
}

impl<S: Surface + ?Sized> Drop for LockedCanvas<'_, S> {
    fn drop(&mut self) {
        let canvas = std::mem::take(&mut self.canvas);
        self.surface.present(canvas);
    }
}

/// Software surface backed by two RGBA buffers.
#[derive(Debug)]
pub struct MemorySurface {
    size: (u32, u32),
    back: Option<RgbaImage>,
    front: Option<RgbaImage>,
    available: bool,
    locked: bool,
    presented: u64,
}

impl MemorySurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            back: None,
            front: None,
            available: true,
            locked: false,
            presented: 0,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Changes the pixel dimensions; buffers are reallocated on next acquire.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.size != (width, height) {
            self.size = (width, height);
            self.back = None;
        }
    }

    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Last presented frame, if any.
    pub fn front_buffer(&self) -> Option<&RgbaImage> {
        self.front.as_ref()
    }

    pub fn presented_frames(&self) -> u64 {
        self.presented
    }

    pub fn save_png(&self, path: &Path) -> Result<bool, RenderError> {
        let Some(front) = self.front.as_ref() else {
            return Ok(false);
        };
        front
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(RenderError::Snapshot)?;
        Ok(true)
    }
}

impl Surface for MemorySurface {
    fn acquire(&mut self) -> Result<Canvas, SurfaceError> {
        if !self.available || self.size.0 == 0 || self.size.1 == 0 {
            return Err(SurfaceError::Unavailable);
        }
        if self.locked {
            return Err(SurfaceError::Busy);
        }
        let (width, height) = self.size;
        let buffer = match self.back.take() {
            Some(buffer) if buffer.dimensions() == self.size => buffer,
            _ => RgbaImage::new(width, height),
        };
        self.locked = true;
        Ok(Canvas::from_image(buffer))
    }

    fn present(&mut self, canvas: Canvas) {
        self.locked = false;
        let frame = canvas.into_image();
        if frame.dimensions() != self.size {
            tracing::debug!(
                frame = ?frame.dimensions(),
                surface = ?self.size,
                "dropping frame presented after resize"
            );
            return;
        }
        self.back = self.front.replace(frame);
        self.presented += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn lock_presents_on_drop() {
        let mut surface = MemorySurface::new(2, 2);
        {
            let mut canvas = lock(&mut surface).unwrap();
            canvas.draw_color(Rgba([1, 2, 3, 255]));
        }
        assert_eq!(surface.presented_frames(), 1);
        assert_eq!(
            *surface.front_buffer().unwrap().get_pixel(1, 1),
            Rgba([1, 2, 3, 255])
        );
    }

    #[test]
    fn unavailable_surface_refuses_lock() {
        let mut surface = MemorySurface::new(2, 2);
        surface.set_available(false);
        assert!(matches!(lock(&mut surface), Err(SurfaceError::Unavailable)));

        let mut empty = MemorySurface::new(0, 10);
        assert!(matches!(lock(&mut empty), Err(SurfaceError::Unavailable)));
    }

    #[test]
    fn second_acquire_before_present_is_busy() {
        let mut surface = MemorySurface::new(2, 2);
        let canvas = surface.acquire().unwrap();
        assert_eq!(surface.acquire().unwrap_err(), SurfaceError::Busy);
        surface.present(canvas);
        assert!(surface.acquire().is_ok());
    }

    #[test]
    fn present_survives_panicking_draw() {
        let mut surface = MemorySurface::new(2, 2);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _canvas = lock(&mut surface).unwrap();
            panic!("draw failed");
        }));
        assert!(result.is_err());
        assert_eq!(surface.presented_frames(), 1);
        assert!(surface.acquire().is_ok());
    }

    #[test]
    fn resize_reallocates_buffers() {
        let mut surface = MemorySurface::new(2, 2);
        drop(lock(&mut surface).unwrap());
        surface.resize(4, 3);
        let canvas = lock(&mut surface).unwrap();
        assert_eq!(canvas.size(), (4, 3));
    }

    #[test]
    fn saves_front_buffer_as_png() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("frame.png");
        let mut surface = MemorySurface::new(3, 2);
        assert!(!surface.save_png(&path).unwrap());
        drop(lock(&mut surface).unwrap());
        assert!(surface.save_png(&path).unwrap());
        let saved = image::open(&path).unwrap();
        assert_eq!((saved.width(), saved.height()), (3, 2));
    }
}
