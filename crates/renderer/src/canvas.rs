use image::{Pixel, Rgba, RgbaImage};

/// Owned pixel buffer handed out by a [`Surface`](crate::Surface) for one frame.
///
/// The canvas tracks a translate/scale matrix the same way a 2D drawing API
/// does: `translate` and `scale` concatenate onto the current matrix, and
/// image draws are mapped through it. Colour fills ignore the matrix.
#[derive(Debug, Clone)]
pub struct Canvas {
    pixels: RgbaImage,
    translate: (f32, f32),
    scale: f32,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::from_image(RgbaImage::new(0, 0))
    }
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self::from_image(RgbaImage::new(width, height))
    }

    pub fn from_image(pixels: RgbaImage) -> Self {
        Self {
            pixels,
            translate: (0.0, 0.0),
            scale: 1.0,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn size(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.translate.0 += dx * self.scale;
        self.translate.1 += dy * self.scale;
    }

    pub fn scale(&mut self, factor: f32) {
        self.scale *= factor;
    }

    /// Current matrix as `(translate_x, translate_y, scale)`.
    pub fn matrix(&self) -> (f32, f32, f32) {
        (self.translate.0, self.translate.1, self.scale)
    }

    /// Blends `color` over every pixel of the buffer.
    pub fn draw_color(&mut self, color: Rgba<u8>) {
        if color.0[3] == u8::MAX {
            for pixel in self.pixels.pixels_mut() {
                *pixel = color;
            }
        } else {
            for pixel in self.pixels.pixels_mut() {
                pixel.blend(&color);
            }
        }
    }

    /// Draws `image` with its top-left corner at the matrix origin, sampling
    /// nearest-neighbour and blending source-over.
    pub fn draw_image(&mut self, image: &RgbaImage) {
        let scale = self.scale;
        if !(scale > 0.0) || !scale.is_finite() || image.width() == 0 || image.height() == 0 {
            return;
        }

        let (tx, ty) = self.translate;
        let right = tx + image.width() as f32 * scale;
        let bottom = ty + image.height() as f32 * scale;
        let x0 = tx.floor().max(0.0) as u32;
        let y0 = ty.floor().max(0.0) as u32;
        let x1 = (right.ceil().max(0.0) as u32).min(self.pixels.width());
        let y1 = (bottom.ceil().max(0.0) as u32).min(self.pixels.height());

        for y in y0..y1 {
            let sy = ((y as f32 + 0.5 - ty) / scale).floor();
            if sy < 0.0 || sy >= image.height() as f32 {
                continue;
            }
            for x in x0..x1 {
                let sx = ((x as f32 + 0.5 - tx) / scale).floor();
                if sx < 0.0 || sx >= image.width() as f32 {
                    continue;
                }
                let src = *image.get_pixel(sx as u32, sy as u32);
                match src.0[3] {
                    0 => {}
                    u8::MAX => self.pixels.put_pixel(x, y, src),
                    _ => self.pixels.get_pixel_mut(x, y).blend(&src),
                }
            }
        }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }
}
