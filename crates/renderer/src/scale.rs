/// Uniform scale plus centring offsets that fit an image inside a surface.
///
/// The transform is applied translate-then-scale: a source pixel at `p` lands
/// at `offset + p * scale` on the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleTransform {
    pub scale: f32,
    pub offset_x: i32,
    pub offset_y: i32,
}

impl ScaleTransform {
    /// Computes the largest aspect-preserving scale that keeps `image` inside
    /// `surface`, with offsets that centre it. Offsets truncate toward zero.
    ///
    /// Returns `None` when either size has a zero dimension.
    pub fn fit(image: (u32, u32), surface: (u32, u32)) -> Option<Self> {
        let (image_w, image_h) = image;
        let (surface_w, surface_h) = surface;
        if image_w == 0 || image_h == 0 || surface_w == 0 || surface_h == 0 {
            return None;
        }

        let image_w = image_w as f32;
        let image_h = image_h as f32;
        let surface_w = surface_w as f32;
        let surface_h = surface_h as f32;

        let scale = if image_w / image_h > surface_w / surface_h {
            surface_w / image_w
        } else {
            surface_h / image_h
        };

        Some(Self {
            scale,
            offset_x: ((surface_w - image_w * scale) / 2.0) as i32,
            offset_y: ((surface_h - image_h * scale) / 2.0) as i32,
        })
    }

    /// Size the image occupies on the surface after scaling.
    pub fn scaled_size(&self, image: (u32, u32)) -> (f32, f32) {
        (image.0 as f32 * self.scale, image.1 as f32 * self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIDES: [u32; 10] = [1, 2, 3, 7, 16, 99, 480, 720, 1081, 2400];

    #[test]
    fn landscape_image_on_portrait_screen() {
        let transform = ScaleTransform::fit((1280, 720), (1080, 1920)).unwrap();
        assert_eq!(transform.scale, 0.84375);
        assert_eq!(transform.offset_x, 0);
        // (1920 - 607.5) / 2 = 656.25, truncated.
        assert_eq!(transform.offset_y, 656);
    }

    #[test]
    fn portrait_image_on_landscape_screen() {
        let transform = ScaleTransform::fit((500, 1000), (1920, 1080)).unwrap();
        assert_eq!(transform.scale, 1.08);
        assert_eq!(transform.offset_x, 690);
        assert_eq!(transform.offset_y, 0);
    }

    #[test]
    fn equal_aspect_fills_surface() {
        let transform = ScaleTransform::fit((540, 960), (1080, 1920)).unwrap();
        assert_eq!(transform.scale, 2.0);
        assert_eq!((transform.offset_x, transform.offset_y), (0, 0));
    }

    #[test]
    fn zero_dimensions_have_no_transform() {
        assert!(ScaleTransform::fit((0, 10), (100, 100)).is_none());
        assert!(ScaleTransform::fit((10, 10), (100, 0)).is_none());
    }

    #[test]
    fn scaled_image_always_fits_and_is_centred() {
        for &iw in &SIDES {
            for &ih in &SIDES {
                for &sw in &SIDES {
                    for &sh in &SIDES {
                        let t = ScaleTransform::fit((iw, ih), (sw, sh)).unwrap();
                        let (w, h) = t.scaled_size((iw, ih));
                        assert!(w.round() as u32 <= sw, "{iw}x{ih} in {sw}x{sh}: width {w}");
                        assert!(h.round() as u32 <= sh, "{iw}x{ih} in {sw}x{sh}: height {h}");
                        assert!(t.offset_x >= 0 && t.offset_y >= 0);
                        assert!(t.offset_x as u32 * 2 + w.round() as u32 <= sw + 1);
                        assert!(t.offset_y as u32 * 2 + h.round() as u32 <= sh + 1);
                    }
                }
            }
        }
    }

    #[test]
    fn growing_the_surface_never_shrinks_the_scale() {
        for &iw in &SIDES {
            for &ih in &SIDES {
                for &fixed in &SIDES {
                    let mut last_wide = 0.0f32;
                    let mut last_tall = 0.0f32;
                    for &grow in &SIDES {
                        let wide = ScaleTransform::fit((iw, ih), (grow, fixed)).unwrap().scale;
                        let tall = ScaleTransform::fit((iw, ih), (fixed, grow)).unwrap().scale;
                        assert!(wide >= last_wide * (1.0 - 1e-6));
                        assert!(tall >= last_tall * (1.0 - 1e-6));
                        last_wide = wide;
                        last_tall = tall;
                    }
                }
            }
        }
    }
}
