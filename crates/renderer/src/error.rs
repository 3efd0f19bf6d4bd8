use std::path::PathBuf;

/// Failures raised while preparing or drawing the animated wallpaper.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The animated image could not be decoded.
    #[error("failed to decode animated image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("failed to write snapshot: {0}")]
    Snapshot(#[source] image::ImageError),
    /// The image decoded but contained no frames.
    #[error("animated image contains no frames")]
    EmptyAnimation,
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Image or surface reported a zero dimension, so no transform exists.
    #[error("cannot fit a {image_width}x{image_height} image into a {surface_width}x{surface_height} surface")]
    DegenerateSize {
        image_width: u32,
        image_height: u32,
        surface_width: u32,
        surface_height: u32,
    },
}

/// Per-frame failure to lock the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    /// The surface has been torn down or has no pixels to draw into.
    #[error("surface is unavailable")]
    Unavailable,
    /// A canvas from this surface is already locked and not yet presented.
    #[error("surface is already locked")]
    Busy,
}
