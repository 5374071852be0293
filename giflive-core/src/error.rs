/// Caller misconfiguration, detected before any frame work starts.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("height must be a multiple of two without dithering (got {height})")]
    OddHeight { height: usize },

    #[error("height and width must be >= 2 (got {height}x{width})")]
    TooSmall { height: usize, width: usize },

    #[error("target of {rows}x{cols} cells is too large")]
    TooLarge { rows: u32, cols: u32 },

    #[error("unknown scale mode: {0}")]
    UnknownScaleMode(String),

    #[error("unknown dithering mode: {0}")]
    UnknownDitheringMode(String),

    #[error("invalid color: {0}")]
    InvalidColor(String),
}

/// The image source could not be turned into frames.
#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("failed to read image source: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed image: {0}")]
    Malformed(#[from] image::ImageError),

    #[error("image contains no frames")]
    Empty,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("cell ({y}, {x}) is outside the {height}x{width} grid")]
    OutOfBounds {
        y: usize,
        x: usize,
        height: usize,
        width: usize,
    },

    #[error("frame {index} is outside the {count}-frame image")]
    FrameOutOfRange { index: usize, count: usize },

    #[error("pixel buffer does not match its dimensions: {0}")]
    PixelBuffer(#[from] fast_image_resize::ImageBufferError),

    #[error("resize failed: {0}")]
    Resize(#[from] fast_image_resize::ResizeError),
}

pub type Result<T> = std::result::Result<T, Error>;
