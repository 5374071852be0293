use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};

use crate::error::{ConfigError, Result};
use crate::format::{DitheringMode, ScaleMode};

/// Scales composited RGB24 frames to the pixel size a cell grid needs.
pub struct FrameResizer {
    target_width: u32,
    target_height: u32,
    mode: ScaleMode,
    resizer: Resizer,
}

impl FrameResizer {
    /// `rows`/`cols` are terminal cells; the pixel target follows the
    /// dithering mode's pixels-per-cell factor.
    pub fn new(rows: u32, cols: u32, mode: ScaleMode, dithering: DitheringMode) -> Result<Self> {
        let (target_width, target_height) = pixel_target(rows, cols, dithering)?;
        Ok(Self {
            target_width,
            target_height,
            mode,
            resizer: Resizer::new(),
        })
    }

    pub fn target_width(&self) -> u32 {
        self.target_width
    }

    pub fn target_height(&self) -> u32 {
        self.target_height
    }

    /// Dimensions a `src_width`x`src_height` frame will have after scaling.
    pub fn output_dimensions(&self, src_width: u32, src_height: u32) -> (u32, u32) {
        match self.mode {
            ScaleMode::Resize | ScaleMode::Fill => (self.target_width, self.target_height),
            ScaleMode::Fit => fit_dimensions(src_width, src_height, self.target_width, self.target_height),
        }
    }

    /// Resize an RGB24 frame. Returns RGB24 data at `output_dimensions`.
    pub fn resize(&mut self, src_data: &[u8], src_width: u32, src_height: u32) -> Result<Vec<u8>> {
        let (dst_width, dst_height) = self.output_dimensions(src_width, src_height);
        if src_width == dst_width && src_height == dst_height {
            return Ok(src_data.to_vec());
        }

        let src_image = Image::from_vec_u8(src_width, src_height, src_data.to_vec(), PixelType::U8x3)?;
        let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x3);

        let mut options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3));
        if self.mode == ScaleMode::Fill {
            let (left, top, width, height) = fill_crop_box(src_width, src_height, dst_width, dst_height);
            options = options.crop(left, top, width, height);
        }

        self.resizer.resize(&src_image, &mut dst_image, &options)?;

        Ok(dst_image.into_vec())
    }
}

/// Pixel `(width, height)` covering `rows`x`cols` cells.
pub fn pixel_target(rows: u32, cols: u32, dithering: DitheringMode) -> Result<(u32, u32)> {
    let (fx, fy) = dithering.pixel_factor();
    match (cols.checked_mul(fx), rows.checked_mul(fy)) {
        (Some(width), Some(height)) => Ok((width, height)),
        _ => Err(ConfigError::TooLarge { rows, cols }.into()),
    }
}

/// Largest size with the source's aspect ratio that fits inside the target.
fn fit_dimensions(src_width: u32, src_height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if src_width == 0 || src_height == 0 {
        return (max_width, max_height);
    }
    let src_aspect = src_width as f64 / src_height as f64;
    let max_aspect = max_width as f64 / max_height as f64;

    if src_aspect > max_aspect {
        let height = (max_width as f64 / src_aspect).round() as u32;
        (max_width, height.max(1))
    } else {
        let width = (max_height as f64 * src_aspect).round() as u32;
        (width.max(1), max_height)
    }
}

/// Centered source region with the destination's aspect ratio.
/// Scaling it to the destination covers the area and drops the overflow.
fn fill_crop_box(src_width: u32, src_height: u32, dst_width: u32, dst_height: u32) -> (f64, f64, f64, f64) {
    let (sw, sh) = (src_width as f64, src_height as f64);
    let scale = (dst_width as f64 / sw).max(dst_height as f64 / sh);
    let width = (dst_width as f64 / scale).min(sw);
    let height = (dst_height as f64 / scale).min(sh);
    ((sw - width) / 2.0, (sh - height) / 2.0, width, height)
}
