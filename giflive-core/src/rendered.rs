use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use crate::decode::{decode_frames, ComposedFrame};
use crate::encode::render_grid;
use crate::error::{ConfigError, DecodeError, Error, Result};
use crate::format::{
    validate_dimensions, Color, ColorCell, DitheringMode, FrameGrid, ScaleMode, BLOCK_SIZE_X, BLOCK_SIZE_Y,
};
use crate::quantize::{blocks_to_cells, pixels_to_cells};
use crate::resize::FrameResizer;

/// Clears the terminal and homes the cursor.
pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";
/// Homes the cursor without clearing.
pub const CURSOR_HOME: &str = "\x1b[H";

/// Everything needed to build a scaled [`RenderedImage`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderOptions {
    /// Terminal rows to fill.
    pub rows: u32,
    /// Terminal columns to fill.
    pub cols: u32,
    /// Shows through transparent pixels; also the dithering background.
    pub background: Color,
    pub scale_mode: ScaleMode,
    pub dithering: DitheringMode,
    /// Rows encoded concurrently per frame.
    pub parallelism: usize,
}

impl Default for RenderOptions {
    /// A VT100 screen: 24x80, black, fit, no dithering.
    fn default() -> Self {
        Self {
            rows: 24,
            cols: 80,
            background: Color::BLACK,
            scale_mode: ScaleMode::Fit,
            dithering: DitheringMode::None,
            parallelism: 1,
        }
    }
}

/// Grid dimensions for a target of `rows`x`cols` terminal cells.
fn target_grid(rows: u32, cols: u32, dithering: DitheringMode) -> Result<(usize, usize)> {
    let height = if dithering.is_dithering() {
        Some(rows)
    } else {
        rows.checked_mul(2)
    };
    let height = height.ok_or(ConfigError::TooLarge { rows, cols })?;
    Ok((height as usize, cols as usize))
}

/// Grid dimensions covering a `width`x`height` pixel buffer.
fn grid_for_pixels(width: u32, height: u32, dithering: DitheringMode) -> (usize, usize) {
    if dithering.is_dithering() {
        ((height / BLOCK_SIZE_Y) as usize, (width / BLOCK_SIZE_X) as usize)
    } else {
        ((height - height % 2) as usize, width as usize)
    }
}

/// An animation converted to terminal cells, ready to render frame by frame.
///
/// Built once, then only read. Frames and delays have the same length for
/// the lifetime of the image.
#[derive(Clone, Debug)]
pub struct RenderedImage {
    height: usize,
    width: usize,
    parallelism: usize,
    background: Color,
    dithering: DitheringMode,
    frames: Vec<FrameGrid>,
    delays: Vec<u32>,
}

impl RenderedImage {
    /// Empty image of `frame_count` zeroed frames, ready to be drawn on.
    pub fn new(
        height: usize,
        width: usize,
        frame_count: usize,
        background: Color,
        dithering: DitheringMode,
    ) -> Result<Self> {
        validate_dimensions(height, width, dithering)?;
        let frames = (0..frame_count)
            .map(|_| FrameGrid::new(height, width, dithering))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            height,
            width,
            parallelism: 1,
            background,
            dithering,
            frames,
            delays: vec![0; frame_count],
        })
    }

    /// Decode an animated GIF and scale it to fill `options.rows`x`options.cols` cells.
    pub fn from_reader<R: Read>(reader: R, options: &RenderOptions) -> Result<Self> {
        let (height, width) = target_grid(options.rows, options.cols, options.dithering)?;
        validate_dimensions(height, width, options.dithering)?;
        let mut resizer = FrameResizer::new(options.rows, options.cols, options.scale_mode, options.dithering)?;

        let frames = decode_frames(reader, options.background)?;

        let (src_width, src_height) = first_dimensions(&frames)?;
        let (out_width, out_height) = resizer.output_dimensions(src_width, src_height);
        let (height, width) = grid_for_pixels(out_width, out_height, options.dithering);

        let mut image = Self::new(height, width, frames.len(), options.background, options.dithering)?;
        image.set_parallelism(options.parallelism);

        for (index, frame) in frames.into_iter().enumerate() {
            let scaled = resizer.resize(&frame.data, frame.width, frame.height)?;
            let (w, h) = resizer.output_dimensions(frame.width, frame.height);
            log::debug!("frame {index}: {}x{} -> {w}x{h}", frame.width, frame.height);
            image.fill_frame(index, &scaled, w, h, frame.delay)?;
        }

        image.log_built(options.scale_mode);
        Ok(image)
    }

    /// Decode an animated GIF at its native resolution.
    pub fn from_reader_unscaled<R: Read>(reader: R, background: Color, dithering: DitheringMode) -> Result<Self> {
        let frames = decode_frames(reader, background)?;
        let (src_width, src_height) = first_dimensions(&frames)?;
        let (height, width) = grid_for_pixels(src_width, src_height, dithering);

        let mut image = Self::new(height, width, frames.len(), background, dithering)?;
        for (index, frame) in frames.into_iter().enumerate() {
            image.fill_frame(index, &frame.data, frame.width, frame.height, frame.delay)?;
        }

        log::info!(
            "built {} frame(s) of {}x{} cells at native size, dithering {}",
            image.frame_count(),
            image.height,
            image.width,
            image.dithering
        );
        Ok(image)
    }

    pub fn from_file(path: impl AsRef<Path>, options: &RenderOptions) -> Result<Self> {
        let file = File::open(path).map_err(DecodeError::Io)?;
        Self::from_reader(BufReader::new(file), options)
    }

    pub fn from_file_unscaled(path: impl AsRef<Path>, background: Color, dithering: DitheringMode) -> Result<Self> {
        let file = File::open(path).map_err(DecodeError::Io)?;
        Self::from_reader_unscaled(BufReader::new(file), background, dithering)
    }

    fn fill_frame(&mut self, index: usize, rgb: &[u8], width: u32, height: u32, delay: u32) -> Result<()> {
        let count = self.frames.len();
        let grid = self
            .frames
            .get_mut(index)
            .ok_or(Error::FrameOutOfRange { index, count })?;

        if self.dithering.is_dithering() {
            blocks_to_cells(rgb, width, height, grid)?;
        } else {
            pixels_to_cells(rgb, width, height, grid)?;
        }
        self.delays[index] = delay;
        Ok(())
    }

    fn log_built(&self, scale_mode: ScaleMode) {
        log::info!(
            "built {} frame(s) of {}x{} cells, scale {scale_mode}, dithering {}",
            self.frame_count(),
            self.height,
            self.width,
            self.dithering
        );
    }

    fn check_frame(&self, index: usize) -> Result<()> {
        if index < self.frames.len() {
            Ok(())
        } else {
            Err(Error::FrameOutOfRange {
                index,
                count: self.frames.len(),
            })
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Delay of frame `index` in hundredths of a second.
    pub fn frame_delay(&self, index: usize) -> Result<u32> {
        self.check_frame(index)?;
        Ok(self.delays[index])
    }

    pub fn frame(&self, index: usize) -> Result<&FrameGrid> {
        self.check_frame(index)?;
        Ok(&self.frames[index])
    }

    /// Grid rows. Without dithering two grid rows make one terminal row.
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn dithering_mode(&self) -> DitheringMode {
        self.dithering
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Maximum rows encoded concurrently; at least 1.
    pub fn set_parallelism(&mut self, parallelism: usize) {
        self.parallelism = parallelism.max(1);
    }

    /// Set color and brightness of the cell at `(y, x)` in `frame`.
    #[allow(clippy::too_many_arguments)]
    pub fn set_at(&mut self, frame: usize, y: usize, x: usize, r: u8, g: u8, b: u8, brightness: u8) -> Result<()> {
        self.check_frame(frame)?;
        self.frames[frame].set_at(y, x, r, g, b, brightness)
    }

    pub fn get_at(&self, frame: usize, y: usize, x: usize) -> Result<ColorCell> {
        self.frame(frame)?.get(y, x)
    }

    /// Text of frame `index`: one escape-encoded line per terminal row.
    pub fn render(&self, index: usize, suppress_background: bool) -> Result<String> {
        let grid = self.frame(index)?;
        Ok(render_grid(grid, self.background, suppress_background, self.parallelism))
    }

    pub fn render_first(&self) -> Result<String> {
        self.render(0, false)
    }

    /// Write the text of frame `index` to `out`.
    pub fn draw(&self, index: usize, suppress_background: bool, out: &mut impl Write) -> std::io::Result<()> {
        let text = self
            .render(index, suppress_background)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        out.write_all(text.as_bytes())
    }
}

fn first_dimensions(frames: &[ComposedFrame]) -> Result<(u32, u32)> {
    frames
        .first()
        .map(|f| (f.width, f.height))
        .ok_or_else(|| DecodeError::Empty.into())
}
