use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigError, Error, Result};

/// Source pixels aggregated into one cell when dithering (height).
pub const BLOCK_SIZE_Y: u32 = 8;
/// Source pixels aggregated into one cell when dithering (width).
pub const BLOCK_SIZE_X: u32 = 4;

/// Smallest allowed grid height or width.
pub const MIN_GRID_SIZE: usize = 2;

/// An RGBA color. Only the background carries a meaningful alpha.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn is_opaque(&self) -> bool {
        self.a == u8::MAX
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl FromStr for Color {
    type Err = ConfigError;

    /// Parses a named color or a hex string: `#RGB`, `#RRGGBB`, `#RRGGBBAA`.
    /// Case-insensitive, trims whitespace.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let parsed = if s.starts_with('#') {
            parse_hex(s)
        } else {
            parse_named(s)
        };
        parsed.ok_or_else(|| ConfigError::InvalidColor(s.to_string()))
    }
}

fn parse_hex(s: &str) -> Option<Color> {
    let hex = s.strip_prefix('#')?;
    let byte = |range: std::ops::Range<usize>| u8::from_str_radix(hex.get(range)?, 16).ok();
    match hex.len() {
        3 => {
            let r = byte(0..1)?;
            let g = byte(1..2)?;
            let b = byte(2..3)?;
            Some(Color::rgb(r * 17, g * 17, b * 17))
        }
        6 => Some(Color::rgb(byte(0..2)?, byte(2..4)?, byte(4..6)?)),
        8 => Some(Color::rgba(byte(0..2)?, byte(2..4)?, byte(4..6)?, byte(6..8)?)),
        _ => None,
    }
}

fn parse_named(s: &str) -> Option<Color> {
    let (r, g, b) = match s.to_lowercase().as_str() {
        "transparent" => return Some(Color::TRANSPARENT),
        "black" => (0, 0, 0),
        "white" => (255, 255, 255),
        "red" => (255, 0, 0),
        "green" => (0, 128, 0),
        "blue" => (0, 0, 255),
        "yellow" => (255, 255, 0),
        "cyan" => (0, 255, 255),
        "magenta" => (255, 0, 255),
        "gray" | "grey" => (128, 128, 128),
        "orange" => (255, 165, 0),
        "purple" => (128, 0, 128),
        "pink" => (255, 192, 203),
        "brown" => (139, 69, 19),
        _ => return None,
    };
    Some(Color::rgb(r, g, b))
}

/// Geometric fitting applied to each frame before quantization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScaleMode {
    /// Stretch to exactly the target area, ignoring aspect ratio.
    Resize,
    /// Cover the target area, then crop around the center.
    Fill,
    /// Fit inside the target area, preserving aspect ratio.
    #[default]
    Fit,
}

impl FromStr for ScaleMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "resize" => Ok(ScaleMode::Resize),
            "fill" => Ok(ScaleMode::Fill),
            "fit" => Ok(ScaleMode::Fit),
            _ => Err(ConfigError::UnknownScaleMode(s.to_string())),
        }
    }
}

impl fmt::Display for ScaleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScaleMode::Resize => "resize",
            ScaleMode::Fill => "fill",
            ScaleMode::Fit => "fit",
        })
    }
}

/// How a block of source pixels becomes one terminal glyph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DitheringMode {
    /// Half-block truecolor: two source pixels per terminal character.
    #[default]
    None,
    /// Shade block ladder over an 8x4 pixel block.
    Blocks,
    /// ASCII density ladder over an 8x4 pixel block.
    Chars,
}

impl DitheringMode {
    pub fn is_dithering(&self) -> bool {
        *self != DitheringMode::None
    }

    /// Source pixels per grid cell as `(width, height)`.
    pub fn pixel_factor(&self) -> (u32, u32) {
        match self {
            DitheringMode::None => (1, 2),
            DitheringMode::Blocks | DitheringMode::Chars => (BLOCK_SIZE_X, BLOCK_SIZE_Y),
        }
    }
}

impl FromStr for DitheringMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "off" => Ok(DitheringMode::None),
            "blocks" => Ok(DitheringMode::Blocks),
            "chars" => Ok(DitheringMode::Chars),
            _ => Err(ConfigError::UnknownDitheringMode(s.to_string())),
        }
    }
}

impl fmt::Display for DitheringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DitheringMode::None => "none",
            DitheringMode::Blocks => "blocks",
            DitheringMode::Chars => "chars",
        })
    }
}

/// Which half of a two-pixel-tall block a cell paints (no dithering only).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CellRole {
    /// Painted as the background color of the terminal character.
    #[default]
    Upper,
    /// Painted as the foreground color under a lower half block.
    Lower,
}

impl CellRole {
    pub fn for_row(dithering: DitheringMode, y: usize) -> Self {
        if !dithering.is_dithering() && y % 2 == 1 {
            CellRole::Lower
        } else {
            CellRole::Upper
        }
    }
}

/// One grid cell: averaged (or copied) color plus brightness.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ColorCell {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// Unused without dithering.
    pub brightness: u8,
    /// Unused with dithering.
    pub role: CellRole,
}

/// Check grid dimensions for a dithering mode.
pub fn validate_dimensions(height: usize, width: usize, dithering: DitheringMode) -> Result<()> {
    if !dithering.is_dithering() && height % 2 != 0 {
        return Err(ConfigError::OddHeight { height }.into());
    }
    if height < MIN_GRID_SIZE || width < MIN_GRID_SIZE {
        return Err(ConfigError::TooSmall { height, width }.into());
    }
    Ok(())
}

/// Fixed-size grid of cells for one animation frame, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameGrid {
    height: usize,
    width: usize,
    dithering: DitheringMode,
    cells: Vec<ColorCell>,
}

impl FrameGrid {
    /// Zeroed grid with role flags already derived per row.
    pub fn new(height: usize, width: usize, dithering: DitheringMode) -> Result<Self> {
        validate_dimensions(height, width, dithering)?;
        let mut cells = Vec::with_capacity(height * width);
        for y in 0..height {
            let cell = ColorCell {
                role: CellRole::for_row(dithering, y),
                ..ColorCell::default()
            };
            cells.extend(std::iter::repeat(cell).take(width));
        }
        Ok(Self {
            height,
            width,
            dithering,
            cells,
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    fn index(&self, y: usize, x: usize) -> Result<usize> {
        if y < self.height && x < self.width {
            Ok(y * self.width + x)
        } else {
            Err(Error::OutOfBounds {
                y,
                x,
                height: self.height,
                width: self.width,
            })
        }
    }

    pub fn get(&self, y: usize, x: usize) -> Result<ColorCell> {
        let idx = self.index(y, x)?;
        Ok(self.cells[idx])
    }

    pub fn dithering(&self) -> DitheringMode {
        self.dithering
    }

    /// Set color and brightness at `(y, x)`; the role follows from the row.
    pub fn set_at(&mut self, y: usize, x: usize, r: u8, g: u8, b: u8, brightness: u8) -> Result<()> {
        let idx = self.index(y, x)?;
        self.cells[idx] = ColorCell {
            r,
            g,
            b,
            brightness,
            role: CellRole::for_row(self.dithering, y),
        };
        Ok(())
    }

    /// Cells of row `y`. Panics if `y` is out of range.
    pub fn row(&self, y: usize) -> &[ColorCell] {
        &self.cells[y * self.width..(y + 1) * self.width]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_colors() {
        assert_eq!("black".parse::<Color>().unwrap(), Color::BLACK);
        assert_eq!(" Grey ".parse::<Color>().unwrap(), Color::rgb(128, 128, 128));
        assert_eq!("#fff".parse::<Color>().unwrap(), Color::rgb(255, 255, 255));
        assert_eq!("#102030".parse::<Color>().unwrap(), Color::rgb(16, 32, 48));
        assert_eq!("#10203080".parse::<Color>().unwrap(), Color::rgba(16, 32, 48, 128));
        assert!("transparent".parse::<Color>().unwrap().a == 0);
        assert!(matches!("#12".parse::<Color>(), Err(ConfigError::InvalidColor(_))));
        assert!(matches!("chartreuse".parse::<Color>(), Err(ConfigError::InvalidColor(_))));
    }

    #[test]
    fn parse_modes() {
        assert_eq!("FILL".parse::<ScaleMode>().unwrap(), ScaleMode::Fill);
        assert_eq!("chars".parse::<DitheringMode>().unwrap(), DitheringMode::Chars);
        assert!(matches!("zoom".parse::<ScaleMode>(), Err(ConfigError::UnknownScaleMode(m)) if m == "zoom"));
        assert!(matches!("dots".parse::<DitheringMode>(), Err(ConfigError::UnknownDitheringMode(_))));
    }

    #[test]
    fn odd_height_needs_dithering() {
        assert!(matches!(
            FrameGrid::new(5, 4, DitheringMode::None),
            Err(Error::Config(ConfigError::OddHeight { height: 5 }))
        ));
        assert!(FrameGrid::new(5, 4, DitheringMode::Blocks).is_ok());
    }

    #[test]
    fn too_small_rejected() {
        for (h, w) in [(0, 4), (4, 1), (1, 1)] {
            assert!(matches!(
                FrameGrid::new(h, w, DitheringMode::Chars),
                Err(Error::Config(ConfigError::TooSmall { .. }))
            ));
        }
    }

    #[test]
    fn roles_alternate_without_dithering() {
        let grid = FrameGrid::new(4, 2, DitheringMode::None).unwrap();
        assert_eq!(grid.get(0, 1).unwrap().role, CellRole::Upper);
        assert_eq!(grid.get(1, 0).unwrap().role, CellRole::Lower);
        assert_eq!(grid.get(2, 0).unwrap().role, CellRole::Upper);

        let grid = FrameGrid::new(3, 2, DitheringMode::Blocks).unwrap();
        assert_eq!(grid.get(1, 0).unwrap().role, CellRole::Upper);
    }

    #[test]
    fn bounds_checked_access() {
        let mut grid = FrameGrid::new(2, 3, DitheringMode::None).unwrap();
        grid.set_at(1, 2, 1, 2, 3, 4).unwrap();
        let cell = ColorCell { r: 1, g: 2, b: 3, brightness: 4, role: CellRole::Lower };
        assert_eq!(grid.get(1, 2).unwrap(), cell);
        assert_eq!(grid.row(1)[2], cell);

        assert!(matches!(grid.get(2, 0), Err(Error::OutOfBounds { y: 2, x: 0, .. })));
        assert!(matches!(grid.set_at(0, 3, 0, 0, 0, 0), Err(Error::OutOfBounds { .. })));
    }
}
