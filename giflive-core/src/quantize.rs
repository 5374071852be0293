use crate::error::Result;
use crate::format::{FrameGrid, BLOCK_SIZE_X, BLOCK_SIZE_Y};

/// Copy RGB24 pixels into a grid one-to-one (no dithering).
/// Even rows become upper cells, odd rows lower cells; an odd trailing
/// pixel row is dropped.
pub fn pixels_to_cells(rgb: &[u8], width: u32, height: u32, grid: &mut FrameGrid) -> Result<()> {
    let stride = width as usize * 3;
    let rows = (height - height % 2) as usize;
    if stride == 0 {
        return Ok(());
    }

    for (y, row) in rgb.chunks_exact(stride).take(rows).enumerate() {
        for (x, px) in row.chunks_exact(3).enumerate() {
            grid.set_at(y, x, px[0], px[1], px[2], 0)?;
        }
    }

    Ok(())
}

/// A pixel in normalized RGB plus its HSV value channel, all in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub value: f64,
}

impl Sample {
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        let r = r as f64 / 255.0;
        let g = g as f64 / 255.0;
        let b = b as f64 / 255.0;
        Self {
            r,
            g,
            b,
            value: r.max(g).max(b),
        }
    }
}

/// Mean of a block of samples as `(r, g, b, brightness)` scaled to 0-255.
pub fn average_block(samples: impl IntoIterator<Item = Sample>) -> (u8, u8, u8, u8) {
    let (mut sum_r, mut sum_g, mut sum_b, mut sum_v) = (0.0, 0.0, 0.0, 0.0);
    let mut count = 0usize;
    for s in samples {
        sum_r += s.r;
        sum_g += s.g;
        sum_b += s.b;
        sum_v += s.value;
        count += 1;
    }
    if count == 0 {
        return (0, 0, 0, 0);
    }

    let scale = |sum: f64| (sum / count as f64 * 255.0 + 0.5) as u8;
    (scale(sum_r), scale(sum_g), scale(sum_b), scale(sum_v))
}

/// Average each 8x4 block of RGB24 pixels into one grid cell (dithering).
/// Partial blocks at the right and bottom edges are dropped.
pub fn blocks_to_cells(rgb: &[u8], width: u32, height: u32, grid: &mut FrameGrid) -> Result<()> {
    let stride = width as usize * 3;
    let rows = (height / BLOCK_SIZE_Y) as usize;
    let cols = (width / BLOCK_SIZE_X) as usize;
    let (bw, bh) = (BLOCK_SIZE_X as usize, BLOCK_SIZE_Y as usize);

    for y in 0..rows {
        for x in 0..cols {
            let block = (0..bh).flat_map(|dy| {
                let row = (bh * y + dy) * stride;
                (0..bw).filter_map(move |dx| {
                    let off = row + (bw * x + dx) * 3;
                    let px = rgb.get(off..off + 3)?;
                    Some(Sample::from_rgb(px[0], px[1], px[2]))
                })
            });
            let (r, g, b, brightness) = average_block(block);
            grid.set_at(y, x, r, g, b, brightness)?;
        }
    }

    Ok(())
}
