use std::sync::mpsc;
use std::thread;

use crate::format::{CellRole, Color, ColorCell, DitheringMode, FrameGrid};

const LOWER_HALF_BLOCK: &str = "\u{2584}";
const FULL_BLOCK: &str = "\u{2588}";
const DARK_SHADE: &str = "\u{2593}";
const MEDIUM_SHADE: &str = "\u{2592}";
const LIGHT_SHADE: &str = "\u{2591}";

/// Ends every rendered row.
pub const ROW_END: &str = "\x1b[0m\n";

/// Shade block for a dithered cell's brightness.
pub fn block_glyph(brightness: u8) -> &'static str {
    match brightness {
        205..=255 => FULL_BLOCK,
        153..=204 => DARK_SHADE,
        101..=152 => MEDIUM_SHADE,
        49..=100 => LIGHT_SHADE,
        _ => " ",
    }
}

/// ASCII density glyph for a dithered cell's brightness, densest first.
pub fn char_glyph(brightness: u8) -> char {
    const LADDER: [(u8, char); 10] = [
        (230, '#'),
        (207, '&'),
        (184, '$'),
        (161, 'X'),
        (138, 'x'),
        (115, '='),
        (92, '+'),
        (69, ';'),
        (46, ':'),
        (23, '.'),
    ];
    LADDER
        .iter()
        .find(|(threshold, _)| brightness > *threshold)
        .map_or(' ', |&(_, glyph)| glyph)
}

/// Append the escape text of one cell.
///
/// Without dithering an upper cell sets the background color and a lower
/// cell sets the foreground color and draws the half block, so an upper
/// cell followed by the lower cell below it paints one character.
/// `suppress_background` drops the image background escape in the
/// dithering modes.
pub fn encode_cell(
    cell: &ColorCell,
    dithering: DitheringMode,
    background: Color,
    suppress_background: bool,
    buf: &mut String,
) {
    match dithering {
        DitheringMode::None => match cell.role {
            CellRole::Upper => write_bg(buf, cell.r, cell.g, cell.b),
            CellRole::Lower => {
                write_fg(buf, cell.r, cell.g, cell.b);
                buf.push_str(LOWER_HALF_BLOCK);
            }
        },
        DitheringMode::Blocks | DitheringMode::Chars => {
            if !suppress_background {
                write_bg(buf, background.r, background.g, background.b);
            }
            write_fg(buf, cell.r, cell.g, cell.b);
            if dithering == DitheringMode::Blocks {
                buf.push_str(block_glyph(cell.brightness));
            } else {
                buf.push(char_glyph(cell.brightness));
            }
        }
    }
}

/// Number of output rows for a grid: row pairs without dithering.
pub fn row_units(grid: &FrameGrid) -> usize {
    if grid.dithering().is_dithering() {
        grid.height()
    } else {
        grid.height() / 2
    }
}

/// Encode output row `unit` of a grid, including the trailing reset.
pub fn encode_row(grid: &FrameGrid, unit: usize, background: Color, suppress_background: bool) -> String {
    let dithering = grid.dithering();
    let mut buf = String::with_capacity(grid.width() * 48);

    if dithering.is_dithering() {
        for cell in grid.row(unit) {
            encode_cell(cell, dithering, background, suppress_background, &mut buf);
        }
    } else {
        let upper = grid.row(unit * 2);
        let lower = grid.row(unit * 2 + 1);
        for (top, bottom) in upper.iter().zip(lower) {
            encode_cell(top, dithering, background, suppress_background, &mut buf);
            encode_cell(bottom, dithering, background, suppress_background, &mut buf);
        }
    }

    buf.push_str(ROW_END);
    buf
}

/// Run `encode` for every row index in `0..units`, at most `parallelism`
/// rows at a time, and return the results in row order.
///
/// Each window of rows runs on scoped threads that report `(row, text)`
/// over a channel; the window is fully collected before the next starts.
pub fn encode_rows<F>(units: usize, parallelism: usize, encode: F) -> Vec<String>
where
    F: Fn(usize) -> String + Sync,
{
    let window = parallelism.max(1);
    if window == 1 {
        return (0..units).map(&encode).collect();
    }

    let mut rows = vec![String::new(); units];
    let encode = &encode;
    for start in (0..units).step_by(window) {
        let end = (start + window).min(units);
        thread::scope(|scope| {
            let (tx, rx) = mpsc::channel();
            for row in start..end {
                let tx = tx.clone();
                scope.spawn(move || {
                    // The receiver outlives every worker in this scope.
                    let _ = tx.send((row, encode(row)));
                });
            }
            drop(tx);
            for (row, text) in rx {
                rows[row] = text;
            }
        });
    }
    rows
}

/// Full text of one frame: every row in ascending order.
pub fn render_grid(grid: &FrameGrid, background: Color, suppress_background: bool, parallelism: usize) -> String {
    encode_rows(row_units(grid), parallelism, |unit| {
        encode_row(grid, unit, background, suppress_background)
    })
    .concat()
}

fn write_bg(buf: &mut String, r: u8, g: u8, b: u8) {
    buf.push_str("\x1b[48;2;");
    write_rgb(buf, r, g, b);
}

fn write_fg(buf: &mut String, r: u8, g: u8, b: u8) {
    buf.push_str("\x1b[38;2;");
    write_rgb(buf, r, g, b);
}

fn write_rgb(buf: &mut String, r: u8, g: u8, b: u8) {
    write_u8(buf, r);
    buf.push(';');
    write_u8(buf, g);
    buf.push(';');
    write_u8(buf, b);
    buf.push('m');
}

/// Integer-to-ASCII for u8 values (0-255), no allocation.
fn write_u8(buf: &mut String, v: u8) {
    let digit = |d: u8| char::from(b'0' + d);
    if v >= 100 {
        buf.push(digit(v / 100));
        buf.push(digit((v / 10) % 10));
        buf.push(digit(v % 10));
    } else if v >= 10 {
        buf.push(digit(v / 10));
        buf.push(digit(v % 10));
    } else {
        buf.push(digit(v));
    }
}
