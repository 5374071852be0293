use std::io::{Cursor, Read};

use image::codecs::gif::GifDecoder;
use image::AnimationDecoder;

use crate::error::DecodeError;
use crate::format::Color;

/// One animation frame composited over the background, as opaque RGB24.
pub struct ComposedFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Hundredths of a second, as stored in the source.
    pub delay: u32,
}

/// Decode every frame of an animated GIF and composite it over `background`.
///
/// The decoder applies each frame's disposal method, so every yielded frame
/// covers the full logical screen. The whole source is read before decoding.
pub fn decode_frames<R: Read>(
    mut reader: R,
    background: Color,
) -> Result<Vec<ComposedFrame>, DecodeError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let decoder = GifDecoder::new(Cursor::new(bytes))?;
    let mut frames = Vec::new();

    for frame in decoder.into_frames() {
        let frame = frame?;
        let (numer, denom) = frame.delay().numer_denom_ms();
        let delay = delay_hundredths(numer, denom);

        let buffer = frame.into_buffer();
        let (width, height) = buffer.dimensions();
        let data = composite(buffer.as_raw(), background);

        log::debug!("decoded frame {}: {width}x{height}, delay {delay}", frames.len());
        frames.push(ComposedFrame {
            data,
            width,
            height,
            delay,
        });
    }

    if frames.is_empty() {
        return Err(DecodeError::Empty);
    }
    Ok(frames)
}

fn delay_hundredths(numer: u32, denom: u32) -> u32 {
    if denom == 0 {
        return 0;
    }
    (numer as f64 / denom as f64 / 10.0).round() as u32
}

/// Flatten RGBA32 into RGB24.
///
/// An opaque background is blended under each pixel (source-over). Otherwise
/// pixels are composited over transparent black, i.e. premultiplied by their
/// own alpha.
pub fn composite(rgba: &[u8], background: Color) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    let (bg_r, bg_g, bg_b) = if background.is_opaque() {
        (background.r, background.g, background.b)
    } else {
        (0, 0, 0)
    };

    for px in rgba.chunks_exact(4) {
        let alpha = px[3];
        if alpha == u8::MAX {
            rgb.extend_from_slice(&px[..3]);
            continue;
        }
        rgb.push(blend(px[0], bg_r, alpha));
        rgb.push(blend(px[1], bg_g, alpha));
        rgb.push(blend(px[2], bg_b, alpha));
    }

    rgb
}

fn blend(src: u8, dst: u8, alpha: u8) -> u8 {
    let a = alpha as u32;
    ((src as u32 * a + dst as u32 * (255 - a) + 127) / 255) as u8
}
