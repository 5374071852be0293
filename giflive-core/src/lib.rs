pub mod decode;
pub mod encode;
pub mod error;
pub mod format;
pub mod quantize;
pub mod rendered;
pub mod resize;

pub use error::{ConfigError, DecodeError, Error, Result};
pub use format::{CellRole, Color, ColorCell, DitheringMode, FrameGrid, ScaleMode};
pub use rendered::{RenderOptions, RenderedImage, CLEAR_SCREEN, CURSOR_HOME};

#[cfg(test)]
mod tests {
    use image::codecs::gif::{GifEncoder, Repeat};
    use image::{Delay, Frame, Rgba, RgbaImage};

    use crate::*;

    /// Encode solid-color frames as an animated GIF.
    fn animated_gif(width: u32, height: u32, colors: &[[u8; 4]], delay_ms: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut bytes);
            encoder.set_repeat(Repeat::Infinite).unwrap();
            for color in colors {
                let buffer = RgbaImage::from_pixel(width, height, Rgba(*color));
                let delay = Delay::from_numer_denom_ms(delay_ms, 1);
                encoder.encode_frame(Frame::from_parts(buffer, 0, 0, delay)).unwrap();
            }
        }
        bytes
    }

    fn options(rows: u32, cols: u32, scale_mode: ScaleMode, dithering: DitheringMode) -> RenderOptions {
        RenderOptions {
            rows,
            cols,
            scale_mode,
            dithering,
            ..RenderOptions::default()
        }
    }

    #[test]
    fn build_and_render_halfblocks() {
        let gif = animated_gif(20, 10, &[[255, 0, 0, 255], [0, 255, 0, 255]], 70);
        let image = RenderedImage::from_reader(&gif[..], &options(4, 8, ScaleMode::Resize, DitheringMode::None)).unwrap();

        assert_eq!(image.frame_count(), 2);
        assert_eq!((image.height(), image.width()), (8, 8));
        assert_eq!(image.frame_delay(0).unwrap(), 7);
        assert_eq!(image.frame_delay(1).unwrap(), 7);

        for frame in 0..2 {
            let text = image.render(frame, false).unwrap();
            assert_eq!(text.lines().count(), 4);
            assert_eq!(text.matches('\u{2584}').count(), 4 * 8);
        }
    }

    #[test]
    fn fit_keeps_aspect_for_every_frame() {
        // 4:1 source into a 20x20 pixel target: 20x5 pixels, 4 grid rows.
        let gif = animated_gif(40, 10, &[[10, 10, 10, 255], [200, 200, 200, 255]], 100);
        let image = RenderedImage::from_reader(&gif[..], &options(10, 20, ScaleMode::Fit, DitheringMode::None)).unwrap();

        assert_eq!(image.frame_count(), 2);
        assert!(image.width() <= 20);
        assert_eq!((image.height(), image.width()), (4, 20));
        for frame in 0..2 {
            let text = image.render(frame, false).unwrap();
            assert_eq!(text.lines().count(), 2);
            for line in text.lines() {
                assert_eq!(line.matches('\u{2584}').count(), 20);
            }
        }
    }

    #[test]
    fn fill_and_resize_cover_the_target() {
        let gif = animated_gif(40, 10, &[[10, 10, 10, 255]], 100);
        for mode in [ScaleMode::Fill, ScaleMode::Resize] {
            let image = RenderedImage::from_reader(&gif[..], &options(3, 5, mode, DitheringMode::Chars)).unwrap();
            assert_eq!((image.height(), image.width()), (3, 5), "{mode}");
        }
    }

    #[test]
    fn transparency_shows_the_background() {
        let gif = animated_gif(8, 16, &[[0, 0, 0, 0]], 50);
        let options = RenderOptions {
            background: Color::rgb(0, 0, 255),
            ..options(2, 2, ScaleMode::Resize, DitheringMode::Blocks)
        };
        let image = RenderedImage::from_reader(&gif[..], &options).unwrap();

        let cell = image.get_at(0, 1, 1).unwrap();
        assert_eq!((cell.r, cell.g, cell.b, cell.brightness), (0, 0, 255, 255));

        let text = image.render(0, false).unwrap();
        assert_eq!(text.matches("\x1b[48;2;0;0;255m\x1b[38;2;0;0;255m\u{2588}").count(), 4);
        let bare = image.render(0, true).unwrap();
        assert!(!bare.contains("\x1b[48;2;"));
    }

    #[test]
    fn rendering_is_idempotent_across_parallelism() {
        let gif = animated_gif(30, 30, &[[40, 80, 120, 255], [120, 80, 40, 255]], 30);
        let mut image =
            RenderedImage::from_reader(&gif[..], &options(6, 10, ScaleMode::Fit, DitheringMode::None)).unwrap();

        let serial = image.render(1, false).unwrap();
        image.set_parallelism(4);
        assert_eq!(image.render(1, false).unwrap(), serial);
        assert_eq!(image.render(1, false).unwrap(), serial);
    }

    #[test]
    fn unscaled_uses_native_size() {
        let gif = animated_gif(9, 7, &[[1, 2, 3, 255]], 10);
        let image = RenderedImage::from_reader_unscaled(&gif[..], Color::BLACK, DitheringMode::None).unwrap();
        assert_eq!((image.height(), image.width()), (6, 9));
    }

    #[test]
    fn bad_sources_are_decode_errors() {
        let opts = RenderOptions::default();
        assert!(matches!(
            RenderedImage::from_reader(&b"GIF89a"[..], &opts),
            Err(Error::Decode(_))
        ));
        assert!(matches!(
            RenderedImage::from_reader(&b""[..], &opts),
            Err(Error::Decode(_))
        ));
    }
}
