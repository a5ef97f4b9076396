//! Bitmap text rendering on RGB frames

use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{Rgb, RgbImage};

/// Glyph cell edge in font pixels
pub const GLYPH_SIZE: u32 = 8;

const FALLBACK_GLYPH: char = '?';

fn glyph(c: char) -> [u8; 8] {
    BASIC_FONTS
        .get(c)
        .or_else(|| BASIC_FONTS.get(FALLBACK_GLYPH))
        .unwrap_or([0; 8])
}

/// Width and height of `text` rendered at `scale`
pub fn text_size(text: &str, scale: u32) -> (u32, u32) {
    let scale = scale.max(1);
    let chars = text.chars().count() as u32;
    (chars * GLYPH_SIZE * scale, GLYPH_SIZE * scale)
}

/// Draw `text` with its top-left corner at `(x, y)`. Pixels outside the
/// image are skipped.
pub fn draw_text_mut(image: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, scale: u32, text: &str) {
    let scale = scale.max(1) as i32;
    let cell = GLYPH_SIZE as i32 * scale;
    let (width, height) = (image.width() as i32, image.height() as i32);

    for (index, c) in text.chars().enumerate() {
        let origin_x = x.saturating_add((index as i32).saturating_mul(cell));
        if origin_x >= width {
            break;
        }

        for (row, bits) in glyph(c).iter().enumerate() {
            for col in 0..GLYPH_SIZE as i32 {
                if bits & (1 << col) == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        let px = origin_x.saturating_add(col * scale + dx);
                        let py = y.saturating_add(row as i32 * scale + dy);
                        if px >= 0 && py >= 0 && px < width && py < height {
                            image.put_pixel(px as u32, py as u32, color);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_size() {
        assert_eq!(text_size("abc", 1), (24, 8));
        assert_eq!(text_size("abc", 2), (48, 16));
        assert_eq!(text_size("", 2), (0, 16));
    }

    #[test]
    fn test_draw_text_marks_pixels() {
        let mut image = RgbImage::new(32, 16);
        draw_text_mut(&mut image, Rgb([255, 255, 255]), 0, 0, 1, "A");
        assert!(image.pixels().any(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn test_space_draws_nothing() {
        let mut image = RgbImage::new(16, 16);
        draw_text_mut(&mut image, Rgb([255, 0, 0]), 0, 0, 2, " ");
        assert!(image.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn test_missing_glyph_uses_fallback() {
        let mut fallback = RgbImage::new(8, 8);
        draw_text_mut(&mut fallback, Rgb([9, 9, 9]), 0, 0, 1, "?");
        let mut missing = RgbImage::new(8, 8);
        draw_text_mut(&mut missing, Rgb([9, 9, 9]), 0, 0, 1, "\u{1F34E}");
        assert_eq!(fallback, missing);
    }

    #[test]
    fn test_text_at_coordinate_limits() {
        let mut image = RgbImage::new(8, 8);
        draw_text_mut(&mut image, Rgb([1, 2, 3]), i32::MAX - 4, i32::MAX - 4, 4, "edge");
        draw_text_mut(&mut image, Rgb([1, 2, 3]), i32::MIN, i32::MIN, 4, "edge");
        assert!(image.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn test_offscreen_text_is_clipped() {
        let mut image = RgbImage::new(8, 8);
        draw_text_mut(&mut image, Rgb([1, 2, 3]), -100, -100, 3, "clipped");
        draw_text_mut(&mut image, Rgb([1, 2, 3]), 100, 100, 3, "clipped");
        assert!(image.pixels().all(|p| p.0 == [0, 0, 0]));
    }
}
