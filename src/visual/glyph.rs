//! Minimal raster primitives: lines, rectangles and a 3x5 pixel font for labels and captions.

use image::{Rgb, RgbImage};

/// Width of one glyph cell in font pixels.
pub const GLYPH_WIDTH: u32 = 3;
/// Height of one glyph cell in font pixels.
pub const GLYPH_HEIGHT: u32 = 5;
/// Horizontal advance per character in font pixels (glyph plus one column gap).
pub const GLYPH_ADVANCE: u32 = GLYPH_WIDTH + 1;

/// Rows of a glyph, most significant of the three low bits is the leftmost pixel.
fn glyph(ch: char) -> [u8; 5] {
    match ch {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        'k' => [0b100, 0b101, 0b110, 0b101, 0b101],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'z' => [0b000, 0b111, 0b001, 0b010, 0b111],
        's' => [0b000, 0b011, 0b010, 0b001, 0b110],
        'd' => [0b001, 0b001, 0b111, 0b101, 0b111],
        'A' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'C' => [0b011, 0b100, 0b100, 0b100, 0b011],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'G' => [0b011, 0b100, 0b101, 0b101, 0b011],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'J' => [0b001, 0b001, 0b001, 0b101, 0b010],
        'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'N' => [0b110, 0b101, 0b101, 0b101, 0b101],
        'O' => [0b010, 0b101, 0b101, 0b101, 0b010],
        'P' => [0b110, 0b101, 0b110, 0b100, 0b100],
        'Q' => [0b010, 0b101, 0b101, 0b110, 0b011],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' => [0b011, 0b100, 0b010, 0b001, 0b110],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' => [0b101, 0b101, 0b101, 0b101, 0b010],
        'W' => [0b101, 0b101, 0b111, 0b111, 0b101],
        'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'Y' => [0b101, 0b101, 0b010, 0b010, 0b010],
        'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '(' => [0b010, 0b100, 0b100, 0b100, 0b010],
        ')' => [0b010, 0b001, 0b001, 0b001, 0b010],
        '%' => [0b101, 0b001, 0b010, 0b100, 0b101],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        '_' => [0b000, 0b000, 0b000, 0b000, 0b111],
        ' ' => [0; 5],
        // lowercase without a dedicated glyph borrows the capital
        c if c.is_ascii_lowercase() => glyph(c.to_ascii_uppercase()),
        _ => [0b111, 0b101, 0b101, 0b101, 0b111],
    }
}

/// Pixel width of `text` rendered at `scale`.
pub fn text_width(text: &str, scale: u32) -> u32 {
    let n = text.chars().count() as u32;
    if n == 0 {
        0
    } else {
        (n * GLYPH_ADVANCE - 1) * scale
    }
}

fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && x < img.width() as i64 && y < img.height() as i64 {
        img.put_pixel(x as u32, y as u32, color);
    }
}

/// Fill an axis-aligned rectangle, clipped to the image.
pub fn fill_rect(img: &mut RgbImage, x: i64, y: i64, width: u32, height: u32, color: Rgb<u8>) {
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + width as i64).min(img.width() as i64);
    let y1 = (y + height as i64).min(img.height() as i64);
    for yy in y0..y1 {
        for xx in x0..x1 {
            img.put_pixel(xx as u32, yy as u32, color);
        }
    }
}

/// Bresenham line between two points, clipped to the image.
pub fn line(img: &mut RgbImage, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put(img, x, y, color);
        if (x, y) == to {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Draw `text` with its top-left corner at `(x, y)`.
pub fn text(img: &mut RgbImage, x: i64, y: i64, text: &str, scale: u32, color: Rgb<u8>) {
    let scale = scale.max(1);
    let mut cx = x;
    for ch in text.chars() {
        for (row, bits) in glyph(ch).iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (0b100 >> col) != 0 {
                    fill_rect(
                        img,
                        cx + (col * scale) as i64,
                        y + (row as u32 * scale) as i64,
                        scale,
                        scale,
                        color,
                    );
                }
            }
        }
        cx += (GLYPH_ADVANCE * scale) as i64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

    #[test]
    fn text_sets_pixels_and_scales() {
        let mut small = RgbImage::new(40, 20);
        text(&mut small, 1, 1, "10", 1, WHITE);
        let lit_small = small.pixels().filter(|p| **p == WHITE).count();
        let mut big = RgbImage::new(40, 20);
        text(&mut big, 1, 1, "10", 2, WHITE);
        let lit_big = big.pixels().filter(|p| **p == WHITE).count();
        assert!(lit_small > 0);
        assert_eq!(lit_big, lit_small * 4);
        assert_eq!(text_width("10", 2), 14);
        assert_eq!(text_width("", 2), 0);
    }

    /// Letters and caption punctuation have their own shapes instead of the fallback box.
    #[test]
    fn caption_characters_are_covered() {
        let fallback = glyph('\u{2603}');
        for ch in "ABCDEFGHIJKLMNOPQRSTUVWXYZ:=,/()%+_".chars() {
            assert_ne!(glyph(ch), fallback, "{ch} has no glyph");
        }
        assert_eq!(glyph('w'), glyph('W'));
        assert_ne!(glyph('k'), glyph('K'));
        assert_ne!(glyph('O'), glyph('0'));
    }

    #[test]
    fn line_and_rect_clip_to_image() {
        let mut img = RgbImage::new(10, 10);
        line(&mut img, (-5, 0), (15, 0), WHITE);
        assert!((0..10).all(|x| *img.get_pixel(x, 0) == WHITE));
        fill_rect(&mut img, 8, 8, 10, 10, WHITE);
        assert_eq!(*img.get_pixel(9, 9), WHITE);
        assert_eq!(*img.get_pixel(7, 7), Rgb([0, 0, 0]));
    }
}
