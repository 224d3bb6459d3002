//! 3x5 bitmap font used when no TrueType font can be found.
//!
//! Lowercase letters render as uppercase. Characters without a glyph draw
//! as `?`.

use crate::output::Canvas;

pub const GLYPH_WIDTH: usize = 3;
pub const GLYPH_HEIGHT: usize = 5;

/// Rows top to bottom, bit 2 is the leftmost column.
fn glyph(c: char) -> [u8; GLYPH_HEIGHT] {
    match c.to_ascii_uppercase() {
        'A' => [0x2, 0x5, 0x7, 0x5, 0x5],
        'B' => [0x6, 0x5, 0x6, 0x5, 0x6],
        'C' => [0x3, 0x4, 0x4, 0x4, 0x3],
        'D' => [0x6, 0x5, 0x5, 0x5, 0x6],
        'E' => [0x7, 0x4, 0x6, 0x4, 0x7],
        'F' => [0x7, 0x4, 0x6, 0x4, 0x4],
        'G' => [0x3, 0x4, 0x5, 0x5, 0x3],
        'H' => [0x5, 0x5, 0x7, 0x5, 0x5],
        'I' => [0x7, 0x2, 0x2, 0x2, 0x7],
        'J' => [0x1, 0x1, 0x1, 0x5, 0x2],
        'K' => [0x5, 0x5, 0x6, 0x5, 0x5],
        'L' => [0x4, 0x4, 0x4, 0x4, 0x7],
        'M' => [0x5, 0x7, 0x7, 0x5, 0x5],
        'N' => [0x6, 0x5, 0x5, 0x5, 0x5],
        'O' => [0x2, 0x5, 0x5, 0x5, 0x2],
        'P' => [0x6, 0x5, 0x6, 0x4, 0x4],
        'Q' => [0x2, 0x5, 0x5, 0x6, 0x3],
        'R' => [0x6, 0x5, 0x6, 0x5, 0x5],
        'S' => [0x3, 0x4, 0x2, 0x1, 0x6],
        'T' => [0x7, 0x2, 0x2, 0x2, 0x2],
        'U' => [0x5, 0x5, 0x5, 0x5, 0x7],
        'V' => [0x5, 0x5, 0x5, 0x5, 0x2],
        'W' => [0x5, 0x5, 0x7, 0x7, 0x5],
        'X' => [0x5, 0x5, 0x2, 0x5, 0x5],
        'Y' => [0x5, 0x5, 0x2, 0x2, 0x2],
        'Z' => [0x7, 0x1, 0x2, 0x4, 0x7],
        '0' => [0x7, 0x5, 0x5, 0x5, 0x7],
        '1' => [0x2, 0x6, 0x2, 0x2, 0x7],
        '2' => [0x7, 0x1, 0x7, 0x4, 0x7],
        '3' => [0x7, 0x1, 0x7, 0x1, 0x7],
        '4' => [0x5, 0x5, 0x7, 0x1, 0x1],
        '5' => [0x7, 0x4, 0x7, 0x1, 0x7],
        '6' => [0x7, 0x4, 0x7, 0x5, 0x7],
        '7' => [0x7, 0x1, 0x2, 0x4, 0x4],
        '8' => [0x7, 0x5, 0x7, 0x5, 0x7],
        '9' => [0x7, 0x5, 0x7, 0x1, 0x7],
        ' ' => [0x0, 0x0, 0x0, 0x0, 0x0],
        ':' => [0x0, 0x2, 0x0, 0x2, 0x0],
        '%' => [0x5, 0x1, 0x2, 0x4, 0x5],
        '(' => [0x1, 0x2, 0x2, 0x2, 0x1],
        ')' => [0x4, 0x2, 0x2, 0x2, 0x4],
        '.' => [0x0, 0x0, 0x0, 0x0, 0x2],
        ',' => [0x0, 0x0, 0x0, 0x2, 0x4],
        '-' => [0x0, 0x0, 0x7, 0x0, 0x0],
        '_' => [0x0, 0x0, 0x0, 0x0, 0x7],
        '!' => [0x2, 0x2, 0x2, 0x0, 0x2],
        '/' => [0x1, 0x1, 0x2, 0x4, 0x4],
        _ => [0x6, 0x1, 0x2, 0x0, 0x2],
    }
}

/// Horizontal advance of one character at `scale`.
fn advance(scale: usize) -> usize {
    (GLYPH_WIDTH + 1) * scale
}

pub fn text_width(text: &str, scale: usize) -> usize {
    let n = text.chars().count();
    if n == 0 {
        return 0;
    }
    n * advance(scale) - scale
}

pub fn text_height(scale: usize) -> usize {
    GLYPH_HEIGHT * scale
}

pub fn draw_text(canvas: &mut Canvas, x: i32, y: i32, text: &str, color: u32, scale: usize) {
    let scale = scale.max(1);
    let mut cx = x;
    for c in text.chars() {
        draw_char(canvas, cx, y, c, color, scale);
        cx += advance(scale) as i32;
    }
}

fn draw_char(canvas: &mut Canvas, x: i32, y: i32, c: char, color: u32, scale: usize) {
    for (row, bits) in glyph(c).iter().enumerate() {
        for col in 0..GLYPH_WIDTH {
            if (bits >> (GLYPH_WIDTH - 1 - col)) & 1 == 0 {
                continue;
            }
            let px = x + (col * scale) as i32;
            let py = y + (row * scale) as i32;
            canvas.fill_rect(px, py, scale as u32, scale as u32, color, 255);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_metrics() {
        assert_eq!(text_width("", 2), 0);
        assert_eq!(text_width("A", 1), 3);
        assert_eq!(text_width("AB", 2), 14);
        assert_eq!(text_height(3), 15);
    }

    #[test]
    fn test_lowercase_matches_uppercase() {
        assert_eq!(glyph('p'), glyph('P'));
        assert_eq!(glyph('~'), glyph('?'));
    }

    #[test]
    fn test_draw_sets_pixels() {
        let mut canvas = Canvas::new(8, 8);
        draw_text(&mut canvas, 0, 0, "I", 0x00FF_FFFF, 1);
        // Top row of 'I' is fully lit.
        assert_eq!(canvas.pixel(0, 0), Some(0x00FF_FFFF));
        assert_eq!(canvas.pixel(2, 0), Some(0x00FF_FFFF));
        // Second row only the middle column.
        assert_eq!(canvas.pixel(0, 1), Some(0));
        assert_eq!(canvas.pixel(1, 1), Some(0x00FF_FFFF));
    }
}
