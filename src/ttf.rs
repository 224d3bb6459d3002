use rusttype::{point, Font, Scale};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::output::Canvas;

/// Anti-aliased text from a system TrueType font.
pub struct FontRenderer {
    font: Font<'static>,
}

fn candidate_paths(family: &str) -> Vec<PathBuf> {
    let file = format!("{family}.ttf");
    [
        "/usr/share/fonts/truetype/dejavu",
        "/usr/share/fonts/truetype",
        "/usr/share/fonts/TTF",
        "/Library/Fonts",
        "/System/Library/Fonts",
        "/System/Library/Fonts/Supplemental",
        "C:\\Windows\\Fonts",
        ".",
    ]
    .iter()
    .map(|dir| PathBuf::from(dir).join(&file))
    .collect()
}

impl FontRenderer {
    pub fn try_load(family: &str) -> Option<Self> {
        for path in candidate_paths(family) {
            let Ok(data) = fs::read(&path) else {
                continue;
            };
            if let Some(font) = Font::try_from_vec(data) {
                info!("Loaded font from {}", path.display());
                return Some(Self { font });
            }
        }
        warn!("font family '{}' not found; using bitmap font", family);
        None
    }

    pub fn draw_text(&self, canvas: &mut Canvas, x: i32, y: i32, text: &str, color: u32, size_pt: f32) {
        let scale = Scale::uniform(size_pt);
        let ascent = self.font.v_metrics(scale).ascent;
        let start = point(x as f32, y as f32 + ascent);

        for glyph in self.font.layout(text, scale, start) {
            let Some(bb) = glyph.pixel_bounding_box() else {
                continue;
            };
            glyph.draw(|gx, gy, coverage| {
                let alpha = (coverage * 255.0) as u8;
                if alpha > 0 {
                    canvas.blend(bb.min.x + gx as i32, bb.min.y + gy as i32, color, alpha);
                }
            });
        }
    }

    /// Rendered size of `text` in pixels.
    pub fn measure(&self, text: &str, size_pt: f32) -> (usize, usize) {
        let scale = Scale::uniform(size_pt);
        let v = self.font.v_metrics(scale);
        let width = self
            .font
            .layout(text, scale, point(0.0, v.ascent))
            .last()
            .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
            .unwrap_or(0.0);
        (width.ceil() as usize, (v.ascent - v.descent).ceil() as usize)
    }
}
