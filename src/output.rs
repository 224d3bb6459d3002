//! Window output: composes the camera frame, the skeleton overlay, the
//! demo buttons and status text into one 0RGB buffer shown with minifb.

use anyhow::{anyhow, Result};
use image::RgbaImage;

use crate::controls::{ControlLayout, DemoControls};
use crate::font;
use crate::overlay::HandLabel;
use crate::ttf::FontRenderer;
use crate::types::{Frame, Rect};

pub fn rgb(r: u8, g: u8, b: u8) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

fn channels(color: u32) -> (u32, u32, u32) {
    ((color >> 16) & 0xFF, (color >> 8) & 0xFF, color & 0xFF)
}

/// A 0RGB pixel buffer.
pub struct Canvas {
    pixels: Vec<u32>,
    width: usize,
    height: usize,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![0; width * height],
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.width && y < self.height).then(|| self.pixels[y * self.width + x])
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        if width != self.width || height != self.height {
            self.width = width;
            self.height = height;
            self.pixels = vec![0; width * height];
        }
    }

    pub fn fill(&mut self, color: u32) {
        self.pixels.iter_mut().for_each(|p| *p = color);
    }

    /// Alpha-blend one pixel; out-of-bounds writes are dropped.
    pub fn blend(&mut self, x: i32, y: i32, color: u32, alpha: u8) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let idx = y as usize * self.width + x as usize;
        if alpha == 255 {
            self.pixels[idx] = color;
            return;
        }
        let a = alpha as u32;
        let (sr, sg, sb) = channels(color);
        let (dr, dg, db) = channels(self.pixels[idx]);
        let mix = |s: u32, d: u32| (s * a + d * (255 - a)) / 255;
        self.pixels[idx] = (mix(sr, dr) << 16) | (mix(sg, dg) << 8) | mix(sb, db);
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: u32, alpha: u8) {
        for py in y..y + h as i32 {
            for px in x..x + w as i32 {
                self.blend(px, py, color, alpha);
            }
        }
    }

    pub fn outline_rect(&mut self, rect: &Rect, color: u32, thickness: u32) {
        let (x, y) = (rect.left as i32, rect.top as i32);
        let (w, h) = (rect.width().max(0.0) as u32, rect.height().max(0.0) as u32);
        let t = thickness.min(w / 2).min(h / 2).max(1);
        self.fill_rect(x, y, w, t, color, 255);
        self.fill_rect(x, y + h as i32 - t as i32, w, t, color, 255);
        self.fill_rect(x, y, t, h, color, 255);
        self.fill_rect(x + w as i32 - t as i32, y, t, h, color, 255);
    }

    /// Scale the frame to fill the canvas (nearest neighbour).
    pub fn draw_frame(&mut self, frame: &Frame, mirrored: bool) {
        let (fw, fh) = (frame.width() as usize, frame.height() as usize);
        if fw == 0 || fh == 0 {
            return;
        }
        for y in 0..self.height {
            let sy = y * fh / self.height;
            for x in 0..self.width {
                let mut sx = x * fw / self.width;
                if mirrored {
                    sx = fw - 1 - sx;
                }
                let p = frame.get_pixel(sx as u32, sy as u32);
                self.pixels[y * self.width + x] = rgb(p[0], p[1], p[2]);
            }
        }
    }

    /// Blend a transparent layer over the whole canvas, mirrored like
    /// the video beneath it.
    pub fn draw_layer(&mut self, layer: &RgbaImage, mirrored: bool) {
        let (lw, lh) = (layer.width() as usize, layer.height() as usize);
        if lw == 0 || lh == 0 {
            return;
        }
        for y in 0..self.height {
            let sy = y * lh / self.height;
            for x in 0..self.width {
                let mut sx = x * lw / self.width;
                if mirrored {
                    sx = lw - 1 - sx;
                }
                let p = layer.get_pixel(sx as u32, sy as u32);
                if p[3] > 0 {
                    self.blend(x as i32, y as i32, rgb(p[0], p[1], p[2]), p[3]);
                }
            }
        }
    }
}

/// TrueType text when a font was found, bitmap text otherwise.
pub enum TextRenderer {
    Ttf { font: FontRenderer, size_pt: f32 },
    Bitmap { scale: usize },
}

impl TextRenderer {
    pub fn new(family: &str, size_pt: f32, bitmap_scale: usize) -> Self {
        match FontRenderer::try_load(family) {
            Some(font) => TextRenderer::Ttf { font, size_pt },
            None => TextRenderer::Bitmap {
                scale: bitmap_scale.max(1),
            },
        }
    }

    pub fn measure(&self, text: &str) -> (usize, usize) {
        match self {
            TextRenderer::Ttf { font, size_pt } => font.measure(text, *size_pt),
            TextRenderer::Bitmap { scale } => (font::text_width(text, *scale), font::text_height(*scale)),
        }
    }

    pub fn draw(&self, canvas: &mut Canvas, x: i32, y: i32, text: &str, color: u32) {
        match self {
            TextRenderer::Ttf { font, size_pt } => font.draw_text(canvas, x, y, text, color, *size_pt),
            TextRenderer::Bitmap { scale } => font::draw_text(canvas, x, y, text, color, *scale),
        }
    }

    /// Draw `text` horizontally centred on `cx`.
    pub fn draw_centered(&self, canvas: &mut Canvas, cx: f32, y: i32, text: &str, color: u32) {
        let (w, _) = self.measure(text);
        self.draw(canvas, (cx - w as f32 / 2.0) as i32, y, text, color);
    }
}

/// Everything shown in one window update.
pub struct Scene<'a> {
    pub frame: Option<&'a Frame>,
    pub overlay: &'a RgbaImage,
    pub mirrored: bool,
    pub labels: &'a [HandLabel],
    pub label_color: u32,
    pub layout: &'a ControlLayout,
    pub controls: &'a DemoControls,
    /// Loading or error text, with its colour.
    pub status: Option<(String, u32)>,
}

const BUTTON_FILL: u32 = 0x0020_2020;
const WHITE: u32 = 0x00FF_FFFF;
const PAD: i32 = 4;

pub fn render(canvas: &mut Canvas, scene: &Scene, text: &TextRenderer) {
    canvas.fill(0);
    if let Some(frame) = scene.frame {
        canvas.draw_frame(frame, scene.mirrored);
        canvas.draw_layer(scene.overlay, scene.mirrored);
    }

    let (w, h) = (canvas.width() as f32, canvas.height() as f32);

    if scene.controls.show_labels() {
        for label in scene.labels {
            let (tw, th) = text.measure(&label.text);
            let cx = label.left_pct / 100.0 * w;
            let top = (label.top_pct / 100.0 * h) as i32;
            let left = (cx - tw as f32 / 2.0) as i32;
            canvas.fill_rect(left - PAD, top - PAD, tw as u32 + 2 * PAD as u32, th as u32 + 2 * PAD as u32, 0, 128);
            text.draw(canvas, left, top, &label.text, scene.label_color);
        }
    }

    let (_, line) = text.measure("0");

    let count = scene.layout.count_button();
    canvas.fill_rect(count.left as i32, count.top as i32, count.width() as u32, count.height() as u32, BUTTON_FILL, 180);
    canvas.outline_rect(&count, WHITE, 2);
    let mid = count.top + (count.height() - line as f32) / 2.0;
    text.draw_centered(canvas, w / 2.0, mid as i32, "PUSH", WHITE);
    text.draw_centered(canvas, w / 2.0, count.bottom as i32 + PAD * 2, &scene.controls.count_text(), WHITE);

    let labels = scene.layout.labels_button();
    canvas.fill_rect(labels.left as i32, labels.top as i32, labels.width() as u32, labels.height() as u32, BUTTON_FILL, 180);
    canvas.outline_rect(&labels, WHITE, 2);
    let mid = labels.top + (labels.height() - line as f32) / 2.0;
    text.draw_centered(canvas, w / 2.0, mid as i32, &scene.controls.labels_text(), WHITE);

    let gesture = format!("GESTURE: {}", scene.controls.gesture().replace('_', " "));
    text.draw(canvas, 10, canvas.height() as i32 - line as i32 - 10, &gesture, WHITE);

    if let Some((message, color)) = &scene.status {
        let (tw, th) = text.measure(message);
        let top = (h * 0.7) as i32;
        let left = ((w - tw as f32) / 2.0) as i32;
        canvas.fill_rect(left - PAD * 2, top - PAD * 2, tw as u32 + 4 * PAD as u32, th as u32 + 4 * PAD as u32, 0, 200);
        text.draw(canvas, left, top, message, *color);
    }
}

pub struct WindowOutput {
    window: minifb::Window,
    canvas: Canvas,
    mouse_down_prev: bool,
}

impl WindowOutput {
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self> {
        let mut window = minifb::Window::new(
            title,
            width,
            height,
            minifb::WindowOptions {
                resize: true,
                ..minifb::WindowOptions::default()
            },
        )
        .map_err(|e| anyhow!("Failed to create window: {}", e))?;

        window.set_target_fps(60);

        Ok(Self {
            window,
            canvas: Canvas::new(width, height),
            mouse_down_prev: false,
        })
    }

    pub fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(minifb::Key::Escape)
    }

    pub fn size(&self) -> (usize, usize) {
        self.window.get_size()
    }

    /// Left-button press edge, in window pixels.
    pub fn mouse_click(&mut self) -> Option<(f32, f32)> {
        let down = self.window.get_mouse_down(minifb::MouseButton::Left);
        let pressed = down && !self.mouse_down_prev;
        self.mouse_down_prev = down;
        if pressed {
            self.window.get_mouse_pos(minifb::MouseMode::Discard)
        } else {
            None
        }
    }

    pub fn present(&mut self, scene: &Scene, text: &TextRenderer) -> Result<()> {
        let (w, h) = self.size();
        self.canvas.resize(w.max(1), h.max(1));
        render(&mut self.canvas, scene, text);
        self.window
            .update_with_buffer(self.canvas.pixels(), self.canvas.width(), self.canvas.height())
            .map_err(|e| anyhow!("Window update failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba};

    #[test]
    fn test_blend() {
        let mut canvas = Canvas::new(2, 1);
        canvas.blend(0, 0, rgb(255, 255, 255), 255);
        assert_eq!(canvas.pixel(0, 0), Some(0x00FF_FFFF));
        canvas.blend(1, 0, rgb(200, 0, 0), 128);
        assert_eq!(canvas.pixel(1, 0), Some(rgb(100, 0, 0)));
        // Out of bounds is ignored.
        canvas.blend(-1, 5, 0, 255);
    }

    #[test]
    fn test_frame_is_mirrored() {
        let mut frame = Frame::new(2, 1);
        frame.put_pixel(0, 0, Rgb([255, 0, 0]));
        frame.put_pixel(1, 0, Rgb([0, 0, 255]));

        let mut canvas = Canvas::new(2, 1);
        canvas.draw_frame(&frame, true);
        assert_eq!(canvas.pixel(0, 0), Some(rgb(0, 0, 255)));
        canvas.draw_frame(&frame, false);
        assert_eq!(canvas.pixel(0, 0), Some(rgb(255, 0, 0)));
    }

    #[test]
    fn test_layer_skips_transparent_pixels() {
        let mut layer = RgbaImage::new(4, 4);
        layer.put_pixel(0, 0, Rgba([255, 165, 0, 255]));
        let mut canvas = Canvas::new(4, 4);
        canvas.fill(rgb(1, 2, 3));
        canvas.draw_layer(&layer, true);
        assert_eq!(canvas.pixel(3, 0), Some(rgb(255, 165, 0)));
        assert_eq!(canvas.pixel(0, 0), Some(rgb(1, 2, 3)));
    }

    #[test]
    fn test_render_status_and_buttons() {
        let layout = ControlLayout::new(160, 120);
        let controls = DemoControls::new(false);
        let overlay = RgbaImage::new(0, 0);
        let scene = Scene {
            frame: None,
            overlay: &overlay,
            mirrored: true,
            labels: &[],
            label_color: rgb(0, 255, 255),
            layout: &layout,
            controls: &controls,
            status: Some(("LOADING".to_string(), rgb(255, 255, 0))),
        };
        let mut canvas = Canvas::new(160, 120);
        render(&mut canvas, &scene, &TextRenderer::Bitmap { scale: 1 });

        let count = layout.count_button();
        assert_eq!(canvas.pixel(count.left as usize, count.top as usize), Some(WHITE));
        assert!(canvas.pixels().iter().any(|&p| p == rgb(255, 255, 0)));
    }
}
