//! Skeleton overlay drawn on a transparent layer above the video.
//!
//! Drawing is a pure function of the recognition result and the frame
//! size: the surface is resized to the frame and cleared before every draw.

use image::{Rgba, RgbaImage};

use crate::config::{parse_hex, UiConfig};
use crate::types::{Hand, RecognitionResult};

/// Pairs of landmark indices joined by a line.
#[rustfmt::skip]
pub const HAND_CONNECTIONS: [(usize, usize); 23] = [
    (0, 1), (1, 2), (2, 3), (3, 4),         // Thumb
    (0, 5), (5, 6), (6, 7), (7, 8),         // Index
    (0, 9), (9, 10), (10, 11), (11, 12),    // Middle
    (0, 13), (13, 14), (14, 15), (15, 16),  // Ring
    (0, 17), (17, 18), (18, 19), (19, 20),  // Pinky
    (5, 9), (9, 13), (13, 17),              // Palm
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    pub line_color: Rgba<u8>,
    pub line_width: u32,
    pub point_color: Rgba<u8>,
    pub point_radius: u32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            line_color: Rgba([255, 255, 255, 255]),
            line_width: 2,
            point_color: Rgba([255, 165, 0, 255]),
            point_radius: 4,
        }
    }
}

impl OverlayStyle {
    pub fn from_config(ui: &UiConfig) -> Self {
        let (lr, lg, lb) = parse_hex(&ui.line_color_hex);
        let (pr, pg, pb) = parse_hex(&ui.point_color_hex);
        Self {
            line_color: Rgba([lr, lg, lb, 255]),
            line_width: ui.line_width.max(1),
            point_color: Rgba([pr, pg, pb, 255]),
            point_radius: ui.point_radius,
        }
    }
}

/// Transparent RGBA drawing layer.
pub struct Surface {
    image: RgbaImage,
}

impl Surface {
    pub fn new() -> Self {
        Self {
            image: RgbaImage::new(0, 0),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Match the frame size. Contents are undefined after a resize.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.image.width() != width || self.image.height() != height {
            self.image = RgbaImage::new(width, height);
        }
    }

    pub fn clear(&mut self) {
        for p in self.image.pixels_mut() {
            *p = Rgba([0, 0, 0, 0]);
        }
    }

    fn put(&mut self, x: i64, y: i64, color: Rgba<u8>) {
        if x >= 0 && y >= 0 && (x as u32) < self.image.width() && (y as u32) < self.image.height() {
            self.image.put_pixel(x as u32, y as u32, color);
        }
    }

    fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: Rgba<u8>) {
        if !(cx.is_finite() && cy.is_finite() && radius.is_finite()) {
            return;
        }
        let (mx, my) = (cx.round(), cy.round());
        let (w, h) = (self.image.width() as f32, self.image.height() as f32);
        let r = radius.ceil();
        // Only visit the part of the bounding box that lies on the surface.
        let (x0, x1) = ((mx - r).max(0.0) - mx, (mx + r).min(w - 1.0) - mx);
        let (y0, y1) = ((my - r).max(0.0) - my, (my + r).min(h - 1.0) - my);
        if x0 > x1 || y0 > y1 {
            return;
        }
        let (mx, my) = (mx as i64, my as i64);
        for dy in y0 as i64..=y1 as i64 {
            for dx in x0 as i64..=x1 as i64 {
                if (dx * dx + dy * dy) as f32 <= radius * radius {
                    self.put(mx + dx, my + dy, color);
                }
            }
        }
    }

    fn draw_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, width: u32, color: Rgba<u8>) {
        if ![x0, y0, x1, y1].iter().all(|v| v.is_finite()) {
            return;
        }
        let len = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
        // Segments far off the surface gain nothing from more samples.
        let max_steps = (self.image.width() + self.image.height()).max(1) as f32;
        let steps = len.ceil().clamp(1.0, max_steps) as u32;
        let half = width as f32 / 2.0;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let px = x0 + (x1 - x0) * t;
            let py = y0 + (y1 - y0) * t;
            if width <= 1 {
                self.put(px.round() as i64, py.round() as i64, color);
            } else {
                self.fill_circle(px, py, half, color);
            }
        }
    }
}

impl Default for Surface {
    fn default() -> Self {
        Self::new()
    }
}

/// Draw every hand's skeleton and landmark points onto `surface`.
pub fn draw(surface: &mut Surface, frame_width: u32, frame_height: u32, result: &RecognitionResult, style: &OverlayStyle) {
    surface.resize(frame_width, frame_height);
    surface.clear();

    let (w, h) = (frame_width as f32, frame_height as f32);
    for hand in result.hands() {
        for &(start, end) in HAND_CONNECTIONS.iter() {
            let (Some(a), Some(b)) = (hand.landmark(start), hand.landmark(end)) else {
                continue;
            };
            surface.draw_line(a.x * w, a.y * h, b.x * w, b.y * h, style.line_width, style.line_color);
        }

        for p in &hand.points {
            surface.fill_circle(p.x * w, p.y * h, style.point_radius as f32, style.point_color);
        }
    }
}

/// Gesture caption anchored above a hand, in percent of the container.
#[derive(Debug, Clone, PartialEq)]
pub struct HandLabel {
    pub text: String,
    /// Horizontal centre of the label.
    pub left_pct: f32,
    pub top_pct: f32,
}

fn label_for(hand: &Hand, category: &str, score: f32, mirrored: bool) -> Option<HandLabel> {
    let (min_x, min_y) = hand.min_xy()?;
    let left_pct = if mirrored { (1.0 - min_x) * 100.0 } else { min_x * 100.0 };
    let top_pct = (min_y * 100.0 - 5.0).max(0.0);
    let text = format!("{} ({}%)", category.replace('_', " "), (score * 100.0).round() as i32);
    Some(HandLabel { text, left_pct, top_pct })
}

/// Labels for every hand with at least one gesture.
pub fn hand_labels(result: &RecognitionResult, mirrored: bool) -> Vec<HandLabel> {
    result
        .hands()
        .iter()
        .enumerate()
        .filter_map(|(i, hand)| {
            let top = result.top_gesture(i)?;
            label_for(hand, &top.category_name, top.score, mirrored)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GestureClassification, HandDetection, Landmark, HAND_LANDMARKS};

    fn result_with(points: Vec<Landmark>, gestures: Vec<GestureClassification>) -> RecognitionResult {
        RecognitionResult::from_detections(vec![HandDetection { hand: Hand::new(points), gestures }], 2)
    }

    fn spread_hand() -> Vec<Landmark> {
        (0..HAND_LANDMARKS)
            .map(|i| Landmark::new(0.2 + i as f32 * 0.02, 0.3 + (i % 5) as f32 * 0.05, 0.0))
            .collect()
    }

    #[test]
    fn test_connections_cover_all_landmarks() {
        let mut seen = [false; HAND_LANDMARKS];
        for &(a, b) in HAND_CONNECTIONS.iter() {
            seen[a] = true;
            seen[b] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_label_position_mirrored() {
        let result = result_with(spread_hand(), vec![GestureClassification::new("Pointing_Up", 0.876)]);
        let labels = hand_labels(&result, true);
        assert_eq!(labels.len(), 1);
        assert!((labels[0].left_pct - 80.0).abs() < 1e-3);
        assert!((labels[0].top_pct - 25.0).abs() < 1e-3);
        assert_eq!(labels[0].text, "Pointing Up (88%)");
    }

    #[test]
    fn test_label_top_clamped_and_unmirrored() {
        let mut points = spread_hand();
        points[4].y = 0.01;
        let result = result_with(points, vec![GestureClassification::new("Thumb_Up", 0.5)]);
        let labels = hand_labels(&result, false);
        assert_eq!(labels[0].top_pct, 0.0);
        assert!((labels[0].left_pct - 20.0).abs() < 1e-3);
    }

    #[test]
    fn test_no_label_without_gestures() {
        let result = result_with(spread_hand(), vec![]);
        assert!(hand_labels(&result, true).is_empty());
    }

    #[test]
    fn test_draw_resizes_clears_and_paints() {
        let mut surface = Surface::new();
        let style = OverlayStyle::default();
        let result = result_with(spread_hand(), vec![]);
        draw(&mut surface, 100, 80, &result, &style);
        assert_eq!((surface.width(), surface.height()), (100, 80));

        // Landmark 0 at (20, 24) gets a point.
        assert_eq!(*surface.image().get_pixel(20, 24), style.point_color);

        // Drawing an empty result wipes the previous hand.
        draw(&mut surface, 100, 80, &RecognitionResult::empty(), &style);
        assert!(surface.image().pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn test_draw_is_idempotent() {
        let style = OverlayStyle::default();
        let result = result_with(spread_hand(), vec![]);
        let mut surface = Surface::new();
        draw(&mut surface, 64, 48, &result, &style);
        let first = surface.image().clone();
        draw(&mut surface, 64, 48, &result, &style);
        assert_eq!(&first, surface.image());
    }

    #[test]
    fn test_draw_survives_non_finite_and_huge_geometry() {
        let mut points = spread_hand();
        points[0] = Landmark::new(f32::NAN, 0.5, 0.0);
        points[1] = Landmark::new(f32::INFINITY, f32::NEG_INFINITY, 0.0);
        points[2] = Landmark::new(1.0e9, -1.0e9, 0.0);
        let result = result_with(points, vec![]);
        let style = OverlayStyle {
            point_radius: u32::MAX,
            ..OverlayStyle::default()
        };

        let mut surface = Surface::new();
        draw(&mut surface, 32, 24, &result, &style);
        assert_eq!((surface.width(), surface.height()), (32, 24));
        // The giant points cover the whole surface.
        assert!(surface.image().pixels().all(|p| *p == style.point_color));
    }

    #[test]
    fn test_style_from_config() {
        let style = OverlayStyle::from_config(&UiConfig::default());
        assert_eq!(style, OverlayStyle::default());
    }
}
