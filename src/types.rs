use image::{ImageBuffer, Rgb};

/// A decoded camera frame. Lives for a single tick.
pub type Frame = ImageBuffer<Rgb<u8>, Vec<u8>>;

/// Number of landmarks in a hand skeleton.
pub const HAND_LANDMARKS: usize = 21;

/// Upper bound on simultaneously tracked hands.
pub const MAX_HANDS: usize = 2;

/// Category reported when nothing is detected.
pub const NO_GESTURE: &str = "None";

/// Hand landmark indices (MediaPipe hand landmark model convention)
#[allow(dead_code)]
pub mod landmarks {
    pub const WRIST: usize = 0;
    pub const THUMB_CMC: usize = 1;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_FINGER_MCP: usize = 5;
    pub const INDEX_FINGER_PIP: usize = 6;
    pub const INDEX_FINGER_DIP: usize = 7;
    pub const INDEX_FINGER_TIP: usize = 8;
    pub const MIDDLE_FINGER_MCP: usize = 9;
    pub const MIDDLE_FINGER_PIP: usize = 10;
    pub const MIDDLE_FINGER_DIP: usize = 11;
    pub const MIDDLE_FINGER_TIP: usize = 12;
    pub const RING_FINGER_MCP: usize = 13;
    pub const RING_FINGER_PIP: usize = 14;
    pub const RING_FINGER_DIP: usize = 15;
    pub const RING_FINGER_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_DIP: usize = 19;
    pub const PINKY_TIP: usize = 20;
}

/// Normalized 3D point. `x`/`y` are fractions of the frame size, `z` is
/// relative depth (more negative = closer to the camera).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// One detected hand in anatomical landmark order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hand {
    pub points: Vec<Landmark>,
}

impl Hand {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    pub fn landmark(&self, index: usize) -> Option<&Landmark> {
        self.points.get(index)
    }

    /// Smallest x and y over all landmarks, or `None` for an empty hand.
    pub fn min_xy(&self) -> Option<(f32, f32)> {
        if self.points.is_empty() {
            return None;
        }
        let min_x = self.points.iter().map(|p| p.x).fold(f32::INFINITY, f32::min);
        let min_y = self.points.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
        Some((min_x, min_y))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GestureClassification {
    pub category_name: String,
    pub score: f32,
}

impl GestureClassification {
    pub fn new(category_name: impl Into<String>, score: f32) -> Self {
        Self {
            category_name: category_name.into(),
            score,
        }
    }
}

/// What an engine reports for a single hand before the adapter assembles
/// the per-frame result.
#[derive(Debug, Clone, PartialEq)]
pub struct HandDetection {
    pub hand: Hand,
    pub gestures: Vec<GestureClassification>,
}

/// Per-frame recognition output. `hands[i]` pairs with `gestures[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecognitionResult {
    hands: Vec<Hand>,
    gestures: Vec<Vec<GestureClassification>>,
}

impl RecognitionResult {
    /// Builds a result from engine detections, keeping at most `max_hands`
    /// in engine order. Each gesture list is ranked highest score first.
    pub fn from_detections(detections: Vec<HandDetection>, max_hands: usize) -> Self {
        let limit = max_hands.min(MAX_HANDS);
        let mut hands = Vec::with_capacity(limit);
        let mut gestures = Vec::with_capacity(limit);
        for mut det in detections.into_iter().take(limit) {
            det.gestures
                .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
            hands.push(det.hand);
            gestures.push(det.gestures);
        }
        Self { hands, gestures }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn hands(&self) -> &[Hand] {
        &self.hands
    }

    pub fn gestures(&self) -> &[Vec<GestureClassification>] {
        &self.gestures
    }

    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }

    /// Highest ranked gesture for the given hand.
    pub fn top_gesture(&self, hand_index: usize) -> Option<&GestureClassification> {
        self.gestures.get(hand_index).and_then(|g| g.first())
    }

    /// Category reported to listeners each tick.
    pub fn top_category(&self) -> &str {
        self.top_gesture(0)
            .map(|g| g.category_name.as_str())
            .unwrap_or(NO_GESTURE)
    }
}

/// Screen-space rectangle. Containment is inclusive on every edge.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self { left, top, right, bottom }
    }

    pub fn from_xywh(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Rectangle of the given size centred on `(cx, cy)`.
    pub fn centered(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self::from_xywh(cx - width / 2.0, cy - height / 2.0, width, height)
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }
}

/// A clickable target registered by the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct HitRegion {
    pub id: String,
    pub rect: Rect,
}

impl HitRegion {
    pub fn new(id: impl Into<String>, rect: Rect) -> Self {
        Self { id: id.into(), rect }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand_at(x: f32, y: f32) -> Hand {
        Hand::new(vec![Landmark::new(x, y, 0.0); HAND_LANDMARKS])
    }

    #[test]
    fn test_result_ranks_and_caps_hands() {
        let detections = (0..3)
            .map(|i| HandDetection {
                hand: hand_at(0.1 * i as f32, 0.5),
                gestures: vec![
                    GestureClassification::new("Open_Palm", 0.2),
                    GestureClassification::new("Pointing_Up", 0.7),
                ],
            })
            .collect();

        let result = RecognitionResult::from_detections(detections, 2);
        assert_eq!(result.hands().len(), 2);
        assert_eq!(result.gestures().len(), 2);
        assert_eq!(result.top_category(), "Pointing_Up");
        assert_eq!(result.hands()[1].points[0].x, 0.1);
    }

    #[test]
    fn test_empty_result_reports_none() {
        let result = RecognitionResult::empty();
        assert!(result.is_empty());
        assert_eq!(result.top_category(), NO_GESTURE);
        assert!(result.top_gesture(0).is_none());
    }

    #[test]
    fn test_rect_containment_is_inclusive() {
        let rect = Rect::new(10.0, 20.0, 30.0, 40.0);
        assert!(rect.contains(10.0, 20.0));
        assert!(rect.contains(30.0, 40.0));
        assert!(!rect.contains(30.1, 25.0));
        assert!(!rect.contains(15.0, 19.9));
        assert_eq!(Rect::centered(50.0, 50.0, 20.0, 10.0), Rect::new(40.0, 45.0, 60.0, 55.0));
    }

    #[test]
    fn test_min_xy() {
        let mut hand = hand_at(0.5, 0.5);
        hand.points[3] = Landmark::new(0.2, 0.6, 0.0);
        hand.points[7] = Landmark::new(0.4, 0.3, 0.0);
        assert_eq!(hand.min_xy(), Some((0.2, 0.3)));
        assert_eq!(Hand::default().min_xy(), None);
    }
}
