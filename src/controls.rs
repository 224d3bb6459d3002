//! The two on-screen buttons of the demo window.
//!
//! [`ControlLayout`] says where the buttons are; [`DemoControls`] holds
//! what pressing them changes. They are split so the driver can read the
//! layout while mutating the state in the same tick.

use tracing::info;

use crate::driver::EventSink;
use crate::interaction::RegionProvider;
use crate::types::{HitRegion, Rect, NO_GESTURE};

pub const COUNT_BUTTON: &str = "count";
pub const LABELS_BUTTON: &str = "labels";

/// Button geometry relative to the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlLayout {
    width: f32,
    height: f32,
}

impl ControlLayout {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width: width as f32,
            height: height as f32,
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        *self = Self::new(width, height);
    }

    pub fn count_button(&self) -> Rect {
        Rect::centered(self.width * 0.5, self.height * 0.4, self.width * 0.25, self.height * 0.12)
    }

    pub fn labels_button(&self) -> Rect {
        Rect::centered(self.width * 0.5, self.height * 0.1, self.width * 0.3, self.height * 0.08)
    }

    /// Button under a mouse position, in window pixels.
    pub fn hit(&self, x: f32, y: f32) -> Option<String> {
        self.regions().into_iter().find(|r| r.rect.contains(x, y)).map(|r| r.id)
    }
}

impl RegionProvider for ControlLayout {
    fn container(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    fn regions(&self) -> Vec<HitRegion> {
        vec![
            HitRegion::new(COUNT_BUTTON, self.count_button()),
            HitRegion::new(LABELS_BUTTON, self.labels_button()),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct DemoControls {
    count: u32,
    show_labels: bool,
    gesture: String,
}

impl DemoControls {
    pub fn new(show_labels: bool) -> Self {
        Self {
            count: 0,
            show_labels,
            gesture: NO_GESTURE.to_string(),
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn show_labels(&self) -> bool {
        self.show_labels
    }

    /// Most recent top gesture.
    pub fn gesture(&self) -> &str {
        &self.gesture
    }

    pub fn count_text(&self) -> String {
        format!("COUNT: {}", self.count)
    }

    pub fn labels_text(&self) -> String {
        format!("LABELS: {}", if self.show_labels { "ON" } else { "OFF" })
    }

    pub fn press(&mut self, region_id: &str) {
        match region_id {
            COUNT_BUTTON => {
                self.count += 1;
                info!("count -> {}", self.count);
            }
            LABELS_BUTTON => {
                self.show_labels = !self.show_labels;
                info!("{}", self.labels_text());
            }
            other => info!("press on unknown region '{}'", other),
        }
    }
}

impl EventSink for DemoControls {
    fn on_gesture_detected(&mut self, category: &str) {
        if self.gesture != category {
            self.gesture.clear();
            self.gesture.push_str(category);
        }
    }

    fn on_activate(&mut self, region_id: &str) {
        self.press(region_id);
    }
}
