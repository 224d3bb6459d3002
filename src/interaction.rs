//! Virtual button presses from forward fingertip motion.
//!
//! While the trigger gesture is held over a hit region, the detector
//! tracks the fingertip depth between ticks. A drop in depth larger than
//! the forward threshold (the finger moved toward the camera) is a press.
//! Presses are rate limited by a global cooldown.

use tracing::{debug, trace};

use crate::config::InteractionConfig;
use crate::types::{HitRegion, RecognitionResult, Rect};

/// Supplies the container geometry and clickable regions, read every tick.
///
/// Regions are returned in registration order. When regions overlap the
/// first registered one wins.
pub trait RegionProvider {
    fn container(&self) -> Rect;
    fn regions(&self) -> Vec<HitRegion>;
}

/// A detected press.
#[derive(Debug, Clone, PartialEq)]
pub struct Activation {
    pub region_id: String,
    pub timestamp_ms: u64,
    /// How far the fingertip moved toward the camera since the last tick.
    pub depth_delta: f32,
}

pub struct InteractionDetector {
    config: InteractionConfig,
    previous_depth: Option<f32>,
    last_fire_ms: Option<u64>,
}

/// Map a normalized camera-space point into container (screen) space.
pub fn to_screen(x: f32, y: f32, container: &Rect, mirrored: bool) -> (f32, f32) {
    let nx = if mirrored { 1.0 - x } else { x };
    (nx * container.width() + container.left, y * container.height() + container.top)
}

impl InteractionDetector {
    pub fn new(config: InteractionConfig) -> Self {
        Self {
            config,
            previous_depth: None,
            last_fire_ms: None,
        }
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn previous_depth(&self) -> Option<f32> {
        self.previous_depth
    }

    pub fn last_fire_ms(&self) -> Option<u64> {
        self.last_fire_ms
    }

    fn in_cooldown(&self, now_ms: u64) -> bool {
        self.last_fire_ms
            .is_some_and(|last| now_ms.saturating_sub(last) < self.config.cooldown_ms)
    }

    /// Fingertip depth and the first region under it, when the trigger
    /// gesture is held. `None` means the baseline must be dropped.
    fn hovered<'r>(&self, result: &RecognitionResult, container: &Rect, regions: &'r [HitRegion]) -> Option<(&'r HitRegion, f32)> {
        let top = result.top_gesture(0)?;
        if top.category_name != self.config.trigger_gesture {
            return None;
        }

        let tip = result.hands().first()?.landmark(self.config.fingertip)?;
        let (sx, sy) = to_screen(tip.x, tip.y, container, self.config.mirrored);
        trace!(sx, sy, z = tip.z, "fingertip");

        let region = regions.iter().find(|r| r.rect.contains(sx, sy))?;
        Some((region, tip.z))
    }

    /// Advance one tick. Returns the press, if one fired.
    ///
    /// Resets for a lost gesture or leaving every region apply even during
    /// the cooldown, so a stale baseline never survives into the next
    /// window. During the cooldown nothing fires and the baseline is left
    /// untouched.
    pub fn update(&mut self, result: &RecognitionResult, container: &Rect, regions: &[HitRegion], now_ms: u64) -> Option<Activation> {
        let Some((region, depth)) = self.hovered(result, container, regions) else {
            self.previous_depth = None;
            return None;
        };

        if self.in_cooldown(now_ms) {
            return None;
        }

        let Some(previous) = self.previous_depth.replace(depth) else {
            trace!(region = %region.id, depth, "baseline");
            return None;
        };

        let delta = previous - depth;
        if delta > self.config.forward_threshold {
            self.last_fire_ms = Some(now_ms);
            debug!(region = %region.id, delta, "press");
            return Some(Activation {
                region_id: region.id.clone(),
                timestamp_ms: now_ms,
                depth_delta: delta,
            });
        }
        None
    }
}
