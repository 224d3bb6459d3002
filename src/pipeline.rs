use anyhow::Result;

use crate::types::{landmarks, Frame, GestureClassification, Hand, HandDetection, Landmark, HAND_LANDMARKS};

/// An inference engine that turns a frame into per-hand detections.
///
/// Engines know nothing about video-mode timestamps or hand limits; the
/// recognizer adapter enforces those.
pub trait Pipeline {
    fn name(&self) -> String;
    fn process(&mut self, frame: &Frame) -> Result<Vec<HandDetection>>;
}

impl<P: Pipeline + ?Sized> Pipeline for Box<P> {
    fn name(&self) -> String {
        (**self).name()
    }

    fn process(&mut self, frame: &Frame) -> Result<Vec<HandDetection>> {
        (**self).process(frame)
    }
}

/// Simulated engine for running without ONNX models.
///
/// Reports one "Pointing_Up" hand centred in the frame whose index
/// fingertip slowly drifts back and then pushes toward the camera, so
/// presses fire without a real hand.
pub struct DummyPipeline {
    frame_count: u32,
}

impl DummyPipeline {
    pub fn new() -> Self {
        Self { frame_count: 0 }
    }

    /// Depth of the simulated fingertip for a given frame number.
    /// 60 frames of slow retreat followed by 10 frames of fast push.
    pub fn fingertip_depth(frame_count: u32) -> f32 {
        let phase = frame_count % 70;
        if phase < 60 {
            -0.05 + phase as f32 * 0.001
        } else {
            0.01 - (phase - 60) as f32 * 0.015
        }
    }
}

impl Default for DummyPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline for DummyPipeline {
    fn name(&self) -> String {
        "Simulated Hand".to_string()
    }

    fn process(&mut self, _frame: &Frame) -> Result<Vec<HandDetection>> {
        self.frame_count += 1;

        // Upright hand with the fingertip over the upper middle of the
        // frame. x is in camera space, so 0.5 stays centred when mirrored.
        let t = (self.frame_count as f32) * 0.03;
        let sway = t.sin() * 0.01;
        let mut points = Vec::with_capacity(HAND_LANDMARKS);
        for i in 0..HAND_LANDMARKS {
            let (finger, joint) = if i == 0 { (2, 0) } else { ((i - 1) / 4, (i - 1) % 4 + 1) };
            let x = 0.5 + (finger as f32 - 2.0) * 0.03 + sway;
            let y = 0.75 - joint as f32 * 0.03;
            points.push(Landmark::new(x, y, 0.0));
        }

        // Raise the index finger above the other fingers.
        for (k, idx) in (landmarks::INDEX_FINGER_MCP..=landmarks::INDEX_FINGER_TIP).enumerate() {
            points[idx].x = 0.5 + sway;
            points[idx].y = 0.62 - k as f32 * 0.07;
        }
        points[landmarks::INDEX_FINGER_TIP].z = Self::fingertip_depth(self.frame_count);

        Ok(vec![HandDetection {
            hand: Hand::new(points),
            gestures: vec![
                GestureClassification::new("Pointing_Up", 0.92),
                GestureClassification::new("None", 0.05),
                GestureClassification::new("Victory", 0.03),
            ],
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dummy_reports_full_hand() {
        let mut pipeline = DummyPipeline::new();
        let frame = Frame::new(640, 480);
        let detections = pipeline.process(&frame).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].hand.points.len(), HAND_LANDMARKS);
        assert_eq!(detections[0].gestures[0].category_name, "Pointing_Up");
        for p in &detections[0].hand.points {
            assert!((0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.y));
        }
    }

    #[test]
    fn test_dummy_depth_pushes_forward() {
        // During the push phase depth decreases by more than the press threshold.
        let before = DummyPipeline::fingertip_depth(61);
        let after = DummyPipeline::fingertip_depth(62);
        assert!(before - after > 0.01);
        // During the retreat phase it never looks like a press.
        let slow_a = DummyPipeline::fingertip_depth(10);
        let slow_b = DummyPipeline::fingertip_depth(11);
        assert!(slow_a - slow_b < 0.01);
    }
}
