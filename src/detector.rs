use anyhow::{anyhow, Result};
use image::{imageops::FilterType, ImageBuffer, Rgb};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;

use crate::types::Rect;

const INPUT_SIZE: u32 = 192;
const REGRESSOR_STRIDE: usize = 18;

/// A palm found by the detector, in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PalmBox {
    pub rect: Rect,
    pub score: f32,
    /// Wrist keypoint.
    pub wrist: (f32, f32),
    /// Middle finger base keypoint.
    pub middle_mcp: (f32, f32),
}

pub struct PalmDetector {
    session: Session,
    anchors: Vec<(f32, f32)>, // cx, cy (normalized)
    score_threshold: f32,
    max_palms: usize,
}

impl PalmDetector {
    pub fn new(model_path: &str, score_threshold: f32, max_palms: usize) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .with_execution_providers([
                ort::execution_providers::CoreMLExecutionProvider::default().build(),
                ort::execution_providers::CPUExecutionProvider::default().build(),
            ])?
            .commit_from_file(model_path)?;

        Ok(Self {
            session,
            anchors: generate_anchors(INPUT_SIZE as usize),
            score_threshold,
            max_palms,
        })
    }

    pub fn detect(&mut self, frame: &ImageBuffer<Rgb<u8>, Vec<u8>>) -> Result<Vec<PalmBox>> {
        // NHWC [1, 192, 192, 3], values in [0, 1]
        let resized = image::imageops::resize(frame, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
        let size = INPUT_SIZE as usize;
        let mut input_data = Vec::with_capacity(size * size * 3);
        for pixel in resized.pixels() {
            input_data.push(pixel[0] as f32 / 255.0);
            input_data.push(pixel[1] as f32 / 255.0);
            input_data.push(pixel[2] as f32 / 255.0);
        }

        let input_tensor = Tensor::from_array((vec![1, size, size, 3], input_data))?;
        let outputs = self.session.run(ort::inputs![input_tensor])?;

        let (_boxes_shape, boxes_data) = outputs[0].try_extract_tensor::<f32>()?;
        let (_scores_shape, scores_data) = outputs[1].try_extract_tensor::<f32>()?;

        if boxes_data.len() < self.anchors.len() * REGRESSOR_STRIDE || scores_data.len() < self.anchors.len() {
            return Err(anyhow!(
                "palm detector output too small: {} boxes, {} scores",
                boxes_data.len(),
                scores_data.len()
            ));
        }

        let palms = decode_palms(&self.anchors, scores_data, boxes_data, self.score_threshold);
        let kept = suppress_overlaps(palms, 0.3, self.max_palms);

        // Back to frame pixels
        let sx = frame.width() as f32;
        let sy = frame.height() as f32;
        Ok(kept
            .into_iter()
            .map(|p| PalmBox {
                rect: Rect::new(p.rect.left * sx, p.rect.top * sy, p.rect.right * sx, p.rect.bottom * sy),
                score: p.score,
                wrist: (p.wrist.0 * sx, p.wrist.1 * sy),
                middle_mcp: (p.middle_mcp.0 * sx, p.middle_mcp.1 * sy),
            })
            .collect())
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x.clamp(-100.0, 100.0)).exp())
}

/// Decode raw SSD outputs into normalized palm boxes above `threshold`.
fn decode_palms(anchors: &[(f32, f32)], scores_raw: &[f32], boxes_raw: &[f32], threshold: f32) -> Vec<PalmBox> {
    let scale = INPUT_SIZE as f32;
    let mut palms = Vec::new();

    for (i, &(ax, ay)) in anchors.iter().enumerate() {
        let score = sigmoid(scores_raw[i]);
        if score < threshold {
            continue;
        }

        let reg = &boxes_raw[i * REGRESSOR_STRIDE..(i + 1) * REGRESSOR_STRIDE];
        let cx = reg[0] / scale + ax;
        let cy = reg[1] / scale + ay;
        let w = reg[2] / scale;
        let h = reg[3] / scale;

        palms.push(PalmBox {
            rect: Rect::centered(cx, cy, w, h),
            score,
            wrist: (reg[4] / scale + ax, reg[5] / scale + ay),
            middle_mcp: (reg[8] / scale + ax, reg[9] / scale + ay),
        });
    }
    palms
}

fn iou(a: &Rect, b: &Rect) -> f32 {
    let w = (a.right.min(b.right) - a.left.max(b.left)).max(0.0);
    let h = (a.bottom.min(b.bottom) - a.top.max(b.top)).max(0.0);
    let inter = w * h;
    let union = a.width() * a.height() + b.width() * b.height() - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

/// Greedy suppression: best score first, drop anything overlapping a kept box.
fn suppress_overlaps(mut palms: Vec<PalmBox>, iou_threshold: f32, limit: usize) -> Vec<PalmBox> {
    palms.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    let mut kept: Vec<PalmBox> = Vec::new();
    for palm in palms {
        if kept.len() >= limit {
            break;
        }
        if kept.iter().all(|k| iou(&k.rect, &palm.rect) < iou_threshold) {
            kept.push(palm);
        }
    }
    kept
}

fn generate_anchors(input_size: usize) -> Vec<(f32, f32)> {
    // MediaPipe palm detection SSD config, two anchors per cell per layer
    let strides = [8, 16, 16, 16];
    let mut anchors = Vec::new();

    let mut layer = 0;
    while layer < strides.len() {
        // Consecutive layers with the same stride share a feature map.
        let stride = strides[layer];
        let mut repeats = 0;
        while layer < strides.len() && strides[layer] == stride {
            repeats += 2;
            layer += 1;
        }

        let feature = (input_size as f32 / stride as f32).ceil() as usize;
        for y in 0..feature {
            for x in 0..feature {
                let cx = (x as f32 + 0.5) / feature as f32;
                let cy = (y as f32 + 0.5) / feature as f32;
                for _ in 0..repeats {
                    anchors.push((cx, cy));
                }
            }
        }
    }
    anchors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_count_matches_model() {
        // 24*24*2 + 12*12*6
        assert_eq!(generate_anchors(192).len(), 2016);
    }

    #[test]
    fn test_decode_skips_low_scores() {
        let anchors = vec![(0.5, 0.5), (0.25, 0.25)];
        let scores = vec![-5.0, 5.0];
        let mut boxes = vec![0.0; 2 * REGRESSOR_STRIDE];
        boxes[REGRESSOR_STRIDE + 2] = 48.0; // w = 0.25
        boxes[REGRESSOR_STRIDE + 3] = 48.0;

        let palms = decode_palms(&anchors, &scores, &boxes, 0.5);
        assert_eq!(palms.len(), 1);
        let p = palms[0];
        assert!((p.rect.left - 0.125).abs() < 1e-6);
        assert!((p.rect.right - 0.375).abs() < 1e-6);
        assert!(p.score > 0.99);
    }

    #[test]
    fn test_suppression_keeps_best_distinct_palms() {
        let make = |x: f32, score: f32| PalmBox {
            rect: Rect::from_xywh(x, 0.0, 0.2, 0.2),
            score,
            wrist: (0.0, 0.0),
            middle_mcp: (0.0, 0.0),
        };
        let palms = vec![make(0.0, 0.7), make(0.01, 0.9), make(0.6, 0.8), make(0.3, 0.6)];
        let kept = suppress_overlaps(palms, 0.3, 2);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].score, 0.9);
        assert_eq!(kept[1].score, 0.8);
    }
}
