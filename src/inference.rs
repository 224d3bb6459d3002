use anyhow::{anyhow, Context, Result};
use image::{imageops::FilterType, ImageBuffer, Rgb};
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use tracing::{debug, info};

use crate::config::ModelConfig;
use crate::detector::{PalmBox, PalmDetector};
use crate::pipeline::Pipeline;
use crate::types::{landmarks, GestureClassification, Hand, HandDetection, Landmark, HAND_LANDMARKS, MAX_HANDS};

const LANDMARK_INPUT: u32 = 224;
/// Palm box to hand crop expansion.
const CROP_SCALE: f32 = 2.6;
/// Crop centre shift toward the fingers, as a fraction of the palm size.
const CROP_SHIFT: f32 = 0.5;

/// Square crop of the frame handed to the landmark model, in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
struct HandCrop {
    x: f32,
    y: f32,
    size: f32,
}

/// Palm detection -> hand landmarks -> gesture classification.
pub struct HandGesturePipeline {
    detector: PalmDetector,
    landmark_session: Session,
    classifier_session: Session,
    labels: Vec<String>,
    min_hand_presence: f32,
}

fn build_session(model_path: &str) -> Result<Session> {
    if !Path::new(model_path).exists() {
        return Err(anyhow!("model not found at {}", model_path));
    }
    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(4)?
        .with_execution_providers([
            ort::execution_providers::CoreMLExecutionProvider::default().build(),
            ort::execution_providers::CPUExecutionProvider::default().build(),
        ])?
        .commit_from_file(model_path)
        .with_context(|| format!("failed to load model from {}", model_path))?;
    Ok(session)
}

impl HandGesturePipeline {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        info!("Loading palm detector from {}...", config.palm_detection_path);
        if !Path::new(&config.palm_detection_path).exists() {
            return Err(anyhow!("model not found at {}", config.palm_detection_path));
        }
        let detector = PalmDetector::new(
            &config.palm_detection_path,
            config.palm_score_threshold,
            palm_limit(config.max_hands),
        )
        .with_context(|| format!("failed to load model from {}", config.palm_detection_path))?;

        info!("Loading hand landmarks from {}...", config.hand_landmark_path);
        let landmark_session = build_session(&config.hand_landmark_path)?;

        info!("Loading gesture classifier from {}...", config.gesture_classifier_path);
        let classifier_session = build_session(&config.gesture_classifier_path)?;

        if config.labels.is_empty() {
            return Err(anyhow!("no gesture labels configured"));
        }

        Ok(Self {
            detector,
            landmark_session,
            classifier_session,
            labels: config.labels.clone(),
            min_hand_presence: config.min_hand_presence,
        })
    }

    /// Returns landmarks normalized to the full frame, or `None` if the
    /// model says there is no hand in the crop.
    fn infer_landmarks(&mut self, frame: &ImageBuffer<Rgb<u8>, Vec<u8>>, crop: HandCrop) -> Result<Option<Hand>> {
        let crop_img = square_crop(frame, crop);
        let resized = image::imageops::resize(&crop_img, LANDMARK_INPUT, LANDMARK_INPUT, FilterType::Triangle);

        let size = LANDMARK_INPUT as usize;
        let mut input_data = Vec::with_capacity(size * size * 3);
        for pixel in resized.pixels() {
            input_data.push(pixel[0] as f32 / 255.0);
            input_data.push(pixel[1] as f32 / 255.0);
            input_data.push(pixel[2] as f32 / 255.0);
        }

        let input = ort::value::Tensor::from_array((vec![1, size, size, 3], input_data))?;
        let outputs = self.landmark_session.run(ort::inputs![input])?;

        let (_shape, coords) = outputs[0].try_extract_tensor::<f32>()?;
        let presence = if outputs.len() > 1 {
            let (_shape, score) = outputs[1].try_extract_tensor::<f32>()?;
            score.first().copied().unwrap_or(0.0)
        } else {
            1.0
        };

        if presence < self.min_hand_presence {
            debug!("hand presence {:.2} below threshold", presence);
            return Ok(None);
        }
        if coords.len() < HAND_LANDMARKS * 3 {
            return Err(anyhow!("landmark model returned {} values", coords.len()));
        }

        let points = project_landmarks(coords, crop, frame.width() as f32, frame.height() as f32);
        Ok(Some(Hand::new(points)))
    }

    fn classify(&mut self, hand: &Hand) -> Result<Vec<GestureClassification>> {
        let features = landmark_features(hand);
        let input = ort::value::Tensor::from_array((vec![1, features.len()], features))?;
        let outputs = self.classifier_session.run(ort::inputs![input])?;
        let (_shape, logits) = outputs[0].try_extract_tensor::<f32>()?;

        let probs = softmax(logits);
        let mut ranked: Vec<GestureClassification> = self
            .labels
            .iter()
            .zip(probs)
            .map(|(label, score)| GestureClassification::new(label.clone(), score))
            .collect();
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        Ok(ranked)
    }
}

impl Pipeline for HandGesturePipeline {
    fn name(&self) -> String {
        "Hand Gestures (palm + landmarks + classifier)".to_string()
    }

    fn process(&mut self, frame: &ImageBuffer<Rgb<u8>, Vec<u8>>) -> Result<Vec<HandDetection>> {
        // 1. Detect palms
        let palms = self.detector.detect(frame)?;

        let mut detections = Vec::with_capacity(palms.len());
        for palm in palms {
            // 2. Landmarks on an expanded crop around the palm
            let crop = hand_crop(&palm);
            let Some(hand) = self.infer_landmarks(frame, crop)? else {
                continue;
            };

            // 3. Classify
            let gestures = self.classify(&hand)?;
            detections.push(HandDetection { hand, gestures });
        }
        Ok(detections)
    }
}

/// Palms worth running the landmark model on: the recognizer keeps at
/// most this many hands.
fn palm_limit(max_hands: usize) -> usize {
    max_hands.clamp(1, MAX_HANDS)
}

/// Square crop around a palm, expanded and shifted from the wrist toward
/// the middle finger so the whole hand fits.
fn hand_crop(palm: &PalmBox) -> HandCrop {
    let palm_size = palm.rect.width().max(palm.rect.height());
    let size = (palm_size * CROP_SCALE).max(1.0);

    let (dx, dy) = (palm.middle_mcp.0 - palm.wrist.0, palm.middle_mcp.1 - palm.wrist.1);
    let len = (dx * dx + dy * dy).sqrt();
    let (ux, uy) = if len > f32::EPSILON { (dx / len, dy / len) } else { (0.0, -1.0) };

    let cx = (palm.rect.left + palm.rect.right) / 2.0 + ux * palm_size * CROP_SHIFT;
    let cy = (palm.rect.top + palm.rect.bottom) / 2.0 + uy * palm_size * CROP_SHIFT;

    // May extend past the frame; square_crop pads with black.
    HandCrop {
        x: cx - size / 2.0,
        y: cy - size / 2.0,
        size,
    }
}

/// Copy a square region of the frame, padding outside pixels with black.
fn square_crop(frame: &ImageBuffer<Rgb<u8>, Vec<u8>>, crop: HandCrop) -> ImageBuffer<Rgb<u8>, Vec<u8>> {
    let size = crop.size.round().max(1.0) as u32;
    let ox = crop.x.round() as i64;
    let oy = crop.y.round() as i64;
    let (fw, fh) = (frame.width() as i64, frame.height() as i64);

    ImageBuffer::from_fn(size, size, |x, y| {
        let sx = ox + x as i64;
        let sy = oy + y as i64;
        if sx >= 0 && sy >= 0 && sx < fw && sy < fh {
            *frame.get_pixel(sx as u32, sy as u32)
        } else {
            Rgb([0, 0, 0])
        }
    })
}

/// Crop pixels (0..224) -> full frame, normalized. z shares x's scale.
fn project_landmarks(coords: &[f32], crop: HandCrop, frame_w: f32, frame_h: f32) -> Vec<Landmark> {
    let scale = crop.size / LANDMARK_INPUT as f32;
    (0..HAND_LANDMARKS)
        .map(|i| {
            let mx = coords[i * 3];
            let my = coords[i * 3 + 1];
            let mz = coords[i * 3 + 2];
            Landmark {
                x: (crop.x + mx * scale) / frame_w,
                y: (crop.y + my * scale) / frame_h,
                z: mz * scale / frame_w,
            }
        })
        .collect()
}

/// Wrist-relative landmarks scaled so the largest extent is 1.
fn landmark_features(hand: &Hand) -> Vec<f32> {
    let wrist = hand.points.get(landmarks::WRIST).copied().unwrap_or_default();
    let rel: Vec<Landmark> = hand
        .points
        .iter()
        .map(|p| Landmark::new(p.x - wrist.x, p.y - wrist.y, p.z - wrist.z))
        .collect();
    let extent = rel
        .iter()
        .flat_map(|p| [p.x.abs(), p.y.abs()])
        .fold(0.0f32, f32::max)
        .max(f32::EPSILON);

    rel.iter().flat_map(|p| [p.x / extent, p.y / extent, p.z / extent]).collect()
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum <= 0.0 {
        return vec![0.0; logits.len()];
    }
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rect;

    #[test]
    fn test_palm_limit_matches_recognizer_cap() {
        assert_eq!(palm_limit(0), 1);
        assert_eq!(palm_limit(1), 1);
        assert_eq!(palm_limit(2), 2);
        assert_eq!(palm_limit(5), MAX_HANDS);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_project_landmarks_into_frame() {
        let crop = HandCrop { x: 100.0, y: 50.0, size: 224.0 };
        let mut coords = vec![0.0; HAND_LANDMARKS * 3];
        coords[0] = 112.0;
        coords[1] = 112.0;
        coords[2] = -32.0;
        let points = project_landmarks(&coords, crop, 640.0, 480.0);
        assert_eq!(points.len(), HAND_LANDMARKS);
        assert!((points[0].x - 212.0 / 640.0).abs() < 1e-6);
        assert!((points[0].y - 162.0 / 480.0).abs() < 1e-6);
        assert!((points[0].z - (-32.0 / 640.0)).abs() < 1e-6);
    }

    #[test]
    fn test_hand_crop_shifts_toward_fingers() {
        let palm = PalmBox {
            rect: Rect::from_xywh(100.0, 100.0, 50.0, 50.0),
            score: 0.9,
            wrist: (125.0, 150.0),
            middle_mcp: (125.0, 100.0),
        };
        let crop = hand_crop(&palm);
        assert!((crop.size - 130.0).abs() < 1e-4);
        let centre_y = crop.y + crop.size / 2.0;
        assert!(centre_y < 125.0);
        assert!((crop.x + crop.size / 2.0 - 125.0).abs() < 1e-4);
    }

    #[test]
    fn test_square_crop_pads_outside_frame() {
        let frame = ImageBuffer::from_pixel(4, 4, Rgb([200, 100, 50]));
        let crop = square_crop(&frame, HandCrop { x: -2.0, y: -2.0, size: 4.0 });
        assert_eq!(*crop.get_pixel(0, 0), Rgb([0, 0, 0]));
        assert_eq!(*crop.get_pixel(3, 3), Rgb([200, 100, 50]));
    }

    #[test]
    fn test_features_are_wrist_relative() {
        let mut points = vec![Landmark::new(0.5, 0.5, 0.0); HAND_LANDMARKS];
        points[landmarks::INDEX_FINGER_TIP] = Landmark::new(0.5, 0.3, -0.1);
        let features = landmark_features(&Hand::new(points));
        assert_eq!(features.len(), HAND_LANDMARKS * 3);
        assert_eq!(&features[0..3], &[0.0, 0.0, 0.0]);
        let tip = landmarks::INDEX_FINGER_TIP * 3;
        assert!((features[tip + 1] + 1.0).abs() < 1e-5);
    }
}
