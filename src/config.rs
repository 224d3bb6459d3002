use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::types::landmarks::INDEX_FINGER_TIP;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub camera: CameraConfig,
    pub models: ModelConfig,
    pub interaction: InteractionConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub index: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub palm_detection_path: String,
    pub hand_landmark_path: String,
    pub gesture_classifier_path: String,
    /// Download locations used when the matching file is missing. Empty by
    /// default: no stable public host serves these exact ONNX exports, so
    /// either place the models at the paths above or fill these in.
    pub palm_detection_url: String,
    pub hand_landmark_url: String,
    pub gesture_classifier_url: String,
    pub max_hands: usize,
    pub palm_score_threshold: f32,
    pub min_hand_presence: f32,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    pub trigger_gesture: String,
    pub cooldown_ms: u64,
    pub forward_threshold: f32,
    pub fingertip: usize,
    pub mirrored: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub show_labels: bool,
    pub line_color_hex: String,
    pub point_color_hex: String,
    pub label_color_hex: String,
    pub line_width: u32,
    pub point_radius: u32,
    pub font_family: String,
    pub font_size_pt: u32,
    pub menu_scale: usize,
    pub tick_interval_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: 640,
            height: 480,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            palm_detection_path: "models/palm_detection.onnx".to_string(),
            hand_landmark_path: "models/hand_landmark.onnx".to_string(),
            gesture_classifier_path: "models/gesture_classifier.onnx".to_string(),
            palm_detection_url: String::new(),
            hand_landmark_url: String::new(),
            gesture_classifier_url: String::new(),
            max_hands: 2,
            palm_score_threshold: 0.5,
            min_hand_presence: 0.5,
            labels: [
                "None",
                "Closed_Fist",
                "Open_Palm",
                "Pointing_Up",
                "Thumb_Down",
                "Thumb_Up",
                "Victory",
                "ILoveYou",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            trigger_gesture: "Pointing_Up".to_string(),
            cooldown_ms: 400,
            forward_threshold: 0.01,
            fingertip: INDEX_FINGER_TIP,
            mirrored: true,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_labels: false,
            line_color_hex: "#FFFFFF".to_string(),
            point_color_hex: "#FFA500".to_string(),
            label_color_hex: "#00FFFF".to_string(),
            line_width: 2,
            point_radius: 4,
            font_family: "DejaVuSans".to_string(),
            font_size_pt: 18,
            menu_scale: 3,
            tick_interval_ms: 16,
        }
    }
}

impl AppConfig {
    pub const DEFAULT_PATH: &'static str = "config.json";

    /// Load from `path`, falling back to defaults for missing fields or an
    /// unparsable file. The result is written back so new fields show up.
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            match Self::from_json(&content) {
                Ok(c) => {
                    info!("Loaded configuration from {}", path.display());
                    c
                }
                Err(e) => {
                    warn!("Error parsing config: {}. Loading defaults.", e);
                    Self::default()
                }
            }
        } else {
            info!("Configuration file not found. Creating default at {}", path.display());
            Self::default()
        };

        config.save(path)?;
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str::<AppConfig>(content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

/// Parse `#RRGGBB`, falling back to red.
pub fn parse_hex(hex: &str) -> (u8, u8, u8) {
    const RED: (u8, u8, u8) = (255, 0, 0);
    if hex.len() != 7 || !hex.starts_with('#') {
        return RED;
    }
    let channel = |range| hex.get(range).and_then(|s| u8::from_str_radix(s, 16).ok());
    match (channel(1..3), channel(3..5), channel(5..7)) {
        (Some(r), Some(g), Some(b)) => (r, g, b),
        _ => RED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("#FF0000"), (255, 0, 0));
        assert_eq!(parse_hex("#FFA500"), (255, 165, 0));
        assert_eq!(parse_hex("#00FFFF"), (0, 255, 255));
        assert_eq!(parse_hex("invalid"), (255, 0, 0));
        assert_eq!(parse_hex("#GG0000"), (255, 0, 0));
    }

    #[test]
    fn test_parse_hex_non_ascii_falls_back() {
        // Seven bytes, but 'é' straddles the first channel boundary.
        assert_eq!("#0é000".len(), 7);
        assert_eq!(parse_hex("#0é000"), (255, 0, 0));
        assert_eq!(parse_hex("#00ü00"), (255, 0, 0));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = AppConfig::from_json(r#"{ "interaction": { "cooldown_ms": 250 } }"#).unwrap();
        assert_eq!(config.interaction.cooldown_ms, 250);
        assert_eq!(config.interaction.trigger_gesture, "Pointing_Up");
        assert_eq!(config.interaction.fingertip, 8);
        assert_eq!(config.camera.width, 640);
        assert_eq!(config.models.max_hands, 2);
        assert!(config.models.labels.iter().any(|l| l == "Pointing_Up"));
    }

    #[test]
    fn test_load_writes_back_defaults() {
        let dir = std::env::temp_dir().join(format!("rusty_hands_cfg_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.ui.point_radius, 4);

        let reloaded = AppConfig::from_json(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(reloaded.ui.line_color_hex, "#FFFFFF");
        let _ = fs::remove_dir_all(&dir);
    }
}
