//! Configuration for LeafScan sessions

use crate::debounce::DEFAULT_DEBOUNCE_WINDOW;
use crate::error::{Error, Result};
use crate::history::DEFAULT_HISTORY_CAPACITY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Model input sizes accepted by the detector
pub const INPUT_SIZES: [u32; 6] = [320, 416, 512, 640, 768, 1024];

/// RGB triple
pub type Rgb = [u8; 3];

/// Named box colors offered by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoxColor {
    ForestGreen,
    Gold,
    White,
    Red,
}

impl BoxColor {
    pub fn rgb(&self) -> Rgb {
        match self {
            BoxColor::ForestGreen => [45, 106, 79],
            BoxColor::Gold => [201, 168, 80],
            BoxColor::White => [230, 237, 240],
            BoxColor::Red => [210, 64, 46],
        }
    }
}

impl FromStr for BoxColor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace([' ', '_'], "-").as_str() {
            "forest-green" | "green" => Ok(BoxColor::ForestGreen),
            "gold" => Ok(BoxColor::Gold),
            "white" => Ok(BoxColor::White),
            "red" => Ok(BoxColor::Red),
            other => Err(Error::Configuration(format!(
                "unknown box color '{}' (expected forest-green, gold, white or red)",
                other
            ))),
        }
    }
}

/// Inference and display settings for one detection request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    /// Minimum detector confidence, 0.10..=0.95
    pub confidence_threshold: f32,
    /// IoU threshold for non-maximum suppression, 0.10..=0.90
    pub iou_threshold: f32,
    /// Square model input size, one of [`INPUT_SIZES`]
    pub input_size: u32,
    pub show_labels: bool,
    pub show_confidence: bool,
    pub box_color: Rgb,
    /// Box outline thickness in pixels, 1..=10
    pub line_thickness: u32,
    /// Continuous-capture rate cap, 5..=30
    pub target_frame_rate: u32,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.40,
            iou_threshold: 0.50,
            input_size: 640,
            show_labels: true,
            show_confidence: true,
            box_color: BoxColor::ForestGreen.rgb(),
            line_thickness: 2,
            target_frame_rate: 15,
        }
    }
}

impl DetectionSettings {
    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(0.10..=0.95).contains(&self.confidence_threshold) {
            return Err(format!(
                "Confidence threshold must be between 0.10 and 0.95, got {}",
                self.confidence_threshold
            ));
        }

        if !(0.10..=0.90).contains(&self.iou_threshold) {
            return Err(format!(
                "IoU threshold must be between 0.10 and 0.90, got {}",
                self.iou_threshold
            ));
        }

        if !INPUT_SIZES.contains(&self.input_size) {
            return Err(format!(
                "Input size must be one of {:?}, got {}",
                INPUT_SIZES, self.input_size
            ));
        }

        if self.line_thickness == 0 || self.line_thickness > 10 {
            return Err("Line thickness must be between 1 and 10".to_string());
        }

        if !(5..=30).contains(&self.target_frame_rate) {
            return Err(format!(
                "Target frame rate must be between 5 and 30, got {}",
                self.target_frame_rate
            ));
        }

        Ok(())
    }
}

/// Detector weights location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub weights_path: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            weights_path: PathBuf::from("best.onnx"),
        }
    }
}

/// Camera selection for continuous capture
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Device index, 0..=3
    pub camera_index: u32,
    /// Directory of frames replayed in place of a live device
    pub frames_dir: Option<PathBuf>,
}

/// Session history settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
    /// Quiet period per disease during continuous capture
    pub debounce_secs: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_HISTORY_CAPACITY,
            debounce_secs: DEFAULT_DEBOUNCE_WINDOW.as_secs(),
        }
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeafScanConfig {
    pub detection: DetectionSettings,
    pub model: ModelConfig,
    pub camera: CameraConfig,
    pub history: HistoryConfig,
}

impl LeafScanConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: LeafScanConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read config {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        self.detection.validate().map_err(Error::Configuration)?;

        if self.camera.camera_index > 3 {
            return Err(Error::Configuration("Camera index must be between 0 and 3".to_string()));
        }

        if self.history.capacity == 0 {
            return Err(Error::Configuration("History capacity must be at least 1".to_string()));
        }

        Ok(())
    }
}
