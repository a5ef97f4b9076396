//! Configuration for leafscan-eye

use crate::camera::{DirectoryFrameSource, FrameSource};
use crate::error::VisionError;
use leafscan_core::LeafScanConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Vision runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    /// Camera device index (0..=3)
    pub camera_id: u32,
    /// Target frame rate for continuous capture (frames per second)
    pub frame_rate: u32,
    /// Detector weights or recorded-detection fixture
    pub model_path: PathBuf,
    /// Directory searched when `model_path` is relative and absent
    pub model_dir: PathBuf,
    /// Directory of frames replayed as the camera's stream
    pub frames_dir: Option<PathBuf>,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            camera_id: 0,
            frame_rate: 15,
            model_path: PathBuf::from("best.onnx"),
            model_dir: default_model_dir(),
            frames_dir: None,
        }
    }
}

/// `~/.leafscan/models`, or `./models` without a home directory
pub fn default_model_dir() -> PathBuf {
    dirs::home_dir()
        .map(|mut p| {
            p.push(".leafscan");
            p.push("models");
            p
        })
        .unwrap_or_else(|| PathBuf::from("./models"))
}

impl From<&LeafScanConfig> for VisionConfig {
    fn from(config: &LeafScanConfig) -> Self {
        Self {
            camera_id: config.camera.camera_index,
            frame_rate: config.detection.target_frame_rate,
            model_path: config.model.weights_path.clone(),
            frames_dir: config.camera.frames_dir.clone(),
            ..Self::default()
        }
    }
}

impl VisionConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(5..=30).contains(&self.frame_rate) {
            return Err("Frame rate must be between 5 and 30".to_string());
        }

        if self.camera_id > 3 {
            return Err("Camera ID too large (max 3)".to_string());
        }

        if self.model_path.as_os_str().is_empty() {
            return Err("Model path must not be empty".to_string());
        }

        Ok(())
    }

    /// Minimum time between the starts of two capture iterations
    pub fn frame_interval(&self) -> Duration {
        let frame_rate = self.frame_rate.max(1);
        Duration::from_secs_f64(1.0 / frame_rate as f64)
    }

    /// Frame source for the configured camera
    pub fn frame_source(&self) -> Result<Box<dyn FrameSource>, VisionError> {
        let dir = self.frames_dir.as_ref().ok_or_else(|| {
            VisionError::Config(format!("No frame directory configured for camera {}", self.camera_id))
        })?;
        Ok(Box::new(DirectoryFrameSource::new(dir).with_camera_id(self.camera_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = VisionConfig::default();
        assert_eq!(config.camera_id, 0);
        assert_eq!(config.frame_rate, 15);
        assert!(config.frames_dir.is_none());
        assert!(config.model_dir.ends_with("models"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_leafscan() {
        let mut file = LeafScanConfig::default();
        file.camera.camera_index = 2;
        file.camera.frames_dir = Some(PathBuf::from("frames"));
        file.detection.target_frame_rate = 30;
        file.model.weights_path = PathBuf::from("/opt/leaf.onnx");

        let config = VisionConfig::from(&file);
        assert_eq!(config.camera_id, 2);
        assert_eq!(config.frame_rate, 30);
        assert_eq!(config.model_path, PathBuf::from("/opt/leaf.onnx"));
        assert_eq!(config.frames_dir, Some(PathBuf::from("frames")));
    }

    #[test]
    fn test_config_validation_frame_rate() {
        let mut config = VisionConfig::default();
        config.frame_rate = 4;
        assert!(config.validate().is_err());
        config.frame_rate = 31;
        assert!(config.validate().is_err());
        config.frame_rate = 5;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_camera_id() {
        let mut config = VisionConfig::default();
        config.camera_id = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_frame_interval() {
        let mut config = VisionConfig::default();
        config.frame_rate = 20;
        assert_eq!(config.frame_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_frame_source_names_camera() {
        let config = VisionConfig {
            camera_id: 2,
            frames_dir: Some(PathBuf::from("orchard")),
            ..VisionConfig::default()
        };
        let source = config.frame_source().unwrap();
        assert!(source.describe().starts_with("camera 2"));
        assert!(source.describe().contains("orchard"));
    }

    #[test]
    fn test_frame_source_requires_directory() {
        let config = VisionConfig::default();
        assert!(matches!(config.frame_source(), Err(VisionError::Config(_))));
    }
}
