//! Model manager: locates detector weights and caches loaded detectors

use crate::config::VisionConfig;
use crate::error::VisionError;
use crate::models::detector::Detector;
use crate::models::recorded::RecordedDetector;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Model manager for locating and loading detectors
pub struct ModelManager {
    config: Arc<VisionConfig>,
    loaded: Arc<RwLock<HashMap<PathBuf, Arc<dyn Detector>>>>,
}

impl ModelManager {
    /// Create a new model manager
    pub fn new(config: Arc<VisionConfig>) -> Self {
        Self {
            config,
            loaded: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Resolve the configured weights path.
    ///
    /// The path is used as given when it exists; a relative path is also
    /// looked up inside the model directory.
    pub fn locate_weights(&self) -> Result<PathBuf, VisionError> {
        let path = &self.config.model_path;
        if path.as_os_str().is_empty() {
            return Err(VisionError::Config("Model path must not be empty".to_string()));
        }

        if path.is_file() {
            return Ok(path.clone());
        }

        if path.is_relative() {
            let candidate = self.config.model_dir.join(path);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }

        Err(VisionError::Config(format!(
            "Model weights not found: {} (also searched {})",
            path.display(),
            self.config.model_dir.display()
        )))
    }

    /// Load the configured detector, reusing a cached instance when present
    pub fn load_detector(&self) -> Result<Arc<dyn Detector>, VisionError> {
        let path = self.locate_weights()?;

        if let Some(detector) = self.loaded.read().get(&path) {
            return Ok(Arc::clone(detector));
        }

        let detector = load_from_path(&path)?;
        info!("Loaded detector from {:?} ({} classes)", path, detector.class_names().len());
        self.loaded.write().insert(path, Arc::clone(&detector));
        Ok(detector)
    }

    /// Check if a detector for `path` is cached
    pub fn is_loaded(&self, path: &Path) -> bool {
        self.loaded.read().contains_key(path)
    }
}

fn load_from_path(path: &Path) -> Result<Arc<dyn Detector>, VisionError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(Arc::new(RecordedDetector::from_path(path)?)),
        Some(ext) if ext.eq_ignore_ascii_case("onnx") => load_onnx(path),
        _ => Err(VisionError::Model(format!(
            "No inference backend for {}; export the model to ONNX (.onnx) or provide a recorded detection fixture (.json)",
            path.display()
        ))),
    }
}

#[cfg(feature = "onnx")]
fn load_onnx(path: &Path) -> Result<Arc<dyn Detector>, VisionError> {
    Ok(Arc::new(crate::models::onnx::OnnxDetector::from_path(path)?))
}

#[cfg(not(feature = "onnx"))]
fn load_onnx(path: &Path) -> Result<Arc<dyn Detector>, VisionError> {
    Err(VisionError::Model(format!(
        "{} needs ONNX Runtime; rebuild with the `onnx` feature",
        path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FIXTURE: &str = r#"{"classes": {"0": "black rot"}, "frames": [[]]}"#;

    fn manager_for(model_path: PathBuf, model_dir: PathBuf) -> ModelManager {
        let config = VisionConfig {
            model_path,
            model_dir,
            ..VisionConfig::default()
        };
        ModelManager::new(Arc::new(config))
    }

    #[test]
    fn test_missing_weights_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager_for(PathBuf::from("best.pt"), temp_dir.path().to_path_buf());
        match manager.locate_weights() {
            Err(VisionError::Config(msg)) => assert!(msg.contains("best.pt")),
            other => panic!("Expected Config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_locate_in_model_dir() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("leaf.json"), FIXTURE).unwrap();

        let manager = manager_for(PathBuf::from("leaf.json"), temp_dir.path().to_path_buf());
        assert_eq!(manager.locate_weights().unwrap(), temp_dir.path().join("leaf.json"));
    }

    #[test]
    fn test_load_detector_caches() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("leaf.json");
        std::fs::write(&path, FIXTURE).unwrap();

        let manager = manager_for(path.clone(), temp_dir.path().to_path_buf());
        assert!(!manager.is_loaded(&path));

        let first = manager.load_detector().unwrap();
        assert!(manager.is_loaded(&path));
        let second = manager.load_detector().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.class_names().label_for(0), "black rot");
    }

    #[test]
    fn test_unsupported_weights_format() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("best.pt");
        std::fs::write(&path, b"not a fixture").unwrap();

        let manager = manager_for(path, temp_dir.path().to_path_buf());
        assert!(matches!(manager.load_detector(), Err(VisionError::Model(_))));
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn test_onnx_weights_need_runtime() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("best.onnx");
        std::fs::write(&path, b"onnx bytes").unwrap();

        let manager = manager_for(path.clone(), temp_dir.path().to_path_buf());
        match manager.load_detector() {
            Err(VisionError::Model(msg)) => assert!(msg.contains("onnx")),
            other => panic!("Expected Model error, got {:?}", other.map(|_| ())),
        }
        assert!(!manager.is_loaded(&path));
    }

    #[cfg(feature = "onnx")]
    #[test]
    fn test_corrupt_onnx_is_model_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("best.onnx");
        std::fs::write(&path, b"definitely not a protobuf graph").unwrap();

        let manager = manager_for(path, temp_dir.path().to_path_buf());
        assert!(matches!(manager.load_detector(), Err(VisionError::Model(_))));
    }
}
