//! Detector that replays recorded inference output
//!
//! Fixtures hold a class map and one list of boxes per frame:
//!
//! ```json
//! {
//!   "classes": { "0": "Apple Scab", "1": "black rot" },
//!   "frames": [[{ "class_id": 1, "confidence": 0.92, "box": [10, 10, 100, 100] }]]
//! }
//! ```
//!
//! Each `predict` call consumes the next frame, wrapping around at the end.

use crate::error::VisionError;
use crate::models::detector::{apply_nms, Detector, InferenceParams};
use image::RgbImage;
use leafscan_core::{BoundingBox, ClassNames, RawDetection};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// One recorded box, `box` is `[x1, y1, x2, y2]` in pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedBox {
    pub class_id: usize,
    pub confidence: f32,
    #[serde(rename = "box")]
    pub bbox: [f32; 4],
}

/// On-disk fixture format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionFixture {
    #[serde(default)]
    pub classes: ClassNames,
    #[serde(default)]
    pub frames: Vec<Vec<RecordedBox>>,
}

pub struct RecordedDetector {
    fixture: DetectionFixture,
    cursor: Mutex<usize>,
}

impl RecordedDetector {
    /// Create a detector from an in-memory fixture
    pub fn new(fixture: DetectionFixture) -> Self {
        Self {
            fixture,
            cursor: Mutex::new(0),
        }
    }

    /// Parse a JSON fixture
    pub fn from_json(json: &str) -> Result<Self, VisionError> {
        let fixture: DetectionFixture = serde_json::from_str(json)
            .map_err(|e| VisionError::Model(format!("Invalid detection fixture: {}", e)))?;
        Ok(Self::new(fixture))
    }

    /// Load a JSON fixture from disk
    pub fn from_path(path: &Path) -> Result<Self, VisionError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn frame_count(&self) -> usize {
        self.fixture.frames.len()
    }

    fn next_frame(&self) -> &[RecordedBox] {
        if self.fixture.frames.is_empty() {
            return &[];
        }
        let mut cursor = self.cursor.lock();
        let index = *cursor % self.fixture.frames.len();
        *cursor = cursor.wrapping_add(1);
        &self.fixture.frames[index]
    }
}

impl Detector for RecordedDetector {
    fn predict(&self, image: &RgbImage, params: &InferenceParams) -> Result<Vec<RawDetection>, VisionError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(VisionError::Processing("Cannot run inference on an empty image".to_string()));
        }

        let candidates: Vec<RawDetection> = self
            .next_frame()
            .iter()
            .filter(|b| b.confidence >= params.confidence_threshold)
            .map(|b| {
                let [x1, y1, x2, y2] = b.bbox;
                RawDetection::new(
                    b.class_id,
                    self.fixture.classes.label_for(b.class_id),
                    b.confidence,
                    BoundingBox::new(x1, y1, x2, y2),
                )
            })
            .collect();

        let detections = apply_nms(candidates, params.iou_threshold);
        debug!(
            "Recorded detector returned {} boxes at conf >= {:.2}",
            detections.len(),
            params.confidence_threshold
        );
        Ok(detections)
    }

    fn class_names(&self) -> &ClassNames {
        &self.fixture.classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "classes": {"0": "Apple Scab", "1": "black rot"},
        "frames": [
            [{"class_id": 1, "confidence": 0.92, "box": [10, 10, 100, 100]},
             {"class_id": 0, "confidence": 0.20, "box": [120, 120, 180, 180]}],
            [],
            [{"class_id": 5, "confidence": 0.55, "box": [0, 0, 20, 20]}]
        ]
    }"#;

    fn params() -> InferenceParams {
        InferenceParams {
            confidence_threshold: 0.40,
            iou_threshold: 0.50,
            input_size: 640,
        }
    }

    #[test]
    fn test_predict_filters_by_confidence() {
        let detector = RecordedDetector::from_json(FIXTURE).unwrap();
        let image = RgbImage::new(200, 200);
        let detections = detector.predict(&image, &params()).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class_label, "black rot");
        assert_eq!(detections[0].confidence, 0.92);
    }

    #[test]
    fn test_predict_cycles_frames() {
        let detector = RecordedDetector::from_json(FIXTURE).unwrap();
        let image = RgbImage::new(64, 64);
        assert_eq!(detector.predict(&image, &params()).unwrap().len(), 1);
        assert!(detector.predict(&image, &params()).unwrap().is_empty());

        let third = detector.predict(&image, &params()).unwrap();
        // Unmapped class ids are named by their number.
        assert_eq!(third[0].class_label, "5");

        assert_eq!(detector.predict(&image, &params()).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_fixture_yields_nothing() {
        let detector = RecordedDetector::new(DetectionFixture::default());
        let image = RgbImage::new(8, 8);
        assert!(detector.predict(&image, &params()).unwrap().is_empty());
    }

    #[test]
    fn test_empty_image_rejected() {
        let detector = RecordedDetector::from_json(FIXTURE).unwrap();
        assert!(detector.predict(&RgbImage::new(0, 0), &params()).is_err());
    }

    #[test]
    fn test_invalid_fixture() {
        match RecordedDetector::from_json("{\"frames\": 3}") {
            Err(VisionError::Model(_)) => {}
            _ => panic!("Expected Model error"),
        }
    }
}
