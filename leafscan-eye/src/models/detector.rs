//! Detector seam
//!
//! Inference is delegated to an external model. Anything that can turn an
//! RGB frame into labelled boxes plugs in here.

use crate::error::VisionError;
use image::RgbImage;
use leafscan_core::{ClassNames, DetectionSettings, RawDetection};

/// Per-call inference parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceParams {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub input_size: u32,
}

impl From<&DetectionSettings> for InferenceParams {
    fn from(settings: &DetectionSettings) -> Self {
        Self {
            confidence_threshold: settings.confidence_threshold,
            iou_threshold: settings.iou_threshold,
            input_size: settings.input_size,
        }
    }
}

/// A pretrained object detector
pub trait Detector: Send + Sync {
    /// Detect objects in one image. Zero boxes is a valid result.
    fn predict(&self, image: &RgbImage, params: &InferenceParams) -> Result<Vec<RawDetection>, VisionError>;

    /// Class-id to label mapping used to name boxes
    fn class_names(&self) -> &ClassNames;
}

/// Class-agnostic non-maximum suppression.
///
/// Drops non-finite or out-of-range confidences, sorts by confidence
/// (descending) and suppresses every box overlapping a kept box by more than
/// `iou_threshold`.
pub fn apply_nms(mut detections: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
    detections.retain(|d| d.confidence.is_finite() && (0.0..=1.0).contains(&d.confidence));
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<RawDetection> = Vec::with_capacity(detections.len());
    let mut suppressed = vec![false; detections.len()];

    for i in 0..detections.len() {
        if suppressed[i] {
            continue;
        }

        for j in (i + 1)..detections.len() {
            if !suppressed[j] && detections[i].bbox.iou(&detections[j].bbox) > iou_threshold {
                suppressed[j] = true;
            }
        }

        keep.push(detections[i].clone());
    }

    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use leafscan_core::BoundingBox;

    fn det(confidence: f32, bbox: (f32, f32, f32, f32)) -> RawDetection {
        RawDetection::new(0, "apple_scab", confidence, BoundingBox::new(bbox.0, bbox.1, bbox.2, bbox.3))
    }

    #[test]
    fn test_nms_empty() {
        assert!(apply_nms(vec![], 0.5).is_empty());
    }

    #[test]
    fn test_nms_suppresses_overlap() {
        let kept = apply_nms(
            vec![
                det(0.6, (10.0, 10.0, 60.0, 60.0)),
                det(0.9, (12.0, 12.0, 62.0, 62.0)),
                det(0.7, (200.0, 200.0, 250.0, 250.0)),
            ],
            0.5,
        );
        let confs: Vec<f32> = kept.iter().map(|d| d.confidence).collect();
        assert_eq!(confs, vec![0.9, 0.7]);
    }

    #[test]
    fn test_nms_drops_invalid_confidence() {
        let kept = apply_nms(vec![det(f32::NAN, (0.0, 0.0, 5.0, 5.0)), det(1.5, (0.0, 0.0, 5.0, 5.0))], 0.5);
        assert!(kept.is_empty());
    }

    #[test]
    fn test_params_from_settings() {
        let params = InferenceParams::from(&DetectionSettings::default());
        assert_eq!(params.confidence_threshold, 0.40);
        assert_eq!(params.input_size, 640);
    }
}
