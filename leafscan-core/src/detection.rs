//! Detection records flowing from the detector to the ledger

use crate::disease::DiseaseProfile;
use crate::resolver::resolve;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Axis-aligned box in pixel coordinates (x1 < x2, y1 < y2)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Intersection over union; 0.0 for degenerate or non-finite boxes
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let coords = [self.x1, self.y1, self.x2, self.y2, other.x1, other.y1, other.x2, other.y2];
        if coords.iter().any(|c| !c.is_finite()) {
            return 0.0;
        }

        let inter_x_min = self.x1.max(other.x1);
        let inter_y_min = self.y1.max(other.y1);
        let inter_x_max = self.x2.min(other.x2);
        let inter_y_max = self.y2.min(other.y2);

        if inter_x_max <= inter_x_min || inter_y_max <= inter_y_min {
            return 0.0;
        }

        let inter_area = (inter_x_max - inter_x_min) * (inter_y_max - inter_y_min);
        let union_area = self.area() + other.area() - inter_area;

        if union_area <= 0.0 || !union_area.is_finite() {
            return 0.0;
        }

        let iou = inter_area / union_area;
        if iou.is_finite() && (0.0..=1.0).contains(&iou) {
            iou
        } else {
            0.0
        }
    }
}

/// One bounding box reported by a single inference call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub class_id: usize,
    pub class_label: String,
    pub confidence: f32,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
}

impl RawDetection {
    pub fn new(class_id: usize, class_label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            class_id,
            class_label: class_label.into(),
            confidence,
            bbox,
        }
    }
}

/// A raw detection with its resolved disease profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedDetection {
    pub class_id: usize,
    pub class_label: String,
    pub confidence: f32,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub profile: DiseaseProfile,
}

impl EnrichedDetection {
    /// Resolve the detection's label against the knowledge base
    pub fn from_raw(raw: &RawDetection) -> Self {
        Self {
            class_id: raw.class_id,
            class_label: raw.class_label.clone(),
            confidence: raw.confidence,
            bbox: raw.bbox,
            profile: resolve(&raw.class_label),
        }
    }

    pub fn display_name(&self) -> &str {
        &self.profile.display_name
    }
}

/// Detector class-id to label mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassNames(BTreeMap<usize, String>);

impl ClassNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, class_id: usize, label: impl Into<String>) {
        self.0.insert(class_id, label.into());
    }

    /// Label for a class id; unmapped ids render as their decimal value
    pub fn label_for(&self, class_id: usize) -> String {
        self.0
            .get(&class_id)
            .cloned()
            .unwrap_or_else(|| class_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(usize, S)> for ClassNames {
    fn from_iter<I: IntoIterator<Item = (usize, S)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(id, label)| (id, label.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iou_identical() {
        let bbox = BoundingBox::new(10.0, 10.0, 60.0, 60.0);
        assert!((bbox.iou(&bbox) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_iou_no_overlap() {
        let a = BoundingBox::new(10.0, 10.0, 60.0, 60.0);
        let b = BoundingBox::new(200.0, 200.0, 250.0, 250.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_partial_overlap() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 0.0, 15.0, 10.0);
        // intersection 50, union 150
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 0.001);
    }

    #[test]
    fn test_iou_invalid_inputs() {
        let valid = BoundingBox::new(10.0, 10.0, 60.0, 60.0);
        let nan = BoundingBox::new(f32::NAN, 10.0, 60.0, 60.0);
        let inverted = BoundingBox::new(60.0, 60.0, 10.0, 10.0);
        assert_eq!(valid.iou(&nan), 0.0);
        assert_eq!(valid.iou(&inverted), 0.0);
    }

    #[test]
    fn test_enriched_from_raw() {
        let raw = RawDetection::new(1, "black rot", 0.92, BoundingBox::new(10.0, 10.0, 100.0, 100.0));
        let enriched = EnrichedDetection::from_raw(&raw);
        assert_eq!(enriched.display_name(), "Black Rot");
        assert_eq!(enriched.confidence, 0.92);
        assert_eq!(enriched.bbox, raw.bbox);
    }

    #[test]
    fn test_class_names_fallback_to_id() {
        let names: ClassNames = [(0, "apple_scab"), (1, "black_rot")].into_iter().collect();
        assert_eq!(names.label_for(1), "black_rot");
        assert_eq!(names.label_for(7), "7");
    }

    #[test]
    fn test_raw_detection_json_uses_box_field() {
        let json = r#"{"class_id":2,"class_label":"rust","confidence":0.5,"box":{"x1":1.0,"y1":2.0,"x2":3.0,"y2":4.0}}"#;
        let raw: RawDetection = serde_json::from_str(json).unwrap();
        assert_eq!(raw.bbox.y2, 4.0);
    }
}
