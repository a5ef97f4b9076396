//! YOLO detector running an exported ONNX model
//!
//! Frames are letterboxed to a square `input_size` canvas, normalized to
//! `[0, 1]` and fed as a `[1, 3, S, S]` tensor. The output is the YOLOv8
//! layout `[1, 4 + classes, anchors]` (or its transpose): a center-size box
//! followed by one score per class for every anchor.
//!
//! The session itself needs the `onnx` feature; the tensor plumbing around
//! it is always available.

use crate::error::VisionError;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use leafscan_core::{BoundingBox, ClassNames, RawDetection};

use super::detector::InferenceParams;

/// Padding value used by YOLO exporters for letterbox borders
const PAD_VALUE: u8 = 114;

/// Mapping from model-input pixels back to source-image pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub source_width: u32,
    pub source_height: u32,
}

impl Letterbox {
    /// Undo letterboxing for a model-space box and clip it to the source image
    pub fn to_source(&self, x1: f32, y1: f32, x2: f32, y2: f32) -> BoundingBox {
        let (w, h) = (self.source_width as f32, self.source_height as f32);
        let unmap_x = |x: f32| ((x - self.pad_x) / self.scale).clamp(0.0, w);
        let unmap_y = |y: f32| ((y - self.pad_y) / self.scale).clamp(0.0, h);
        BoundingBox::new(unmap_x(x1), unmap_y(y1), unmap_x(x2), unmap_y(y2))
    }
}

/// Resize `image` into a square `size` canvas keeping its aspect ratio and
/// return the NCHW float tensor data.
pub fn letterbox(image: &RgbImage, size: u32) -> Result<(Vec<f32>, Letterbox), VisionError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 || size == 0 {
        return Err(VisionError::Processing(format!(
            "Cannot letterbox a {}x{} image to {}",
            width, height, size
        )));
    }

    let scale = (size as f32 / width as f32).min(size as f32 / height as f32);
    let new_width = ((width as f32 * scale).round() as u32).clamp(1, size);
    let new_height = ((height as f32 * scale).round() as u32).clamp(1, size);
    let pad_x = (size - new_width) / 2;
    let pad_y = (size - new_height) / 2;

    let resized = imageops::resize(image, new_width, new_height, FilterType::Triangle);
    let mut canvas = RgbImage::from_pixel(size, size, Rgb([PAD_VALUE; 3]));
    imageops::replace(&mut canvas, &resized, pad_x as i64, pad_y as i64);

    let plane = (size * size) as usize;
    let mut data = vec![0.0f32; 3 * plane];
    for (x, y, pixel) in canvas.enumerate_pixels() {
        let offset = (y * size + x) as usize;
        for (channel, value) in pixel.0.iter().enumerate() {
            data[channel * plane + offset] = *value as f32 / 255.0;
        }
    }

    Ok((
        data,
        Letterbox {
            scale,
            pad_x: pad_x as f32,
            pad_y: pad_y as f32,
            source_width: width,
            source_height: height,
        },
    ))
}

/// Decode a raw YOLOv8 output tensor into detections above the confidence
/// threshold. No suppression is applied here.
pub fn decode_output(
    shape: &[i64],
    data: &[f32],
    letterbox: &Letterbox,
    confidence_threshold: f32,
    class_names: &ClassNames,
) -> Result<Vec<RawDetection>, VisionError> {
    let dims: Vec<usize> = shape
        .iter()
        .map(|&d| usize::try_from(d).ok())
        .collect::<Option<_>>()
        .ok_or_else(|| VisionError::Processing(format!("Dynamic output shape {:?}", shape)))?;

    let (rows, cols) = match dims.as_slice() {
        [1, rows, cols] | [rows, cols] => (*rows, *cols),
        _ => {
            return Err(VisionError::Processing(format!(
                "Unexpected detector output shape {:?}",
                shape
            )))
        }
    };
    if rows.checked_mul(cols) != Some(data.len()) {
        return Err(VisionError::Processing(format!(
            "Output shape {:?} does not match {} values",
            shape,
            data.len()
        )));
    }

    // Attributes are 4 + classes when names are known, otherwise the short axis
    let channel_major = match class_names.len() {
        0 => rows <= cols,
        n if rows == n + 4 => true,
        n if cols == n + 4 => false,
        _ => rows <= cols,
    };
    let (attributes, anchors) = if channel_major { (rows, cols) } else { (cols, rows) };
    if attributes < 5 {
        return Err(VisionError::Processing(format!(
            "Output has {} attributes per anchor, need at least 5",
            attributes
        )));
    }

    let value = |anchor: usize, attribute: usize| -> f32 {
        if channel_major {
            data[attribute * anchors + anchor]
        } else {
            data[anchor * attributes + attribute]
        }
    };

    let mut detections = Vec::new();
    for anchor in 0..anchors {
        let mut best_class = 0;
        let mut best_score = f32::NEG_INFINITY;
        for class_id in 0..attributes - 4 {
            let score = value(anchor, 4 + class_id);
            if score > best_score {
                best_score = score;
                best_class = class_id;
            }
        }
        if !best_score.is_finite() || best_score < confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (value(anchor, 0), value(anchor, 1), value(anchor, 2), value(anchor, 3));
        if ![cx, cy, w, h].iter().all(|v| v.is_finite()) || w <= 0.0 || h <= 0.0 {
            continue;
        }

        let bbox = letterbox.to_source(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0);
        if bbox.width() <= 0.0 || bbox.height() <= 0.0 {
            continue;
        }
        detections.push(RawDetection::new(
            best_class,
            class_names.label_for(best_class),
            best_score.min(1.0),
            bbox,
        ));
    }

    Ok(detections)
}

/// Parse the `names` metadata written by YOLO exporters, e.g.
/// `{0: 'apple_scab', 1: 'black_rot'}`. JSON objects are accepted as well.
pub fn parse_class_names(metadata: &str) -> ClassNames {
    let mut names = ClassNames::new();
    let body = metadata.trim().trim_start_matches('{').trim_end_matches('}');

    for entry in body.split(',') {
        let Some((id, label)) = entry.split_once(':') else {
            continue;
        };
        let id = id.trim().trim_matches(|c| c == '\'' || c == '"');
        let label = label.trim().trim_matches(|c| c == '\'' || c == '"');
        if let Ok(id) = id.parse::<usize>() {
            if !label.is_empty() {
                names.insert(id, label);
            }
        }
    }

    names
}

/// Model input edge for a call; a size baked into the model wins
pub fn input_edge(params: &InferenceParams, fixed: Option<u32>) -> u32 {
    fixed.unwrap_or(params.input_size)
}

#[cfg(feature = "onnx")]
pub use session::OnnxDetector;

#[cfg(feature = "onnx")]
mod session {
    use super::{decode_output, input_edge, letterbox, parse_class_names};
    use crate::error::VisionError;
    use crate::models::detector::{apply_nms, Detector, InferenceParams};
    use image::RgbImage;
    use leafscan_core::{ClassNames, RawDetection};
    use ort::session::Session;
    use ort::value::Tensor;
    use parking_lot::Mutex;
    use std::path::Path;
    use tracing::{debug, info, warn};

    /// ONNX Runtime session wrapped as a `Detector`
    pub struct OnnxDetector {
        session: Mutex<Session>,
        class_names: ClassNames,
        fixed_input: Option<u32>,
    }

    impl OnnxDetector {
        /// Load an exported YOLO model
        pub fn from_path(path: &Path) -> Result<Self, VisionError> {
            let session = Session::builder()
                .map_err(|e| VisionError::Model(format!("Failed to create ONNX session builder: {}", e)))?
                .commit_from_file(path)
                .map_err(|e| VisionError::Model(format!("Failed to load ONNX model {}: {}", path.display(), e)))?;

            let class_names = session
                .metadata()
                .ok()
                .and_then(|metadata| metadata.custom("names").ok().flatten())
                .map(|names| parse_class_names(&names))
                .unwrap_or_default();
            if class_names.is_empty() {
                warn!("Model {} carries no class names; labels will be class ids", path.display());
            }

            let fixed_input = session
                .metadata()
                .ok()
                .and_then(|metadata| metadata.custom("imgsz").ok().flatten())
                .and_then(|imgsz| {
                    imgsz
                        .trim_matches(|c| c == '[' || c == ']')
                        .split(',')
                        .next()
                        .and_then(|edge| edge.trim().parse::<u32>().ok())
                });

            info!(
                "ONNX model loaded from {:?} ({} classes, input {:?})",
                path,
                class_names.len(),
                fixed_input
            );

            Ok(Self {
                session: Mutex::new(session),
                class_names,
                fixed_input,
            })
        }
    }

    impl Detector for OnnxDetector {
        fn predict(&self, image: &RgbImage, params: &InferenceParams) -> Result<Vec<RawDetection>, VisionError> {
            let edge = input_edge(params, self.fixed_input);
            let (data, boxing) = letterbox(image, edge)?;
            let input = Tensor::from_array(([1usize, 3, edge as usize, edge as usize], data))
                .map_err(|e| VisionError::Processing(format!("Failed to build input tensor: {}", e)))?;

            let mut session = self.session.lock();
            let outputs = session
                .run(ort::inputs![input])
                .map_err(|e| VisionError::Processing(format!("Inference failed: {}", e)))?;
            let (shape, values) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| VisionError::Processing(format!("Failed to read output tensor: {}", e)))?;
            let dims: Vec<i64> = shape.iter().copied().collect();

            let candidates = decode_output(&dims, values, &boxing, params.confidence_threshold, &self.class_names)?;
            let kept = apply_nms(candidates, params.iou_threshold);
            debug!("ONNX detector kept {} boxes", kept.len());
            Ok(kept)
        }

        fn class_names(&self) -> &ClassNames {
            &self.class_names
        }
    }
}
